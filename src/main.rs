use clap::Parser;
use rankpost::config::{Opts, Transport};
use rankpost::driver;
use rankpost::message::{NullCommunicator, TcpCommunicator};
use rankpost::{launch, logging, Error, Result};
use std::io;
use std::time::Duration;
use tracing::{debug, error};

fn run(opts: Opts) -> Result<()> {
    opts.validate()?;
    let greeting = opts.greeting()?;
    let format = opts.format;

    match opts.transport {
        Transport::Local { size, pin_cores } => {
            launch::run_local(size, pin_cores, |comm| {
                driver::run_rank(comm, &greeting, format, io::stdout())
            })?;
        }
        Transport::Tcp {
            rank,
            peers,
            connect_timeout_ms,
        } => {
            let comm = TcpCommunicator::new(rank, peers)
                .map_err(|e| Error::Bootstrap(format!("cannot listen as rank {}: {}", rank, e)))?
                .with_connect_timeout(Duration::from_millis(connect_timeout_ms));
            driver::run_rank(comm, &greeting, format, io::stdout())?;
        }
        Transport::Null => {
            driver::run_rank(NullCommunicator::new(), &greeting, format, io::stdout())?;
        }
        #[cfg(feature = "mpi")]
        Transport::Mpi => {
            let comm = rankpost::message::MpiCommunicator::init()
                .map_err(|e| Error::Bootstrap(e.to_string()))?;
            driver::run_rank(comm, &greeting, format, io::stdout())?;
        }
    }
    Ok(())
}

fn main() {
    logging::init();
    let opts = Opts::parse();
    debug!(?opts, "starting");

    if let Err(e) = run(opts) {
        error!(error = %e, "exchange failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
