//! Command line and environment configuration for the `rankpost` binary.

use crate::driver::Format;
use crate::error::{Error, Result};
use crate::peer::{Greeting, DEFAULT_GREETING};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Debug, Clone, Parser)]
#[command(name = "rankpost", version, about = "Every rank greets rank 0; rank 0 collects the greetings in rank order")]
pub struct Opts {
    /// Message template sent by every non-root rank; must contain {rank}
    #[arg(short = 'g', long, env = "RANKPOST_GREETING", default_value = DEFAULT_GREETING)]
    pub greeting: String,

    /// Console report format
    #[arg(short = 'f', long, env = "RANKPOST_FORMAT", value_enum, default_value_t = Format::Text)]
    pub format: Format,

    #[command(subcommand)]
    pub transport: Transport,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Transport {
    /// Run the whole group inside this process, one thread per rank
    Local {
        /// Number of ranks in the group
        #[arg(short = 'n', long, env = "RANKPOST_SIZE", default_value = "4")]
        size: usize,

        /// Pin each rank thread to a CPU core (needs the core_affinity feature)
        #[arg(long, env = "RANKPOST_PIN_CORES")]
        pin_cores: bool,
    },

    /// Run one rank of a group connected over TCP
    Tcp {
        /// Rank of this process, an index into the peer list
        #[arg(short = 'r', long, env = "RANKPOST_RANK")]
        rank: usize,

        /// Listening address of every rank, in rank order, comma separated
        #[arg(short = 'p', long, env = "RANKPOST_PEERS", value_delimiter = ',', required = true)]
        peers: Vec<SocketAddr>,

        /// How long to keep retrying connections to peers that are not up yet
        #[arg(long, env = "RANKPOST_CONNECT_TIMEOUT_MS", default_value = "10000")]
        connect_timeout_ms: u64,
    },

    /// Run a group of one, which has nobody to collect from
    Null,

    /// Run one rank of a group started by mpiexec
    #[cfg(feature = "mpi")]
    Mpi,
}

impl Opts {
    pub fn greeting(&self) -> Result<Greeting> {
        Greeting::new(self.greeting.as_str())
    }

    /// Check the settings that clap cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        self.greeting()?;
        match &self.transport {
            Transport::Local { size, .. } if *size == 0 => {
                Err(Error::Config("the group size must be at least 1".into()))
            }
            Transport::Tcp { rank, peers, .. } if *rank >= peers.len() => Err(Error::Config(format!(
                "rank {} has no entry in a peer list of {}",
                rank,
                peers.len()
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Opts {
        Opts::try_parse_from(std::iter::once("rankpost").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn local_defaults() {
        let opts = parse(&["local"]);
        assert_eq!(opts.format, Format::Text);
        assert_eq!(opts.greeting, DEFAULT_GREETING);
        assert!(matches!(
            opts.transport,
            Transport::Local {
                size: 4,
                pin_cores: false
            }
        ));
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn tcp_peer_list_is_comma_separated() {
        let opts = parse(&["--format", "json", "tcp", "-r", "1", "-p", "127.0.0.1:7000,127.0.0.1:7001"]);
        assert_eq!(opts.format, Format::Json);
        match &opts.transport {
            Transport::Tcp {
                rank,
                peers,
                connect_timeout_ms,
            } => {
                assert_eq!(*rank, 1);
                assert_eq!(*connect_timeout_ms, 10_000);
                assert_eq!(peers.len(), 2);
                assert_eq!(peers[1].port(), 7001);
            }
            other => panic!("unexpected transport {:?}", other),
        }
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn rank_outside_the_peer_list_is_invalid() {
        let opts = parse(&["tcp", "--rank", "2", "--peers", "127.0.0.1:7000,127.0.0.1:7001"]);
        assert!(matches!(opts.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_local_group_is_invalid() {
        let opts = parse(&["local", "--size", "0"]);
        assert!(matches!(opts.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn greeting_without_a_rank_is_invalid() {
        let opts = parse(&["--greeting", "hello", "null"]);
        assert!(matches!(opts.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn tcp_requires_peers() {
        assert!(Opts::try_parse_from(["rankpost", "tcp", "--rank", "0"]).is_err());
    }
}
