//! # rankpost
//!
//! Rank-ordered message collection over a fixed-size process group.
//!
//! Every rank other than 0 sends one text message to rank 0, in two frames:
//! the number of code points on [`protocol::LENGTH_TAG`], then the code
//! points on [`protocol::PAYLOAD_TAG`]. Rank 0 receives from ranks
//! `1..size`, strictly in that order, and reports each message with its
//! sender followed by a count of the messages processed.
//!
//! The exchange is written against the [`message::Communicator`] trait, so
//! the same code runs over threads of one process, TCP, or MPI.
//!
//! ```no_run
//! use rankpost::{driver, launch, Greeting};
//!
//! fn main() -> rankpost::Result<()> {
//!     let greeting = Greeting::default();
//!     launch::run_local(3, false, |comm| {
//!         driver::run_rank(comm, &greeting, driver::Format::Text, std::io::stdout())
//!     })?;
//!     Ok(())
//! }
//! ```

pub mod coder;
pub mod config;
pub mod driver;
pub mod error;
pub mod group;
pub mod launch;
pub mod logging;
pub mod message;
pub mod peer;
pub mod protocol;
pub mod root;

pub use error::{Error, Phase, Result};
pub use group::{Group, GroupContext};
pub use peer::Greeting;
pub use protocol::Frame;
pub use root::{Received, Summary};
