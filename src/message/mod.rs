//! A minimal point-to-point message-passing API.
//!
//! This module exports the [`Communicator`] trait, which is all the exchange
//! protocol needs from a transport: the calling rank, the group size, and
//! blocking tagged `send` and `recv`. Several transports are included: an
//! in-process group for threads ([`LocalCommunicator`]), a pure-Rust TCP
//! transport ([`TcpCommunicator`]), a singleton group ([`NullCommunicator`]),
//! and MPI behind the `mpi` feature.

mod comm;
mod local;
#[cfg(feature = "mpi")]
mod mpi;
mod null;
mod tcp;
mod util;

pub use comm::Communicator;
pub use local::{LocalCommunicator, LocalGroup};
#[cfg(feature = "mpi")]
pub use mpi::MpiCommunicator;
pub use null::NullCommunicator;
pub use tcp::TcpCommunicator;

use thiserror::Error;

/// Failure of a single transport operation.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("rank {rank} is not a member of a group of size {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("the connection to rank {0} has closed")]
    Disconnected(usize),

    #[error("the connection from rank {rank} ({address}) failed: {source}")]
    ConnectionLost {
        rank: usize,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Unsupported(&'static str),
}

/// Reject ranks outside of `0..size`.
pub(crate) fn check_rank(rank: usize, size: usize) -> Result<(), TransportError> {
    if rank < size {
        Ok(())
    } else {
        Err(TransportError::InvalidRank { rank, size })
    }
}
