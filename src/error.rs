//! Error types for rankpost.

use crate::message::TransportError;
use std::fmt;
use thiserror::Error;

/// Result type for group and protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The step of the exchange during which a transport call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SendLength,
    SendPayload,
    RecvLength,
    RecvPayload,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::SendLength => write!(f, "send length"),
            Phase::SendPayload => write!(f, "send payload"),
            Phase::RecvLength => write!(f, "receive length"),
            Phase::RecvPayload => write!(f, "receive payload"),
        }
    }
}

/// Every failure here is fatal to the local process. Nothing is retried and
/// nothing is propagated to other ranks.
#[derive(Error, Debug)]
pub enum Error {
    /// A group is already active in this process
    #[error("bootstrap: the group has already been initialized")]
    AlreadyInitialized,

    /// The group could not be formed
    #[error("bootstrap: {0}")]
    Bootstrap(String),

    /// A send or receive could not complete
    #[error("{phase} (remote rank {rank}): {source}")]
    Transport {
        phase: Phase,
        rank: usize,
        #[source]
        source: TransportError,
    },

    /// The payload did not carry the announced number of code points
    #[error("protocol violation from rank {rank}: announced {announced} code points, received {received}")]
    ProtocolViolation {
        rank: usize,
        announced: usize,
        received: usize,
    },

    /// A frame could not be decoded
    #[error("undecodable frame from rank {rank}: {reason}")]
    Decode { rank: usize, reason: String },

    /// A rank thread of an in-process group panicked
    #[error("rank {0} panicked")]
    RankPanicked(usize),

    /// Invalid launcher configuration
    #[error("configuration: {0}")]
    Config(String),

    /// Writing the console report failed
    #[error("report output: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn transport(phase: Phase, rank: usize) -> impl FnOnce(TransportError) -> Self {
        move |source| Error::Transport {
            phase,
            rank,
            source,
        }
    }
}
