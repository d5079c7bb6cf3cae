use super::comm::Communicator;
use super::TransportError;

/// The group of one: rank 0 of size 1. There is nobody to talk to, so every
/// send and receive fails.
pub struct NullCommunicator {}

impl NullCommunicator {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NullCommunicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Communicator for NullCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, _rank: usize, _tag: usize, _message: Vec<u8>) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("cannot send on a null communicator"))
    }

    fn recv(&self, _rank: usize, _tag: usize) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Unsupported("cannot recv on a null communicator"))
    }
}
