use super::TransportError;

/// Interface for a group of processes that exchange tagged byte buffers.
///
/// Implementors only need to provide blocking `send` and `recv` for a given
/// transport layer. Both calls are point-to-point and are matched by the
/// (source, tag) pair, so a receive for one tag never consumes a message
/// posted on another tag.
///
/// Ordering contract: messages from one sender to one destination are
/// delivered in the order they were sent, across tags. No ordering is implied
/// between different senders; a receiver that wants a particular order must
/// request messages in that order.
pub trait Communicator {
    /// The rank of the calling process, in `0..size()`.
    fn rank(&self) -> usize;

    /// The number of processes in the group.
    fn size(&self) -> usize;

    /// Send a message to the given rank. Returns once the transport has
    /// accepted the buffer, which does not mean it has been received.
    fn send(&self, rank: usize, tag: usize, message: Vec<u8>) -> Result<(), TransportError>;

    /// Block until a message with the given tag has arrived from the given
    /// rank, and return it.
    fn recv(&self, rank: usize, tag: usize) -> Result<Vec<u8>, TransportError>;
}
