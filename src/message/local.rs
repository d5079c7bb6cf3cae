//! Provides an in-process group, for ranks that run as threads of one
//! process.
//!
//! Every rank owns an inbox. Each rank holds a sender into every other rank's
//! inbox, but not into its own, so an inbox disconnects once all of the other
//! ranks have been dropped.

use super::comm::Communicator;
use super::{check_rank, TransportError};
use crossbeam_channel::{Receiver, Sender};
use std::cell::RefCell;

struct Envelope {
    source: usize,
    tag: usize,
    message: Vec<u8>,
}

/// Builder for the communicators of an in-process group.
pub struct LocalGroup;

impl LocalGroup {
    /// Create one communicator per rank of a group with the given size. The
    /// communicator for rank `r` is at index `r`.
    pub fn new(size: usize) -> Vec<LocalCommunicator> {
        let (senders, receivers): (Vec<Sender<Envelope>>, Vec<Receiver<Envelope>>) =
            (0..size).map(|_| crossbeam_channel::unbounded()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalCommunicator {
                rank,
                outboxes: senders
                    .iter()
                    .enumerate()
                    .map(|(dest, s)| (dest != rank).then(|| s.clone()))
                    .collect(),
                inbox,
                undelivered: RefCell::new(Vec::new()),
            })
            .collect()
    }
}

pub struct LocalCommunicator {
    rank: usize,
    outboxes: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    undelivered: RefCell<Vec<Envelope>>,
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&self, rank: usize, tag: usize, message: Vec<u8>) -> Result<(), TransportError> {
        check_rank(rank, self.size())?;
        let outbox = self.outboxes[rank]
            .as_ref()
            .ok_or(TransportError::Unsupported("a local rank cannot send to itself"))?;
        outbox
            .send(Envelope {
                source: self.rank,
                tag,
                message,
            })
            .map_err(|_| TransportError::Disconnected(rank))
    }

    fn recv(&self, rank: usize, tag: usize) -> Result<Vec<u8>, TransportError> {
        check_rank(rank, self.size())?;
        let mut undelivered = self.undelivered.borrow_mut();
        let matches = |e: &Envelope| e.source == rank && e.tag == tag;

        match undelivered.iter().position(matches) {
            Some(index) => Ok(undelivered.remove(index).message),
            None => loop {
                let envelope = self
                    .inbox
                    .recv()
                    .map_err(|_| TransportError::Disconnected(rank))?;
                if matches(&envelope) {
                    return Ok(envelope.message);
                }
                undelivered.push(envelope)
            },
        }
    }
}
