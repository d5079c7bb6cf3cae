//! The collecting side of the exchange, run by rank 0.
//!
//! The root visits ranks `1..size` in increasing order and does not move on
//! to rank `k + 1` until the length and payload from rank `k` have both
//! arrived. There is no timeout: a peer that never sends stalls the
//! collection at that rank.

use crate::coder::DecodeError;
use crate::error::{Error, Phase, Result};
use crate::group::GroupContext;
use crate::message::Communicator;
use crate::protocol::{Frame, LENGTH_TAG, PAYLOAD_TAG};
use serde::Serialize;
use tracing::{debug, trace};

/// A message as delivered to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Received {
    pub source: usize,
    pub text: String,
}

/// The outcome of a completed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub processed: usize,
}

/// Receive exactly one message from every non-root rank, in rank order,
/// handing each to `report` as soon as it is complete.
pub fn collect<C, F>(comm: &C, context: GroupContext, mut report: F) -> Result<Summary>
where
    C: Communicator,
    F: FnMut(&Received) -> Result<()>,
{
    let mut processed = 0;
    for source in context.peers() {
        let received = receive_from(comm, source)?;
        report(&received)?;
        processed += 1;
    }
    debug!(processed, "collection complete");
    Ok(Summary { processed })
}

/// Run the two-phase receive against a single peer.
pub fn receive_from<C: Communicator>(comm: &C, source: usize) -> Result<Received> {
    let data = comm
        .recv(source, LENGTH_TAG)
        .map_err(Error::transport(Phase::RecvLength, source))?;
    let announced = Frame::decode_length(data).map_err(undecodable(source))?;
    trace!(source, announced, "length received");

    let data = comm
        .recv(source, PAYLOAD_TAG)
        .map_err(Error::transport(Phase::RecvPayload, source))?;
    let payload = Frame::decode_payload(data).map_err(undecodable(source))?;

    // Compared only, never used to size a buffer.
    if payload.len() != announced {
        return Err(Error::ProtocolViolation {
            rank: source,
            announced,
            received: payload.len(),
        });
    }
    trace!(source, "payload received");

    Ok(Received {
        source,
        text: payload.into_iter().collect(),
    })
}

fn undecodable(source: usize) -> impl FnOnce(DecodeError) -> Error {
    move |e| Error::Decode {
        rank: source,
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{LocalCommunicator, LocalGroup};
    use crate::peer::{send_message, Greeting};
    use std::thread;
    use std::time::Duration;

    fn context(comm: &LocalCommunicator) -> GroupContext {
        GroupContext {
            rank: comm.rank(),
            size: comm.size(),
        }
    }

    fn collect_all(root: &LocalCommunicator) -> Result<(Vec<Received>, Summary)> {
        let mut received = Vec::new();
        let summary = collect(root, context(root), |r| {
            received.push(r.clone());
            Ok(())
        })?;
        Ok((received, summary))
    }

    #[test]
    fn messages_are_processed_in_rank_order_whatever_the_arrival_order() {
        let mut comms = LocalGroup::new(5);
        let root = comms.remove(0);
        let greeting = Greeting::default();

        // Higher ranks send first.
        let senders: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let greeting = greeting.clone();
                thread::spawn(move || {
                    let rank = comm.rank();
                    thread::sleep(Duration::from_millis(10 * (5 - rank) as u64));
                    send_message(&comm, context(&comm), &greeting.render(rank)).unwrap();
                    comm
                })
            })
            .collect();

        let (received, summary) = collect_all(&root).unwrap();
        let peers: Vec<_> = senders.into_iter().map(|s| s.join().unwrap()).collect();

        assert_eq!(summary, Summary { processed: 4 });
        assert_eq!(received.iter().map(|r| r.source).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        for r in &received {
            assert_eq!(r.text, greeting.render(r.source));
        }
        drop(peers);
    }

    #[test]
    fn singleton_group_collects_nothing() {
        let root = LocalGroup::new(1).remove(0);
        let (received, summary) = collect_all(&root).unwrap();
        assert!(received.is_empty());
        assert_eq!(summary.processed, 0);
    }

    #[test]
    fn short_payload_is_a_protocol_violation() {
        let mut comms = LocalGroup::new(2);
        let peer = comms.pop().unwrap();
        let root = comms.pop().unwrap();
        peer.send(0, LENGTH_TAG, Frame::Length(5).encode()).unwrap();
        peer.send(0, PAYLOAD_TAG, Frame::Payload(vec!['a', 'b', 'c']).encode())
            .unwrap();

        assert!(matches!(
            collect_all(&root),
            Err(Error::ProtocolViolation {
                rank: 1,
                announced: 5,
                received: 3
            })
        ));
    }

    #[test]
    fn long_payload_is_a_protocol_violation() {
        let mut comms = LocalGroup::new(2);
        let peer = comms.pop().unwrap();
        let root = comms.pop().unwrap();
        peer.send(0, LENGTH_TAG, Frame::Length(1).encode()).unwrap();
        peer.send(0, PAYLOAD_TAG, Frame::Payload(vec!['a', 'b']).encode())
            .unwrap();

        assert!(matches!(
            receive_from(&root, 1),
            Err(Error::ProtocolViolation { announced: 1, received: 2, .. })
        ));
    }

    #[test]
    fn huge_announced_length_is_a_protocol_violation() {
        let mut comms = LocalGroup::new(2);
        let peer = comms.pop().unwrap();
        let root = comms.pop().unwrap();
        peer.send(0, LENGTH_TAG, Frame::Length(usize::MAX / 2).encode()).unwrap();
        peer.send(0, PAYLOAD_TAG, Frame::Payload(vec!['a', 'b', 'c']).encode())
            .unwrap();

        assert!(matches!(
            receive_from(&root, 1),
            Err(Error::ProtocolViolation {
                rank: 1,
                announced,
                received: 3
            }) if announced == usize::MAX / 2
        ));
    }

    #[test]
    fn garbled_length_is_a_decode_error() {
        let mut comms = LocalGroup::new(2);
        let peer = comms.pop().unwrap();
        let root = comms.pop().unwrap();
        peer.send(0, LENGTH_TAG, vec![1, 2, 3]).unwrap();
        assert!(matches!(receive_from(&root, 1), Err(Error::Decode { rank: 1, .. })));
    }

    #[test]
    fn vanished_peer_fails_the_payload_phase() {
        let mut comms = LocalGroup::new(2);
        let peer = comms.pop().unwrap();
        let root = comms.pop().unwrap();
        peer.send(0, LENGTH_TAG, Frame::Length(4).encode()).unwrap();
        drop(peer);

        assert!(matches!(
            receive_from(&root, 1),
            Err(Error::Transport {
                phase: Phase::RecvPayload,
                rank: 1,
                ..
            })
        ));
    }

    #[test]
    fn report_failure_stops_the_collection() {
        let mut comms = LocalGroup::new(3);
        let root = comms.remove(0);
        for comm in &comms {
            send_message(comm, context(comm), "x {rank}").unwrap();
        }
        let mut calls = 0;
        let result = collect(&root, context(&root), |_| {
            calls += 1;
            Err(Error::Io(std::io::ErrorKind::BrokenPipe.into()))
        });
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(calls, 1);
    }
}
