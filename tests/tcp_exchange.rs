use rankpost::driver::{self, Format, Outcome};
use rankpost::message::{Communicator, TcpCommunicator};
use rankpost::protocol::{Frame, LENGTH_TAG, PAYLOAD_TAG};
use rankpost::{root, Error, Greeting, GroupContext, Summary};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

fn loopback_group(size: usize) -> Vec<TcpCommunicator> {
    let listeners: Vec<_> = (0..size)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    let peers: Vec<_> = listeners.iter().map(|l| l.local_addr().unwrap()).collect();
    listeners
        .into_iter()
        .enumerate()
        .map(|(rank, l)| TcpCommunicator::from_listener(rank, l, peers.clone()).unwrap())
        .collect()
}

#[test]
fn every_peer_is_collected_once_in_rank_order() {
    let greeting = Greeting::default();
    let handles: Vec<_> = loopback_group(5)
        .into_iter()
        .map(|comm| {
            let greeting = greeting.clone();
            thread::spawn(move || {
                // Give later ranks a head start so arrival order is reversed.
                thread::sleep(Duration::from_millis(20 * (5 - comm.rank()) as u64));
                let mut out = Vec::new();
                let outcome = driver::run_rank(comm, &greeting, Format::Text, &mut out).unwrap();
                (outcome, String::from_utf8(out).unwrap())
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let (outcome, report) = &results[0];
    assert_eq!(*outcome, Outcome::Collected(Summary { processed: 4 }));

    let lines: Vec<_> = report.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "Process 0 of 5 is ready");
    for rank in 1..5 {
        assert_eq!(
            lines[rank],
            format!("Received from {}: {}", rank, greeting.render(rank))
        );
    }
    assert_eq!(lines[5], "Messages processed: 4");

    for (rank, (outcome, report)) in results.iter().enumerate().skip(1) {
        assert_eq!(*outcome, Outcome::Sent);
        assert_eq!(report.trim_end(), format!("Process {} of 5 is ready", rank));
    }
}

#[test]
fn payload_shorter_than_announced_is_fatal_at_the_root() {
    let mut comms = loopback_group(2);
    let peer = comms.pop().unwrap();
    let root_comm = comms.pop().unwrap();

    peer.send(0, LENGTH_TAG, Frame::Length(38).encode()).unwrap();
    peer.send(0, PAYLOAD_TAG, Frame::Payload("short".chars().collect()).encode())
        .unwrap();

    let context = GroupContext { rank: 0, size: 2 };
    let result = root::collect(&root_comm, context, |_| Ok(()));
    assert!(matches!(
        result,
        Err(Error::ProtocolViolation {
            rank: 1,
            announced: 38,
            received: 5
        })
    ));
}
