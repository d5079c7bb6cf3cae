//! Provides a message-passing communicator based on TCP sockets.
//!
//! TCP is a connection-oriented protocol, which means that a connection must
//! be established between the sending and receiving ends of the socket in
//! order to read from or write to a stream. Each rank listens on its own
//! address from the peer table, opens one outgoing connection per
//! destination on first use, and runs one reader thread per incoming
//! connection. Since a single stream is read by a single thread, messages
//! from one sender arrive in the order they were written.
//!
//! Every transport message is written as `len | source | tag | bytes`, with
//! the three header fields encoded as little-endian `u64`. A `len` above
//! [`MAX_MESSAGE_BYTES`] is rejected on both ends.

use super::comm::Communicator;
use super::{check_rank, util, TransportError};
use crossbeam_channel::{Receiver, Sender};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest message body the transport will send or accept.
pub const MAX_MESSAGE_BYTES: usize = 1 << 30;

struct Envelope {
    source: usize,
    tag: usize,
    message: Vec<u8>,
}

/// What a reader thread forwards. A connection failure is only forwarded
/// once the connection has identified its sender with a valid header.
enum Incoming {
    Message(Envelope),
    Failed {
        source: usize,
        address: String,
        error: io::Error,
    },
}

impl Incoming {
    fn is_from(&self, rank: usize) -> bool {
        match self {
            Incoming::Message(e) => e.source == rank,
            Incoming::Failed { source, .. } => *source == rank,
        }
    }
}

type IncomingS = Sender<Incoming>;
type IncomingR = Receiver<Incoming>;

/// Accepts incoming connections on a background thread, and spawns a reader
/// thread for each one. The reader threads forward complete messages into a
/// single channel.
struct Acceptor {
    address: SocketAddr,
    alive: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Acceptor {
    fn spawn(listener: TcpListener, incoming_s: IncomingS) -> io::Result<Self> {
        let address = listener.local_addr()?;
        let alive = Arc::new(AtomicBool::new(true));
        let keep_accepting = alive.clone();

        let thread = thread::Builder::new()
            .name(format!("accept-{}", address))
            .spawn(move || {
                for stream in listener.incoming() {
                    if !keep_accepting.load(Ordering::SeqCst) {
                        break;
                    }
                    match stream {
                        Ok(stream) => Self::spawn_reader(stream, incoming_s.clone()),
                        Err(e) => warn!(error = %e, "failed to accept a connection"),
                    }
                }
            })?;

        Ok(Self {
            address,
            alive,
            thread: Some(thread),
        })
    }

    fn spawn_reader(mut stream: TcpStream, incoming_s: IncomingS) {
        let address = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown address".to_string());
        debug!(peer = %address, "accepted connection");

        thread::spawn(move || {
            let mut source = None;
            loop {
                let incoming = match read_envelope(&mut stream) {
                    Ok(Some(envelope)) => {
                        source = Some(envelope.source);
                        Incoming::Message(envelope)
                    }
                    Ok(None) => break,
                    Err(error) => match source {
                        Some(source) => Incoming::Failed {
                            source,
                            address: address.clone(),
                            error,
                        },
                        None => {
                            warn!(peer = %address, %error, "dropping connection that sent no valid header");
                            break;
                        }
                    },
                };
                let failed = matches!(incoming, Incoming::Failed { .. });
                if incoming_s.send(incoming).is_err() || failed {
                    break;
                }
            }
        });
    }
}

impl Drop for Acceptor {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);

        // The accept loop only notices the flag once it accepts something.
        let mut wake = self.address;
        if wake.ip().is_unspecified() {
            wake.set_ip(Ipv4Addr::LOCALHOST.into());
        }
        if TcpStream::connect(wake).is_ok() {
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

fn read_envelope(stream: &mut TcpStream) -> io::Result<Option<Envelope>> {
    match util::read_usize_or_eof(stream)? {
        None => Ok(None),
        Some(len) if len > MAX_MESSAGE_BYTES => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message of {} bytes exceeds the {} byte limit", len, MAX_MESSAGE_BYTES),
        )),
        Some(len) => {
            let source = util::read_usize(stream)?;
            let tag = util::read_usize(stream)?;
            let message = util::read_bytes_vec(stream, len)?;
            Ok(Some(Envelope {
                source,
                tag,
                message,
            }))
        }
    }
}

pub struct TcpCommunicator {
    rank: usize,
    peers: Vec<SocketAddr>,
    connect_timeout: Duration,
    outgoing: RefCell<HashMap<usize, TcpStream>>,
    incoming_r: IncomingR,
    undelivered: RefCell<Vec<Incoming>>,
    _acceptor: Acceptor,
}

impl TcpCommunicator {
    /// Bind this rank's address from the peer table and start accepting
    /// connections on it.
    pub fn new(rank: usize, peers: Vec<SocketAddr>) -> Result<Self, TransportError> {
        check_rank(rank, peers.len())?;
        let listener = TcpListener::bind(peers[rank])?;
        Self::from_listener(rank, listener, peers)
    }

    /// Start accepting connections on a listener that is already bound. The
    /// address at `peers[rank]` must reach this listener.
    pub fn from_listener(
        rank: usize,
        listener: TcpListener,
        peers: Vec<SocketAddr>,
    ) -> Result<Self, TransportError> {
        check_rank(rank, peers.len())?;
        let (incoming_s, incoming_r) = crossbeam_channel::unbounded();
        let acceptor = Acceptor::spawn(listener, incoming_s)?;
        debug!(rank, address = %acceptor.address, size = peers.len(), "tcp communicator listening");

        Ok(Self {
            rank,
            peers,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            outgoing: RefCell::new(HashMap::new()),
            incoming_r,
            undelivered: RefCell::new(Vec::new()),
            _acceptor: acceptor,
        })
    }

    /// How long to keep retrying the first connection to a peer that is not
    /// listening yet.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    fn connect(&self, rank: usize) -> io::Result<TcpStream> {
        let address = self.peers[rank];
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            match TcpStream::connect(address) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    debug!(rank = self.rank, peer = rank, %address, "connected");
                    return Ok(stream);
                }
                Err(e) if Instant::now() < deadline => {
                    trace!(peer = rank, error = %e, "connect failed, retrying");
                    thread::sleep(CONNECT_RETRY_INTERVAL)
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Communicator for TcpCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, rank: usize, tag: usize, message: Vec<u8>) -> Result<(), TransportError> {
        check_rank(rank, self.size())?;
        if message.len() > MAX_MESSAGE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("message of {} bytes exceeds the {} byte limit", message.len(), MAX_MESSAGE_BYTES),
            )
            .into());
        }
        let mut outgoing = self.outgoing.borrow_mut();
        if !outgoing.contains_key(&rank) {
            outgoing.insert(rank, self.connect(rank)?);
        }

        let mut frame = Vec::with_capacity(24 + message.len());
        util::write_usize(&mut frame, message.len())?;
        util::write_usize(&mut frame, self.rank)?;
        util::write_usize(&mut frame, tag)?;
        frame.extend_from_slice(&message);

        let written = match outgoing.get_mut(&rank) {
            Some(stream) => stream.write_all(&frame).and_then(|_| stream.flush()),
            None => Err(io::ErrorKind::NotConnected.into()),
        };
        if let Err(e) = written {
            outgoing.remove(&rank);
            return Err(e.into());
        }
        Ok(())
    }

    fn recv(&self, rank: usize, tag: usize) -> Result<Vec<u8>, TransportError> {
        check_rank(rank, self.size())?;
        let mut undelivered = self.undelivered.borrow_mut();

        // A failure from `rank` ends its stream, so it answers every receive
        // from that rank that is not satisfied by an earlier message.
        let answers = |incoming: &Incoming| match incoming {
            Incoming::Message(e) => e.source == rank && e.tag == tag,
            Incoming::Failed { .. } => incoming.is_from(rank),
        };

        let incoming = match undelivered.iter().position(answers) {
            Some(index) => undelivered.remove(index),
            None => loop {
                let incoming = self
                    .incoming_r
                    .recv()
                    .map_err(|_| TransportError::Disconnected(rank))?;
                if answers(&incoming) {
                    break incoming;
                }
                undelivered.push(incoming)
            },
        };

        match incoming {
            Incoming::Message(envelope) => Ok(envelope.message),
            Incoming::Failed {
                source,
                address,
                error,
            } => Err(TransportError::ConnectionLost {
                rank: source,
                address,
                source: error,
            }),
        }
    }
}
