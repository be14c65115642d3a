//! TCP listener and readiness multiplexer.
//!
//! # Responsibilities
//! - Bind to the configured address with the configured backlog
//! - Accept connections without blocking
//! - Hold idle connections until they have bytes pending
//! - Hand ready connections to the worker queue (blocking when it is full)
//!
//! # Design Decisions
//! - A single thread owns the poll; workers never see an idle socket
//! - Readiness is confirmed with a non-consuming peek before handoff
//! - The queue's blocking enqueue is the backpressure point

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use socket2::{Domain, Protocol, Socket, Type};

use crate::config::ListenerConfig;
use crate::lifecycle::Shutdown;
use crate::net::connection::{Connection, ConnectionId};
use crate::net::queue::BoundedQueue;
use crate::observability::metrics;

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CONNECTION: usize = 2;
const EVENT_CAPACITY: usize = 1024;
const ACCEPT_RETRY: Duration = Duration::from_millis(100);

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Bind address did not parse.
    #[error("Invalid bind address {address}: {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(io::Error),
    /// Failed to set up readiness polling.
    #[error("Failed to set up poll: {0}")]
    Poll(io::Error),
}

/// Bind a non-blocking listening socket with the configured backlog.
pub fn bind_listener(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr =
        config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::Address {
                address: config.bind_address.clone(),
                source,
            })?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(ListenerError::Bind)?;
    socket.set_reuse_address(true).map_err(ListenerError::Bind)?;
    socket.set_nonblocking(true).map_err(ListenerError::Bind)?;
    socket.bind(&addr.into()).map_err(ListenerError::Bind)?;
    let backlog = i32::try_from(config.backlog).unwrap_or(i32::MAX);
    socket.listen(backlog).map_err(ListenerError::Bind)?;

    let listener = TcpListener::from_std(socket.into());
    if let Ok(local) = listener.local_addr() {
        tracing::info!(address = %local, backlog = config.backlog, "Listener bound");
    }
    Ok(listener)
}

/// Accepted connection waiting for its first (or next) bytes.
struct Held {
    id: ConnectionId,
    peer: SocketAddr,
    accepted_at: Instant,
    stream: TcpStream,
}

enum Readiness {
    Data,
    Idle,
    Closed,
    Failed(io::Error),
}

/// The acceptor loop: owns the listener and every connection not yet dispatched.
pub struct Acceptor {
    poll: Poll,
    listener: TcpListener,
    held: HashMap<Token, Held>,
    next_token: usize,
    queue: Arc<BoundedQueue<Connection>>,
    shutdown: Shutdown,
    /// Set when accept failed before draining the backlog.
    accept_stalled: bool,
}

/// Readiness is edge-triggered: after a failed accept the backlog is not
/// reported again, so the next wait is bounded and accept is retried.
fn poll_timeout(accept_stalled: bool) -> Option<Duration> {
    accept_stalled.then_some(ACCEPT_RETRY)
}

impl Acceptor {
    pub fn new(
        mut listener: TcpListener,
        queue: Arc<BoundedQueue<Connection>>,
    ) -> Result<Self, ListenerError> {
        let poll = Poll::new().map_err(ListenerError::Poll)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(ListenerError::Poll)?;
        let waker = Waker::new(poll.registry(), WAKER).map_err(ListenerError::Poll)?;

        Ok(Self {
            poll,
            listener,
            held: HashMap::new(),
            next_token: FIRST_CONNECTION,
            queue,
            shutdown: Shutdown::new(waker),
            accept_stalled: false,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle that stops [`Acceptor::run`].
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Number of connections currently watched for readiness.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Run until shutdown is triggered.
    pub fn run(mut self) -> io::Result<()> {
        let mut events = Events::with_capacity(EVENT_CAPACITY);
        while !self.shutdown.is_triggered() {
            if let Err(e) = self
                .poll
                .poll(&mut events, poll_timeout(self.accept_stalled))
            {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e);
            }
            if self.accept_stalled {
                self.accept_pending();
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_pending(),
                    WAKER => {}
                    token => self.dispatch_if_ready(token),
                }
            }
            metrics::set_held_connections(self.held.len());
        }

        let remaining = self.held.len();
        for (_, held) in self.held.drain() {
            close_held(held, "shutdown");
        }
        tracing::info!(closed_idle = remaining, "Acceptor stopped");
        Ok(())
    }

    /// Accept until the listener would block.
    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = Token(self.next_token);
                    self.next_token = self.next_token.wrapping_add(1).max(FIRST_CONNECTION);
                    if let Err(e) =
                        self.poll
                            .registry()
                            .register(&mut stream, token, Interest::READABLE)
                    {
                        tracing::warn!(peer_addr = %peer, error = %e, "Failed to watch connection");
                        continue;
                    }
                    let id = ConnectionId::new();
                    metrics::record_connection_accepted();
                    tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection accepted");
                    self.held.insert(
                        token,
                        Held {
                            id,
                            peer,
                            accepted_at: Instant::now(),
                            stream,
                        },
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.accept_stalled = false;
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // e.g. descriptor exhaustion; the backlog is retried after ACCEPT_RETRY
                    tracing::warn!(error = %e, "Accept failed");
                    self.accept_stalled = true;
                    break;
                }
            }
        }
    }

    fn dispatch_if_ready(&mut self, token: Token) {
        let Some(held) = self.held.get(&token) else {
            return;
        };
        match peek(&held.stream) {
            Readiness::Idle => {}
            Readiness::Closed => {
                if let Some(held) = self.take(token) {
                    close_held(held, "peer closed");
                }
            }
            Readiness::Failed(e) => {
                if let Some(held) = self.take(token) {
                    tracing::debug!(connection_id = %held.id, error = %e, "Socket error while idle");
                    close_held(held, "socket error");
                }
            }
            Readiness::Data => {
                let Some(held) = self.take(token) else {
                    return;
                };
                let id = held.id;
                match Connection::from_ready(held.id, held.peer, held.accepted_at, held.stream) {
                    Ok(conn) => {
                        let depth = self.queue.enqueue(conn);
                        metrics::set_queue_depth(depth);
                        tracing::trace!(connection_id = %id, queue_depth = depth, "Connection queued");
                    }
                    Err(e) => {
                        tracing::warn!(connection_id = %id, error = %e, "Failed to prepare connection");
                    }
                }
            }
        }
    }

    /// Remove a connection from the poll set, transferring ownership to the caller.
    fn take(&mut self, token: Token) -> Option<Held> {
        let mut held = self.held.remove(&token)?;
        if let Err(e) = self.poll.registry().deregister(&mut held.stream) {
            tracing::debug!(connection_id = %held.id, error = %e, "Deregister failed");
        }
        Some(held)
    }
}

fn peek(stream: &TcpStream) -> Readiness {
    let mut first_byte = [0u8; 1];
    loop {
        return match stream.peek(&mut first_byte) {
            Ok(0) => Readiness::Closed,
            Ok(_) => Readiness::Data,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Readiness::Idle,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Readiness::Failed(e),
        };
    }
}

fn close_held(held: Held, reason: &'static str) {
    metrics::record_connection_closed();
    tracing::debug!(
        connection_id = %held.id,
        peer_addr = %held.peer,
        reason,
        "Closing idle connection"
    );
}
