//! Connection descriptors and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Carry the accepted socket plus peer info between owners
//! - Switch a ready socket to blocking mode before a worker takes it
//! - Record the close when the descriptor is dropped

use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use std::{fmt, io};

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An accepted connection with pending data, owned by exactly one component.
///
/// Dropping it closes the socket.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    accepted_at: Instant,
    stream: TcpStream,
}

impl Connection {
    /// Take over a non-blocking socket from the multiplexer and make it blocking.
    #[cfg(unix)]
    pub fn from_ready(
        id: ConnectionId,
        peer: SocketAddr,
        accepted_at: Instant,
        stream: mio::net::TcpStream,
    ) -> io::Result<Self> {
        use std::os::unix::io::{FromRawFd, IntoRawFd};

        // SAFETY: `into_raw_fd` relinquishes ownership of a valid, open socket
        // descriptor, which is immediately re-owned by exactly one TcpStream.
        let stream = unsafe { TcpStream::from_raw_fd(stream.into_raw_fd()) };
        Self::new(id, peer, accepted_at, stream)
    }

    #[cfg(windows)]
    pub fn from_ready(
        id: ConnectionId,
        peer: SocketAddr,
        accepted_at: Instant,
        stream: mio::net::TcpStream,
    ) -> io::Result<Self> {
        use std::os::windows::io::{FromRawSocket, IntoRawSocket};

        // SAFETY: ownership of the socket handle moves to the new TcpStream.
        let stream = unsafe { TcpStream::from_raw_socket(stream.into_raw_socket()) };
        Self::new(id, peer, accepted_at, stream)
    }

    /// Wrap an already-connected socket, forcing blocking mode.
    pub fn new(
        id: ConnectionId,
        peer: SocketAddr,
        accepted_at: Instant,
        stream: TcpStream,
    ) -> io::Result<Self> {
        stream.set_nonblocking(false)?;
        Ok(Self {
            id,
            peer,
            accepted_at,
            stream,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn accepted_at(&self) -> Instant {
        self.accepted_at
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        metrics::record_connection_closed();
        tracing::trace!(
            connection_id = %self.id,
            peer_addr = %self.peer,
            lifetime_ms = self.accepted_at.elapsed().as_millis() as u64,
            "Connection closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[test]
    fn ready_socket_becomes_blocking_and_usable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (accepted, peer) = listener.accept().unwrap();
        accepted.set_nonblocking(true).unwrap();
        let ready = mio::net::TcpStream::from_std(accepted);

        let mut conn =
            Connection::from_ready(ConnectionId::new(), peer, Instant::now(), ready).unwrap();
        assert_eq!(conn.peer(), peer);

        client.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        conn.stream_mut().read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        drop(conn);
        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).unwrap(), 0);
    }
}
