//! Connection state machine for a single TCP peer.
//!
//! Each connection owns its stream exclusively and tracks where it is in its
//! lifecycle. Clients move `Connected -> Draining -> Closed`; the server side
//! moves `Accepted -> Draining -> Echoing -> Closed`.

use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use tracing::debug;

/// Which end of the conversation this connection is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Client side, connect completed.
    Connected,
    /// Server side, returned from accept.
    Accepted,
    /// Reading lines until the peer closes.
    Draining,
    /// Server side, sending the accumulated text back.
    Echoing,
    /// Stream released.
    Closed,
}

/// A single peer connection.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    role: Role,
    state: ConnState,
    opened_at: DateTime<Utc>,
}

impl<S> Connection<S> {
    /// Wrap a stream returned from a successful connect.
    pub fn connected(stream: S, peer: SocketAddr) -> Self {
        Self::new(stream, peer, Role::Client, ConnState::Connected)
    }

    /// Wrap a stream returned from accept.
    pub fn accepted(stream: S, peer: SocketAddr) -> Self {
        Self::new(stream, peer, Role::Server, ConnState::Accepted)
    }

    fn new(stream: S, peer: SocketAddr, role: Role, state: ConnState) -> Self {
        Self {
            stream,
            peer,
            role,
            state,
            opened_at: Utc::now(),
        }
    }

    /// Transition to draining.
    pub fn start_draining(&mut self) {
        debug_assert!(matches!(self.state, ConnState::Connected | ConnState::Accepted));
        self.state = ConnState::Draining;
    }

    /// Transition to echoing. Server side only.
    pub fn start_echoing(&mut self) {
        debug_assert_eq!(self.role, Role::Server);
        debug_assert_eq!(self.state, ConnState::Draining);
        self.state = ConnState::Echoing;
    }

    /// Close the connection, releasing the stream.
    ///
    /// Consumes the connection so the stream is released exactly once.
    pub fn close(mut self) {
        self.state = ConnState::Closed;
        debug!(
            peer = %self.peer,
            role = ?self.role,
            state = ?self.state,
            open_ms = (Utc::now() - self.opened_at).num_milliseconds(),
            "Connection closed"
        );
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// When the connection was established.
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn test_server_state_transitions() {
        let mut conn = Connection::accepted(Vec::<u8>::new(), peer());
        assert_eq!(conn.role(), Role::Server);
        assert_eq!(conn.state(), ConnState::Accepted);

        conn.start_draining();
        assert_eq!(conn.state(), ConnState::Draining);

        conn.start_echoing();
        assert_eq!(conn.state(), ConnState::Echoing);

        conn.close();
    }

    #[test]
    fn test_client_state_transitions() {
        let mut conn = Connection::connected(Vec::<u8>::new(), peer());
        assert_eq!(conn.role(), Role::Client);
        assert_eq!(conn.state(), ConnState::Connected);

        conn.start_draining();
        assert_eq!(conn.state(), ConnState::Draining);
        assert_eq!(conn.peer(), peer());
        assert!(conn.opened_at() <= Utc::now());
    }

    #[test]
    fn test_stream_access() {
        let mut conn = Connection::accepted(Vec::<u8>::new(), peer());
        conn.stream_mut().extend_from_slice(b"abc");
        assert_eq!(conn.stream(), b"abc");
    }
}
