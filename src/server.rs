//! Echo server.
//!
//! Serves one client at a time: accept, read lines until the client closes
//! its side, echo, close, accept again. Further clients wait in the OS
//! backlog until the current conversation is finished.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use socket2::Socket;
use std::io::{Read, Write};
use std::net::SocketAddr;
use tracing::{debug, info, trace, warn};

use crate::config::{EchoMode, ServerConfig};
use crate::error::{Error, Result};
use crate::framing::{send_line, LineFramer};
use crate::net::{self, Connection, PolledStream};

/// Summary of one served connection.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub peer: SocketAddr,
    pub accepted_at: DateTime<Utc>,
    /// Non-empty lines received, including an unterminated final line.
    pub lines: usize,
    /// The stream ended in the middle of a line.
    pub partial_tail: bool,
    pub bytes_received: usize,
    pub bytes_echoed: usize,
}

/// Server instance
pub struct Server {
    config: ServerConfig,
    listener: Socket,
    local_addr: SocketAddr,
}

impl Server {
    /// Open the listening socket.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let listener = net::open_listener(config.bind, config.port)?;
        let local_addr = listener
            .local_addr()
            .map_err(Error::Listen)?
            .as_socket()
            .unwrap_or_else(|| SocketAddr::new(config.bind, config.port));

        Ok(Server {
            config,
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and serve clients until a listener-level error occurs.
    ///
    /// Errors on an individual connection are logged and the server moves on
    /// to the next client.
    pub fn run(&self) -> Result<()> {
        info!(
            address = %self.local_addr,
            echo_mode = ?self.config.echo_mode,
            "Server listening"
        );

        loop {
            match self.serve_one() {
                Ok(report) => {
                    info!(
                        peer = %report.peer,
                        lines = report.lines,
                        partial_tail = report.partial_tail,
                        bytes_received = report.bytes_received,
                        bytes_echoed = report.bytes_echoed,
                        accepted_at = %report.accepted_at.to_rfc3339(),
                        "Client session finished"
                    );
                }
                Err(e) if !e.is_fatal() => {
                    warn!(error = %e, "Client session ended with an error");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Accept one client and serve it to completion.
    pub fn serve_one(&self) -> Result<SessionReport> {
        info!("Waiting for client connection");
        let (stream, peer) = net::accept(&self.listener, self.config.nonblocking)?;
        info!(peer = %peer, "New client connected, awaiting data");

        if self.config.nonblocking {
            let stream = PolledStream::new(stream).map_err(Error::Accept)?;
            serve_accepted(Connection::accepted(stream, peer), self.config.echo_mode)
        } else {
            serve_accepted(Connection::accepted(stream, peer), self.config.echo_mode)
        }
    }
}

/// Serve a connection and close it, whatever the outcome.
fn serve_accepted<S: Read + Write>(
    mut conn: Connection<S>,
    mode: EchoMode,
) -> Result<SessionReport> {
    let result = serve_connection(&mut conn, mode);
    conn.close();
    result
}

/// Drive one accepted connection through receiving and echoing.
///
/// In [`EchoMode::Session`] every line is appended to one buffer that is
/// written back in a single send once the peer has closed its side. In
/// [`EchoMode::Line`] each line is written back as soon as it is framed.
///
/// A receive error abandons the session; anything accumulated is dropped.
pub fn serve_connection<S: Read + Write>(
    conn: &mut Connection<S>,
    mode: EchoMode,
) -> Result<SessionReport> {
    let peer = conn.peer();
    let accepted_at = conn.opened_at();

    conn.start_draining();
    let mut framer = LineFramer::new(conn.stream_mut());
    let mut session = BytesMut::new();
    let mut lines = 0;
    let mut partial_tail = false;
    let mut bytes_echoed = 0;

    loop {
        let received = framer.receive_line()?;
        if !received.line.is_empty() {
            lines += 1;
            trace!(peer = %peer, line = ?received.line, "Received");
            match mode {
                EchoMode::Session => session.extend_from_slice(received.line.as_bytes()),
                EchoMode::Line => {
                    bytes_echoed += send_line(framer.get_mut(), received.line.as_bytes())?;
                }
            }
        }
        if received.end_of_stream {
            partial_tail = !received.line.is_empty();
            break;
        }
    }

    let bytes_received = framer.total_read();
    debug!(peer = %peer, bytes = bytes_received, "Client finished sending");

    conn.start_echoing();
    if !session.is_empty() {
        bytes_echoed += send_line(conn.stream_mut(), &session)?;
        debug!(peer = %peer, bytes = bytes_echoed, "Echoed session");
    }

    Ok(SessionReport {
        peer,
        accepted_at,
        lines,
        partial_tail,
        bytes_received,
        bytes_echoed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ConnState;
    use crate::test_util::MockStream;
    use std::io;

    fn peer() -> SocketAddr {
        "127.0.0.1:40001".parse().unwrap()
    }

    #[test]
    fn test_session_echo_is_one_send() {
        let mut conn = Connection::accepted(MockStream::new(b"abc\ndef\n"), peer());
        let report = serve_connection(&mut conn, EchoMode::Session).unwrap();

        assert_eq!(conn.stream().writes(), &[b"abc\ndef\n".to_vec()]);
        assert_eq!(conn.state(), ConnState::Echoing);
        assert_eq!(report.lines, 2);
        assert!(!report.partial_tail);
        assert_eq!(report.bytes_received, 8);
        assert_eq!(report.bytes_echoed, 8);
        assert_eq!(report.peer, peer());
    }

    #[test]
    fn test_session_echo_keeps_unterminated_tail() {
        let mut conn = Connection::accepted(MockStream::new(b"abc\ntail"), peer());
        let report = serve_connection(&mut conn, EchoMode::Session).unwrap();

        assert_eq!(conn.stream().writes(), &[b"abc\ntail".to_vec()]);
        assert_eq!(report.lines, 2);
        assert!(report.partial_tail);
    }

    #[test]
    fn test_receive_error_drops_session() {
        let stream = MockStream::failing(b"abc\nde", io::ErrorKind::ConnectionReset);
        let mut conn = Connection::accepted(stream, peer());

        match serve_connection(&mut conn, EchoMode::Session) {
            Err(e @ Error::Receive { discarded: 2, .. }) => assert!(!e.is_fatal()),
            other => panic!("unexpected: {other:?}"),
        }
        // "abc\n" was framed but never echoed.
        assert!(conn.stream().writes().is_empty());
        assert_eq!(conn.state(), ConnState::Draining);
    }

    #[test]
    fn test_line_echo_stops_at_receive_error() {
        let stream = MockStream::failing(b"abc\nde", io::ErrorKind::ConnectionReset);
        let mut conn = Connection::accepted(stream, peer());

        assert!(matches!(
            serve_connection(&mut conn, EchoMode::Line),
            Err(Error::Receive { discarded: 2, .. })
        ));
        assert_eq!(conn.stream().writes(), &[b"abc\n".to_vec()]);
    }

    #[test]
    fn test_no_echo_when_nothing_received() {
        let mut conn = Connection::accepted(MockStream::new(b""), peer());
        let report = serve_connection(&mut conn, EchoMode::Session).unwrap();

        assert!(conn.stream().writes().is_empty());
        assert_eq!(report.lines, 0);
        assert_eq!(report.bytes_echoed, 0);
    }

    #[test]
    fn test_line_echo_sends_each_line() {
        let mut conn = Connection::accepted(MockStream::new(b"abc\ndef\n"), peer());
        let report = serve_connection(&mut conn, EchoMode::Line).unwrap();

        assert_eq!(
            conn.stream().writes(),
            &[b"abc\n".to_vec(), b"def\n".to_vec()]
        );
        assert_eq!(report.bytes_echoed, 8);
    }

    #[test]
    fn test_serve_accepted_closes() {
        let conn = Connection::accepted(MockStream::new(b"x\n"), peer());
        let report = serve_accepted(conn, EchoMode::Session).unwrap();
        assert_eq!(report.bytes_echoed, 2);
    }
}
