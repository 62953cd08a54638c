//! Connection lifecycle for the echo server and client.
//!
//! - `resolve`: host name / literal address lookup
//! - `socket`: stream socket creation, bind/listen/accept, connect
//! - `readiness`: readiness waits for non-blocking sockets
//! - `connection`: an owned socket paired with its lifecycle state
//!
//! All calls block the calling thread. Sockets are owned values and are
//! released when dropped, on every exit path.

mod connection;
mod readiness;
mod resolve;
mod socket;

pub use connection::{ConnState, Connection, Role};
pub use readiness::{PolledStream, Readiness};
pub use resolve::{resolve, ResolvedAddress};
pub use socket::{
    accept, bind, configure_reusable, connect, create_stream_socket, listen, open_listener,
    BACKLOG,
};

use crate::error::{Error, Result};

/// Lowest port accepted for bind and connect.
pub const MIN_PORT: u16 = 1024;

/// Highest port accepted for bind and connect.
pub const MAX_PORT: u16 = 49151;

/// Check that `port` lies in the registered range 1024-49151 inclusive.
pub fn validate_port(port: impl Into<i64>) -> Result<u16> {
    let port = port.into();
    if (i64::from(MIN_PORT)..=i64::from(MAX_PORT)).contains(&port) {
        Ok(port as u16)
    } else {
        Err(Error::InvalidPort(port))
    }
}
