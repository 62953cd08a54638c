//! Error types shared by the server and client.
//!
//! Every failure is surfaced as a value. Only the binaries decide to
//! terminate the process.

use std::io;
use std::net::SocketAddr;

use crate::config::ConfigError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a host name or address could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// Empty host string. No lookup was attempted.
    #[error("host name or address is empty")]
    InvalidInput,
    /// The lookup ran but produced no usable address.
    #[error("no address found")]
    NotFound(#[source] Option<io::Error>),
}

/// Errors produced by the echo server and client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("port {0} is outside the range 1024-49151 inclusive")]
    InvalidPort(i64),

    #[error("could not resolve '{host}'")]
    Resolution {
        host: String,
        #[source]
        kind: ResolutionError,
    },

    #[error("could not create a TCP endpoint")]
    SocketCreation(#[source] io::Error),

    #[error("could not configure the socket to be reusable")]
    SocketOption(#[source] io::Error),

    #[error("could not bind socket to port {port}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("could not open socket for listening")]
    Listen(#[source] io::Error),

    #[error("could not accept a client connection")]
    Accept(#[source] io::Error),

    #[error("the attempt to contact the server at {addr} failed")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to send data")]
    Send(#[source] io::Error),

    #[error("network error stopped us from receiving more text ({discarded} bytes discarded)")]
    Receive {
        discarded: usize,
        #[source]
        source: io::Error,
    },

    #[error("console I/O failed")]
    Console(#[source] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether the error ends the process rather than a single connection.
    ///
    /// Send and receive failures are scoped to the peer they happened on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Send(_) | Error::Receive { .. })
    }
}
