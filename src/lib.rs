//! line-echo: a line-oriented TCP echo server and interactive client.
//!
//! The server accepts one client at a time, reads newline-terminated text
//! until the client closes its side, and echoes it back. The client prompts
//! an operator for lines, sends them and prints the replies.
//!
//! Modules:
//! - `net`: address resolution and socket lifecycle
//! - `framing`: turning a raw byte stream into lines, and writing bytes back
//! - `server`: the accept/drain/echo loop
//! - `client`: the interactive prompt loop

pub mod client;
pub mod config;
pub mod error;
pub mod framing;
pub mod logging;
pub mod net;
pub mod server;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{Error, Result};
