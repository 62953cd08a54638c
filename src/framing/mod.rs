//! Line-oriented framing over a raw byte stream.
//!
//! The wire format is newline-terminated text: no length prefixes, no
//! encoding negotiation, bytes passed through as-is.
//!
//! ```text
//! abc\n      -> Line("abc\n")
//! def        -> Line("def"), end of stream
//! ```

mod buffer;
mod framer;
mod writer;

pub use buffer::Line;
pub use framer::{LineFramer, ReceivedLine};
pub use writer::send_line;

/// Byte that ends one line.
pub const LINE_TERMINATOR: u8 = b'\n';
