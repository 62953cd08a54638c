//! Raw byte writer.

use std::io::Write;
use tracing::trace;

use crate::error::{Error, Result};

/// Write `bytes` to `sink` as-is.
///
/// No terminator is added or checked; callers pass bytes that already end
/// the way they want them to. Empty input is a no-op returning zero.
pub fn send_line<W: Write + ?Sized>(sink: &mut W, bytes: &[u8]) -> Result<usize> {
    if bytes.is_empty() {
        return Ok(0);
    }

    sink.write_all(bytes).map_err(Error::Send)?;
    sink.flush().map_err(Error::Send)?;

    trace!(bytes = bytes.len(), "Sent");
    Ok(bytes.len())
}
