//! Byte-stream to line decoder.
//!
//! The framer reads its source one byte at a time so it never consumes bytes
//! past the terminator of the line being returned. Nothing is buffered
//! between calls; the next call starts exactly where the last line ended.

use std::io::{self, Read};
use tracing::{trace, warn};

use super::{Line, LINE_TERMINATOR};
use crate::error::{Error, Result};

/// Outcome of one [`LineFramer::receive_line`] call.
#[derive(Debug)]
pub struct ReceivedLine {
    /// Bytes belonging to this line, terminator included if one arrived.
    pub line: Line,
    /// The peer closed the stream. No further reads will be attempted.
    pub end_of_stream: bool,
}

/// Reads newline-terminated lines from a stream.
#[derive(Debug)]
pub struct LineFramer<S> {
    source: S,
    /// Bytes read across every call on this source.
    total_read: usize,
    /// Set once a zero-length read has been observed.
    eof: bool,
}

impl<S: Read> LineFramer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            total_read: 0,
            eof: false,
        }
    }

    /// Read the next line.
    ///
    /// Returns when a `\n` arrives (included in the line) or when the peer
    /// closes the stream; in the latter case the bytes accumulated so far,
    /// possibly none, are returned with `end_of_stream` set. A zero-length
    /// read mid-line is a clean end of stream, not an error.
    ///
    /// A read error ends the line abnormally: the partial bytes are dropped
    /// and [`Error::Receive`] reports how many were discarded. `WouldBlock`
    /// is reported the same way; non-blocking sources should wait for
    /// readiness themselves (see [`crate::net::PolledStream`]).
    pub fn receive_line(&mut self) -> Result<ReceivedLine> {
        let mut line = Line::new();

        if self.eof {
            return Ok(ReceivedLine {
                line,
                end_of_stream: true,
            });
        }

        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => {
                    trace!(partial = line.len(), "Peer closed the stream");
                    self.eof = true;
                    return Ok(ReceivedLine {
                        line,
                        end_of_stream: true,
                    });
                }
                Ok(_) => {
                    line.push(byte[0]);
                    self.total_read += 1;
                    if byte[0] == LINE_TERMINATOR {
                        trace!(bytes = line.len(), "Line received");
                        return Ok(ReceivedLine {
                            line,
                            end_of_stream: false,
                        });
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    warn!(
                        discarded = line.len(),
                        error = %source,
                        "Network error stopped us from receiving more text"
                    );
                    return Err(Error::Receive {
                        discarded: line.len(),
                        source,
                    });
                }
            }
        }
    }

    /// Total bytes read from the source so far, across all lines.
    pub fn total_read(&self) -> usize {
        self.total_read
    }

    /// Whether the peer has closed the stream.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// The underlying stream, for writing replies on the same handle.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
