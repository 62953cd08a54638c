//! In-memory stream for exercising framing and session logic.

use std::io::{self, Cursor, Read, Write};

/// Serves canned incoming bytes and records every write call separately.
#[derive(Debug)]
pub struct MockStream {
    incoming: Cursor<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    reads: usize,
    fail_with: Option<io::ErrorKind>,
}

impl MockStream {
    pub fn new(incoming: &[u8]) -> Self {
        Self {
            incoming: Cursor::new(incoming.to_vec()),
            writes: Vec::new(),
            reads: 0,
            fail_with: None,
        }
    }

    /// Serves `incoming`, then fails every further read with `kind`.
    pub fn failing(incoming: &[u8], kind: io::ErrorKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Self::new(incoming)
        }
    }

    /// Each `write` call, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Number of `read` calls made.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        match self.incoming.read(buf)? {
            0 if !buf.is_empty() => match self.fail_with {
                Some(kind) => Err(io::Error::from(kind)),
                None => Ok(0),
            },
            n => Ok(n),
        }
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
