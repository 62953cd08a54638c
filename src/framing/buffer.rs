//! Owned line buffer.
//!
//! A `Line` holds the bytes of one framed line followed by a NUL sentinel
//! that is not counted in its length, so the storage always has room for
//! `len + 1` bytes. Growth is amortized by `BytesMut`.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use super::LINE_TERMINATOR;

/// Starting capacity; most interactive lines fit without growing.
const INITIAL_CAPACITY: usize = 64;

/// One line received from a peer.
#[derive(Clone, PartialEq, Eq)]
pub struct Line {
    /// Line bytes followed by a single trailing NUL.
    buf: BytesMut,
}

impl Line {
    /// Create an empty line.
    pub fn new() -> Self {
        let mut buf = BytesMut::with_capacity(INITIAL_CAPACITY);
        buf.put_u8(0);
        Self { buf }
    }

    /// Append one byte, keeping the NUL sentinel after it.
    pub(crate) fn push(&mut self, byte: u8) {
        let end = self.len();
        self.buf[end] = byte;
        self.buf.put_u8(0);
    }

    /// Number of bytes in the line, excluding the sentinel.
    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes allocated for the line and its sentinel.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// The line bytes, terminator included when one was received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// The line bytes followed by the NUL sentinel.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    /// Whether the line ends with `\n`.
    pub fn is_terminated(&self) -> bool {
        self.as_bytes().last() == Some(&LINE_TERMINATOR)
    }

    /// Convert into immutable bytes without the sentinel.
    pub fn into_bytes(self) -> Bytes {
        let len = self.len();
        let mut buf = self.buf;
        buf.truncate(len);
        buf.freeze()
    }
}

impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for Line {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Line")
            .field(&String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_line() {
        let line = Line::new();
        assert!(line.is_empty());
        assert_eq!(line.as_bytes(), b"");
        assert_eq!(line.as_bytes_with_nul(), b"\0");
        assert!(line.capacity() >= 1);
        assert!(!line.is_terminated());
    }

    #[test]
    fn test_push_keeps_sentinel() {
        let mut line = Line::new();
        for &b in b"hi\n" {
            line.push(b);
            assert!(line.capacity() >= line.len() + 1);
            assert_eq!(line.as_bytes_with_nul().last(), Some(&0));
        }
        assert_eq!(line.len(), 3);
        assert_eq!(line.as_bytes(), b"hi\n");
        assert_eq!(line.as_bytes_with_nul(), b"hi\n\0");
        assert!(line.is_terminated());
    }

    #[test]
    fn test_growth_past_initial_capacity() {
        let mut line = Line::new();
        let data: Vec<u8> = (0..1000).map(|i| b'a' + (i % 26) as u8).collect();
        for &b in &data {
            line.push(b);
        }
        assert_eq!(line.as_bytes(), &data[..]);
        assert!(line.capacity() >= 1001);
        assert_eq!(line.as_bytes_with_nul()[1000], 0);
    }

    #[test]
    fn test_into_bytes_drops_sentinel() {
        let mut line = Line::new();
        for &b in b"abc\n" {
            line.push(b);
        }
        assert_eq!(&line.into_bytes()[..], b"abc\n");
    }

    #[test]
    fn test_interior_nul_preserved() {
        let mut line = Line::new();
        for &b in b"a\0b\n" {
            line.push(b);
        }
        assert_eq!(line.len(), 4);
        assert_eq!(line.as_bytes(), b"a\0b\n");
    }
}
