//! Readiness waits for non-blocking sockets.
//!
//! A non-blocking socket reports `WouldBlock` when no data is available.
//! Rather than spinning on the read, the caller parks in `poll` (epoll on
//! Linux, kqueue on macOS) until the socket becomes ready again.

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};
use tracing::trace;

const SOCKET_TOKEN: Token = Token(0);

/// A poll instance watching a single file descriptor.
pub struct Readiness {
    poll: Poll,
    events: Events,
}

impl Readiness {
    /// Watch `fd` for both read and write readiness.
    pub fn new(fd: RawFd) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry().register(
            &mut SourceFd(&fd),
            SOCKET_TOKEN,
            Interest::READABLE | Interest::WRITABLE,
        )?;
        Ok(Self {
            poll,
            events: Events::with_capacity(4),
        })
    }

    /// Block until the descriptor is ready for `interest`.
    ///
    /// Readiness is edge-triggered, so a wakeup may be spurious: callers
    /// retry their operation and wait again on `WouldBlock`.
    pub fn wait(&mut self, interest: Interest) -> io::Result<()> {
        loop {
            match self.poll.poll(&mut self.events, None) {
                Ok(()) => {}
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            let ready = self.events.iter().any(|event| {
                event.is_error()
                    || (interest.is_readable() && (event.is_readable() || event.is_read_closed()))
                    || (interest.is_writable() && (event.is_writable() || event.is_write_closed()))
            });
            if ready {
                return Ok(());
            }
        }
    }
}

/// A non-blocking TCP stream whose reads and writes wait for readiness
/// instead of returning `WouldBlock`.
pub struct PolledStream {
    stream: TcpStream,
    readiness: Readiness,
}

impl PolledStream {
    /// Wrap a stream that has already been put in non-blocking mode.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let readiness = Readiness::new(stream.as_raw_fd())?;
        Ok(Self { stream, readiness })
    }

    /// The underlying stream.
    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }
}

impl Read for PolledStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.stream.read(buf) {
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    trace!("Waiting for socket to become readable");
                    self.readiness.wait(Interest::READABLE)?;
                }
                other => return other,
            }
        }
    }
}

impl Write for PolledStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            match self.stream.write(buf) {
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    trace!("Waiting for socket to become writable");
                    self.readiness.wait(Interest::WRITABLE)?;
                }
                other => return other,
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
