//! Interactive echo client.
//!
//! Reads operator lines from an input source, forwards them to the server
//! and prints what comes back. Console rendering lives here; framing and
//! connection handling come from [`crate::framing`] and [`crate::net`].

use std::io::{self, BufRead, Read, Write};
use std::net::{Shutdown, TcpStream};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::framing::{send_line, Line, LineFramer};
use crate::net::{self, Connection};

const PROMPT: &[u8] = b"> ";
const REPLY_PREFIX: &[u8] = b"S: ";
const DISCONNECTED: &[u8] = b"S: <disconnected>\n";

/// How the session treats replies and the '.' sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Read one reply line after every send. Only useful against a server
    /// that echoes line by line.
    pub await_replies: bool,
    /// A line holding only '.' is sent and then ends the session; the echo
    /// is collected after half-closing the connection.
    pub dot_terminates: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            await_replies: false,
            dot_terminates: true,
        }
    }
}

impl From<&ClientConfig> for SessionOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            await_replies: config.await_replies,
            dot_terminates: config.dot_terminates,
        }
    }
}

/// What the operator typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// `exit` or `quit`, any case.
    Exit,
    /// Nothing but the line ending.
    Blank,
    /// A lone `.`.
    Dot,
    /// Anything else.
    Text,
}

impl Input {
    pub fn classify(raw: &[u8]) -> Self {
        let text = strip_line_ending(raw);
        if text.eq_ignore_ascii_case(b"exit") || text.eq_ignore_ascii_case(b"quit") {
            Input::Exit
        } else if text.is_empty() {
            Input::Blank
        } else if text == b"." {
            Input::Dot
        } else {
            Input::Text
        }
    }
}

fn strip_line_ending(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

/// Counters for a finished session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub sends: usize,
    pub bytes_sent: usize,
    pub replies: usize,
    /// The server closed the connection before the operator finished.
    pub server_closed: bool,
    /// The operator ended the session with a lone '.'.
    pub ended_by_dot: bool,
}

/// Prompt loop over an operator input and a console output.
pub struct InteractiveSession<I, O> {
    input: I,
    output: O,
    options: SessionOptions,
}

impl<I: BufRead, O: Write> InteractiveSession<I, O> {
    pub fn new(input: I, output: O, options: SessionOptions) -> Self {
        Self {
            input,
            output,
            options,
        }
    }

    /// Print usage directions.
    pub fn print_banner(&mut self) -> Result<()> {
        let mut banner = String::from(
            "\nType the message to send to the server at the '>' prompt, and then press ENTER.\n",
        );
        if self.options.await_replies {
            banner.push_str("The server's reply, if any, will be shown with a 'S:' prefix.\n");
        } else {
            banner.push_str("The server's echo will be shown with a 'S:' prefix at the end.\n");
        }
        if self.options.dot_terminates {
            banner.push_str(
                "When you have nothing more to say, type a dot ('.') on a line by itself.\n",
            );
        }
        banner.push_str("To exit, type 'exit' or 'quit' and then press ENTER.\n\n");
        self.write_console(banner.as_bytes())
    }

    /// Run the prompt loop until the operator exits, input ends, or the
    /// server closes the connection.
    ///
    /// Any send or receive error ends the session immediately.
    pub fn run<S: Read + Write>(&mut self, framer: &mut LineFramer<S>) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        let mut raw = Vec::new();

        self.write_console(PROMPT)?;
        loop {
            raw.clear();
            let n = self
                .input
                .read_until(b'\n', &mut raw)
                .map_err(Error::Console)?;
            if n == 0 {
                debug!("Operator input ended");
                break;
            }

            let kind = Input::classify(&raw);
            match kind {
                Input::Exit => break,
                Input::Blank => {
                    self.write_console(PROMPT)?;
                    continue;
                }
                Input::Dot | Input::Text => {}
            }

            summary.bytes_sent += send_line(framer.get_mut(), &raw)?;
            summary.sends += 1;

            if kind == Input::Dot && self.options.dot_terminates {
                summary.ended_by_dot = true;
                break;
            }

            if self.options.await_replies {
                let reply = framer.receive_line()?;
                if !reply.line.is_empty() {
                    self.print_reply(&reply.line)?;
                    summary.replies += 1;
                }
                if reply.end_of_stream {
                    summary.server_closed = true;
                    break;
                }
            }

            self.write_console(PROMPT)?;
        }

        Ok(summary)
    }

    /// Print every remaining line until the server closes the stream.
    ///
    /// Used after the send side has been shut down, when the server echoes
    /// the whole conversation at once. Returns the number of lines printed.
    pub fn drain<S: Read>(&mut self, framer: &mut LineFramer<S>) -> Result<usize> {
        let mut printed = 0;
        loop {
            let received = framer.receive_line()?;
            if !received.line.is_empty() {
                self.print_reply(&received.line)?;
                printed += 1;
            }
            if received.end_of_stream {
                return Ok(printed);
            }
        }
    }

    /// Print the disconnect marker.
    pub fn print_disconnected(&mut self) -> Result<()> {
        self.write_console(DISCONNECTED)
    }

    /// Whether the rest of the server's echo still has to be collected
    /// once the prompt loop is over.
    fn expects_echo(&self, summary: &SessionSummary) -> bool {
        !summary.server_closed && (summary.ended_by_dot || !self.options.await_replies)
    }

    fn print_reply(&mut self, line: &Line) -> Result<()> {
        self.write_console(REPLY_PREFIX)?;
        self.write_console(line.as_bytes())?;
        if !line.is_terminated() {
            self.write_console(b"\n")?;
        }
        Ok(())
    }

    fn write_console(&mut self, bytes: &[u8]) -> Result<()> {
        self.output.write_all(bytes).map_err(Error::Console)?;
        self.output.flush().map_err(Error::Console)
    }
}

/// Resolve the server, create a socket and connect.
pub fn connect(config: &ClientConfig) -> Result<Connection<TcpStream>> {
    let resolved = net::resolve(&config.host)?;
    info!(host = %config.host, "Connection address of the server has been validated");

    let socket = net::create_stream_socket(resolved.domain())?;
    let stream = net::connect(socket, &resolved, config.port)?;
    Ok(Connection::connected(stream, resolved.socket_addr(config.port)))
}

/// Connect and run an interactive session on stdin/stdout.
pub fn run(config: &ClientConfig) -> Result<SessionSummary> {
    let mut conn = connect(config)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session =
        InteractiveSession::new(stdin.lock(), stdout.lock(), SessionOptions::from(config));

    session.print_banner()?;
    let result = converse(&mut session, &mut conn);
    conn.close();
    session.print_disconnected()?;
    result
}

/// Run the prompt loop over a connected stream, then half-close and print
/// the server's echo if the session still expects one.
pub fn converse<I: BufRead, O: Write>(
    session: &mut InteractiveSession<I, O>,
    conn: &mut Connection<TcpStream>,
) -> Result<SessionSummary> {
    let mut framer = LineFramer::new(conn.stream_mut());
    let mut summary = session.run(&mut framer)?;

    if session.expects_echo(&summary) {
        // Half-close so the server sees end of stream, then collect its echo.
        framer
            .get_ref()
            .shutdown(Shutdown::Write)
            .map_err(Error::Send)?;
        conn.start_draining();
        let mut framer = LineFramer::new(conn.stream_mut());
        summary.replies += session.drain(&mut framer)?;
    }

    info!(
        sends = summary.sends,
        bytes_sent = summary.bytes_sent,
        replies = summary.replies,
        "Session finished"
    );
    Ok(summary)
}
