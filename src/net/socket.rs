//! Stream socket lifecycle: create, bind, listen, accept, connect.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::net::{validate_port, ResolvedAddress};

/// Number of pending connections the OS queues before `accept`.
pub const BACKLOG: i32 = 128;

/// Allocate a new TCP endpoint.
pub fn create_stream_socket(domain: Domain) -> Result<Socket> {
    debug!("Attempting to allocate new connection endpoint");
    let socket =
        Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(Error::SocketCreation)?;
    debug!("Created connection endpoint successfully");
    Ok(socket)
}

/// Allow the address to be reused so a restarted server can bind the same
/// port while old connections linger in TIME_WAIT.
pub fn configure_reusable(socket: &Socket) -> Result<()> {
    socket
        .set_reuse_address(true)
        .map_err(Error::SocketOption)?;
    debug!("Socket configured to be reusable");
    Ok(())
}

/// Bind `socket` to `ip:port`.
///
/// The port is validated before the socket is touched.
pub fn bind(socket: &Socket, ip: IpAddr, port: u16) -> Result<()> {
    let port = validate_port(port)?;
    let addr = SocketAddr::new(ip, port);
    socket
        .bind(&addr.into())
        .map_err(|source| Error::Bind { port, source })?;
    info!(%addr, "Socket bound");
    Ok(())
}

/// Mark a bound socket as ready to accept connections.
pub fn listen(socket: &Socket) -> Result<()> {
    socket.listen(BACKLOG).map_err(Error::Listen)?;
    Ok(())
}

/// Create, configure, bind and listen in one step.
pub fn open_listener(ip: IpAddr, port: u16) -> Result<Socket> {
    let port = validate_port(port)?;
    let socket = create_stream_socket(Domain::for_address(SocketAddr::new(ip, port)))?;
    configure_reusable(&socket)?;
    bind(&socket, ip, port)?;
    listen(&socket)?;
    info!(port, backlog = BACKLOG, "Now listening");
    Ok(socket)
}

/// Block until a client connects.
///
/// When `nonblocking` is set the returned stream is switched to non-blocking
/// mode before it is handed back.
pub fn accept(listener: &Socket, nonblocking: bool) -> Result<(TcpStream, SocketAddr)> {
    let (socket, addr) = loop {
        match listener.accept() {
            Ok(accepted) => break accepted,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Accept(e)),
        }
    };

    let peer = peer_addr(&addr)?;
    if nonblocking {
        socket.set_nonblocking(true).map_err(Error::Accept)?;
    }

    debug!(peer = %peer, nonblocking, "Accepted connection");
    Ok((socket.into(), peer))
}

/// Connect `socket` to `addr:port`.
///
/// Takes ownership of the socket: on failure it is closed before the error
/// is returned, so no half-open endpoint is left behind.
pub fn connect(socket: Socket, addr: &ResolvedAddress, port: u16) -> Result<TcpStream> {
    let port = validate_port(port)?;
    let target = addr.socket_addr(port);

    info!(%target, "Attempting to contact the server");
    match socket.connect(&target.into()) {
        Ok(()) => {
            info!(%target, "Connected to the server");
            Ok(socket.into())
        }
        Err(source) => {
            warn!(%target, error = %source, "Connect failed, closing socket");
            drop(socket);
            Err(Error::Connect {
                addr: target,
                source,
            })
        }
    }
}

fn peer_addr(addr: &SockAddr) -> Result<SocketAddr> {
    addr.as_socket().ok_or_else(|| {
        Error::Accept(io::Error::new(
            io::ErrorKind::InvalidData,
            "peer address is not an IP socket address",
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn open_in_range() -> (Socket, u16) {
        for port in 41000..=crate::net::MAX_PORT {
            if let Ok(socket) = open_listener(LOCALHOST, port) {
                return (socket, port);
            }
        }
        panic!("no free port in range");
    }

    #[test]
    fn test_bind_rejects_out_of_range_ports() {
        let socket = create_stream_socket(Domain::IPV4).unwrap();
        assert!(matches!(
            bind(&socket, LOCALHOST, 80),
            Err(Error::InvalidPort(80))
        ));
        assert!(matches!(
            bind(&socket, LOCALHOST, 50000),
            Err(Error::InvalidPort(50000))
        ));
        assert!(matches!(
            open_listener(LOCALHOST, 1023),
            Err(Error::InvalidPort(1023))
        ));
    }

    #[test]
    fn test_connect_rejects_out_of_range_ports() {
        let addr = ResolvedAddress::from(LOCALHOST);
        for port in [80u16, 50000] {
            let socket = create_stream_socket(Domain::IPV4).unwrap();
            assert!(matches!(
                connect(socket, &addr, port),
                Err(Error::InvalidPort(p)) if p == i64::from(port)
            ));
        }
    }

    #[test]
    fn test_listener_reuse_address() {
        let (socket, _) = open_in_range();
        assert!(socket.reuse_address().unwrap());
    }

    #[test]
    fn test_accept_and_connect() {
        let (listener, port) = open_in_range();

        let client = std::thread::spawn(move || {
            let socket = create_stream_socket(Domain::IPV4).unwrap();
            let mut stream = connect(socket, &ResolvedAddress::from(LOCALHOST), port).unwrap();
            stream.write_all(b"ping\n").unwrap();
        });

        let (mut stream, peer) = accept(&listener, false).unwrap();
        assert_eq!(peer.ip(), LOCALHOST);

        let mut received = Vec::new();
        stream.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"ping\n");

        client.join().unwrap();
    }

    #[test]
    fn test_accept_nonblocking() {
        let (listener, port) = open_in_range();

        let client = std::thread::spawn(move || {
            let socket = create_stream_socket(Domain::IPV4).unwrap();
            connect(socket, &ResolvedAddress::from(LOCALHOST), port).unwrap()
        });

        let (mut stream, _) = accept(&listener, true).unwrap();
        let _held_open = client.join().unwrap();

        // Nothing has been sent yet, so a read must not block.
        let mut buf = [0u8; 1];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }
}
