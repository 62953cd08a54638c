//! Host name and literal address resolution.

use socket2::Domain;
use std::fmt;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use tracing::{info, warn};

use crate::error::{Error, ResolutionError, Result};

/// A numeric address produced by [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress {
    ip: IpAddr,
}

impl ResolvedAddress {
    /// The numeric address.
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Protocol family to create a socket for.
    pub fn domain(&self) -> Domain {
        match self.ip {
            IpAddr::V4(_) => Domain::IPV4,
            IpAddr::V6(_) => Domain::IPV6,
        }
    }

    /// Pair the address with a port.
    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.ip, port)
    }
}

impl From<IpAddr> for ResolvedAddress {
    fn from(ip: IpAddr) -> Self {
        Self { ip }
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ip.fmt(f)
    }
}

/// Resolve a host name or literal IP address.
///
/// An empty string fails with [`ResolutionError::InvalidInput`] without any
/// lookup. Otherwise this performs a blocking system lookup and returns the
/// first IPv4 address found, falling back to the first IPv6 address.
pub fn resolve(host: &str) -> Result<ResolvedAddress> {
    if host.is_empty() {
        return Err(Error::Resolution {
            host: host.to_string(),
            kind: ResolutionError::InvalidInput,
        });
    }

    info!(host, "Resolving host name or IP address");

    let addrs: Vec<SocketAddr> = match (host, 0).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            warn!(host, error = %e, "Hostname or IP address resolution failed");
            return Err(Error::Resolution {
                host: host.to_string(),
                kind: ResolutionError::NotFound(Some(e)),
            });
        }
    };

    let chosen = addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .map(|addr| ResolvedAddress::from(addr.ip()));

    match chosen {
        Some(resolved) => {
            info!(host, address = %resolved, "Hostname or IP address resolution succeeded");
            Ok(resolved)
        }
        None => {
            warn!(host, "Hostname or IP address resolution returned no addresses");
            Err(Error::Resolution {
                host: host.to_string(),
                kind: ResolutionError::NotFound(None),
            })
        }
    }
}
