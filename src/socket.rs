use crate::error::{Error, Result};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tracing::instrument;

/// The socket operations needed to exchange one echo request and reply.
#[cfg_attr(test, mockall::automock)]
pub trait EchoSocket {
    fn send_to(&mut self, buf: &[u8], addr: Ipv4Addr) -> Result<()>;
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;
    /// Blocks until a datagram arrives or the read timeout elapses.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// A raw `IPv4`/`ICMP` socket listening on the wildcard address.
///
/// Opening one needs elevated privileges on most platforms (root, or
/// `CAP_NET_RAW` on Linux). The descriptor is closed when this is dropped.
#[derive(Debug)]
pub struct RawSocket {
    inner: Socket,
}

impl RawSocket {
    #[instrument(level = "debug")]
    pub fn open() -> Result<Self> {
        let inner = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(socket_error)?;
        let wildcard = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        inner
            .bind(&SockAddr::from(wildcard))
            .map_err(socket_error)?;
        tracing::debug!("opened raw icmp socket");
        Ok(Self { inner })
    }
}

impl EchoSocket for RawSocket {
    #[instrument(skip(self, buf), level = "trace")]
    fn send_to(&mut self, buf: &[u8], addr: Ipv4Addr) -> Result<()> {
        // the port is ignored for ICMP
        let sock_addr = SockAddr::from(SocketAddrV4::new(addr, 0));
        self.inner
            .send_to(buf, &sock_addr)
            .map_err(|err| Error::Send(err, addr))?;
        tracing::trace!(buf = format!("{buf:02x?}"), len = buf.len());
        Ok(())
    }

    #[instrument(skip(self), level = "trace")]
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        // a zero timeout means block forever to the OS
        let timeout = timeout.max(Duration::from_millis(1));
        self.inner
            .set_read_timeout(Some(timeout))
            .map_err(Error::Recv)
    }

    #[instrument(skip(self, buf), level = "trace")]
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let bytes_read = self.inner.read(buf).map_err(|err| match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::Timeout,
            _ => Error::Recv(err),
        })?;
        tracing::trace!(buf = format!("{:02x?}", &buf[..bytes_read]), bytes_read);
        Ok(bytes_read)
    }
}

fn socket_error(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::PermissionDenied {
        Error::Socket(io::Error::new(
            err.kind(),
            format!("{err} (raw sockets require root or CAP_NET_RAW)"),
        ))
    } else {
        Error::Socket(err)
    }
}
