use crate::packet::IcmpType;
use std::io;
use std::net::Ipv4Addr;
use thiserror::Error;

/// A ping result.
pub type Result<T> = std::result::Result<T, Error>;

/// A ping error.
///
/// `BadConfig`, `Resolve` and `Socket` happen before any probe is sent and
/// abort the run; everything else is local to a single probe.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("resolve error: {0}")]
    Resolve(String),
    #[error("listen error: {0}")]
    Socket(io::Error),
    #[error("marshal error: payload of {0} bytes is too large")]
    Marshal(usize),
    #[error("send error to {1}: {0}")]
    Send(io::Error, Ipv4Addr),
    #[error("recv timeout")]
    Timeout,
    #[error("recv error: {0}")]
    Recv(io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unexpected ICMP type: {0}")]
    UnexpectedType(IcmpType),
    #[error("invalid echo body")]
    InvalidBody,
    #[error("mismatched ID (got {0})")]
    IdentifierMismatch(u16),
    #[error("invalid timestamp payload")]
    InvalidTimestamp,
}

impl Error {
    /// Is this a setup error after which no probe can be attempted?
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::BadConfig(_) | Self::Resolve(_) | Self::Socket(_))
    }
}
