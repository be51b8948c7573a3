use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use crate::packet::{self, EchoPacket, IcmpMessage, IcmpType, MAX_PACKET_SIZE};
use crate::resolve::resolve_ipv4;
use crate::socket::{EchoSocket, RawSocket};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::instrument;

/// The outcome of a single probe.
///
/// Every call to [`Session::probe`] produces exactly one of these.
#[derive(Debug)]
pub struct ProbeResult {
    /// The sequence number the echo request was sent with.
    pub sequence: u16,
    /// The round trip time on success, or the reason the probe failed.
    pub outcome: Result<Duration>,
}

/// An echo session with a single target.
///
/// Owns the socket for the lifetime of the run. Dropping the session drops
/// the socket, which closes it.
#[derive(Debug)]
pub struct Session<S: EchoSocket = RawSocket> {
    socket: S,
    target: Ipv4Addr,
    identifier: u16,
    next_sequence: u16,
    timeout: Duration,
}

impl Session<RawSocket> {
    /// Resolve the configured target and open a raw ICMP socket.
    ///
    /// Fails with [`Error::Resolve`] or [`Error::Socket`].
    #[instrument(skip_all, fields(host = config.target()), level = "debug")]
    pub fn open(config: &ProbeConfig) -> Result<Self> {
        let target = resolve_ipv4(config.target())?;
        let socket = RawSocket::open()?;
        Ok(Self::with_socket(
            socket,
            target,
            config.identifier(),
            config.timeout(),
        ))
    }
}

impl<S: EchoSocket> Session<S> {
    pub const fn with_socket(socket: S, target: Ipv4Addr, identifier: u16, timeout: Duration) -> Self {
        Self {
            socket,
            target,
            identifier,
            next_sequence: 0,
            timeout,
        }
    }

    #[must_use]
    pub const fn target(&self) -> Ipv4Addr {
        self.target
    }

    #[must_use]
    pub const fn identifier(&self) -> u16 {
        self.identifier
    }

    /// The sequence number the next probe will use.
    #[must_use]
    pub const fn next_sequence(&self) -> u16 {
        self.next_sequence
    }

    /// Send one echo request and wait for its reply.
    ///
    /// Waits at most the configured timeout in total. A copy of the request
    /// itself is skipped; any other datagram ends the probe. The sequence
    /// number advances whether or not the probe succeeds and wraps to 0
    /// after `u16::MAX`. Nothing is retried.
    #[instrument(skip(self), fields(dest = %self.target, id = self.identifier), level = "debug")]
    pub fn probe(&mut self) -> ProbeResult {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let outcome = self.exchange(sequence);
        match &outcome {
            Ok(rtt) => tracing::debug!(sequence, ?rtt, "echo reply"),
            Err(err) => tracing::debug!(sequence, %err, "probe failed"),
        }
        ProbeResult { sequence, outcome }
    }

    fn exchange(&mut self, sequence: u16) -> Result<Duration> {
        let payload = packet::encode_timestamp(now_millis());
        let request = EchoPacket::request(self.identifier, sequence, payload).encode()?;
        self.socket.send_to(&request, self.target)?;
        let deadline = Instant::now() + self.timeout;
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }
            self.socket.set_read_timeout(remaining)?;
            let bytes_read = self.socket.recv(&mut buf)?;
            let message = IcmpMessage::parse(&buf[..bytes_read])?;
            tracing::trace!(
                icmp_type = %message.icmp_type,
                code = message.code,
                checksum = message.checksum,
                "received"
            );
            if self.is_own_request(&message, sequence) {
                // raw sockets see our outgoing request when the target is local
                continue;
            }
            if message.icmp_type != IcmpType::EchoReply {
                return Err(Error::UnexpectedType(message.icmp_type));
            }
            let echo = message.echo()?;
            if echo.identifier != self.identifier {
                return Err(Error::IdentifierMismatch(echo.identifier));
            }
            // the reply sequence is not used for correlation
            if echo.sequence != sequence {
                tracing::debug!(expected = sequence, actual = echo.sequence, "sequence differs");
            }
            let sent = packet::decode_timestamp(echo.data)?;
            return Ok(round_trip(sent, now_millis()));
        }
    }

    fn is_own_request(&self, message: &IcmpMessage<'_>, sequence: u16) -> bool {
        message.icmp_type == IcmpType::EchoRequest
            && message
                .echo()
                .is_ok_and(|echo| echo.identifier == self.identifier && echo.sequence == sequence)
    }
}

impl<S: EchoSocket> Drop for Session<S> {
    fn drop(&mut self) {
        tracing::debug!(dest = %self.target, "closing session");
    }
}

/// Milliseconds since the unix epoch, negative if the clock is before it.
#[must_use]
pub fn now_millis() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
        Err(err) => i64::try_from(err.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
    }
}

/// The elapsed time between two millisecond timestamps, never negative.
fn round_trip(sent: i64, received: i64) -> Duration {
    Duration::from_millis(u64::try_from(received.saturating_sub(sent)).unwrap_or(0))
}
