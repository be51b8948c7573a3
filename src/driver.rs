use crate::config::ProbeConfig;
use crate::session::{ProbeResult, Session};
use crate::socket::EchoSocket;
use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;
use tracing::instrument;

/// Probe the target `config.count()` times, writing one line per probe.
///
/// A banner line is written first. Probe failures are reported and the loop
/// carries on; only a failure to write is returned. `interval` is slept after
/// every probe regardless of how long the probe took.
#[instrument(skip_all, fields(count = config.count()), level = "debug")]
pub fn run_trials<S: EchoSocket, W: Write>(
    session: &mut Session<S>,
    config: &ProbeConfig,
    out: &mut W,
    interval: Duration,
) -> io::Result<()> {
    writeln!(out, "PING {} (id={}):", config.target(), session.identifier())?;
    out.flush()?;
    for _ in 0..config.count() {
        let result = session.probe();
        writeln!(
            out,
            "{}",
            format_result(&result, session.target(), session.identifier())
        )?;
        out.flush()?;
        thread::sleep(interval);
    }
    Ok(())
}

/// Render one probe result as a line of output.
#[must_use]
pub fn format_result(result: &ProbeResult, target: Ipv4Addr, identifier: u16) -> String {
    match &result.outcome {
        Ok(rtt) => format!(
            "{target}: icmp_seq={} id={identifier} time={}",
            result.sequence,
            humantime::format_duration(*rtt)
        ),
        Err(err) => format!("Request timeout (seq={}): {err}", result.sequence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::packet::{self, EchoPacket, IcmpType};
    use crate::session::now_millis;
    use crate::socket::MockEchoSocket;
    use mockall::Sequence;
    use std::io;

    const TARGET: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
    const IDENTIFIER: u16 = 4321;

    fn make_config(count: i64) -> anyhow::Result<ProbeConfig> {
        Ok(ProbeConfig::new(
            "test.example",
            count,
            Some(i64::from(IDENTIFIER)),
            Duration::from_millis(200),
        )?)
    }

    fn make_session(socket: MockEchoSocket, config: &ProbeConfig) -> Session<MockEchoSocket> {
        Session::with_socket(socket, TARGET, config.identifier(), config.timeout())
    }

    fn echo_reply(sequence: u16) -> Vec<u8> {
        let mut reply =
            EchoPacket::request(IDENTIFIER, sequence, packet::encode_timestamp(now_millis()));
        reply.icmp_type = IcmpType::EchoReply;
        reply.encode().unwrap()
    }

    #[test]
    fn test_failure_then_success() -> anyhow::Result<()> {
        let config = make_config(2)?;
        let mut socket = MockEchoSocket::new();
        let mut seq = Sequence::new();
        socket.expect_send_to().times(2).returning(|_, _| Ok(()));
        socket.expect_set_read_timeout().returning(|_| Ok(()));
        socket
            .expect_recv()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::Timeout));
        socket
            .expect_recv()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|buf| {
                let reply = echo_reply(1);
                buf[..reply.len()].copy_from_slice(&reply);
                Ok(reply.len())
            });
        let mut session = make_session(socket, &config);
        let mut out = Vec::new();
        run_trials(&mut session, &config, &mut out, Duration::ZERO)?;

        let output = String::from_utf8(out)?;
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(3, lines.len());
        assert_eq!("PING test.example (id=4321):", lines[0]);
        assert_eq!("Request timeout (seq=0): recv timeout", lines[1]);
        assert!(lines[2].starts_with("192.0.2.1: icmp_seq=1 id=4321 time="));
        Ok(())
    }

    #[test]
    fn test_every_trial_reported_when_all_fail() -> anyhow::Result<()> {
        let config = make_config(3)?;
        let mut socket = MockEchoSocket::new();
        socket
            .expect_send_to()
            .times(3)
            .returning(|_, addr| Err(Error::Send(io::Error::from(io::ErrorKind::Other), addr)));
        socket.expect_set_read_timeout().never();
        socket.expect_recv().never();
        let mut session = make_session(socket, &config);
        let mut out = Vec::new();
        run_trials(&mut session, &config, &mut out, Duration::ZERO)?;

        let output = String::from_utf8(out)?;
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(4, lines.len());
        for (seq, line) in lines[1..].iter().enumerate() {
            assert!(line.starts_with(&format!("Request timeout (seq={seq}): send error")));
        }
        assert_eq!(3, session.next_sequence());
        Ok(())
    }

    #[test]
    fn test_interval_after_each_probe() -> anyhow::Result<()> {
        let config = make_config(2)?;
        let mut socket = MockEchoSocket::new();
        socket.expect_send_to().times(2).returning(|_, _| Ok(()));
        socket.expect_set_read_timeout().returning(|_| Ok(()));
        socket.expect_recv().returning(|_| Err(Error::Timeout));
        let mut session = make_session(socket, &config);
        let start = std::time::Instant::now();
        run_trials(&mut session, &config, &mut io::sink(), Duration::from_millis(50))?;
        assert!(start.elapsed() >= Duration::from_millis(100));
        Ok(())
    }

    #[test]
    fn test_format_success() {
        let result = ProbeResult {
            sequence: 0,
            outcome: Ok(Duration::from_millis(12)),
        };
        assert_eq!(
            "127.0.0.1: icmp_seq=0 id=4321 time=12ms",
            format_result(&result, Ipv4Addr::LOCALHOST, 4321)
        );
    }

    #[test]
    fn test_format_identifier_mismatch() {
        let result = ProbeResult {
            sequence: 2,
            outcome: Err(Error::IdentifierMismatch(9)),
        };
        assert_eq!(
            "Request timeout (seq=2): mismatched ID (got 9)",
            format_result(&result, Ipv4Addr::LOCALHOST, 4321)
        );
    }
}
