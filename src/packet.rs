//! ICMP (IPv4) Echo Request/Reply wire format.
//!
//! ```text
//!  0       8       16              31
//! +-------+-------+---------------+
//! | type  | code  |   checksum    |
//! +-------+-------+---------------+
//! |  identifier   |   sequence    |
//! +---------------+---------------+
//! | data ...
//! ```

use crate::error::{Error, Result};
use byteorder::{ByteOrder, NetworkEndian};
use std::fmt::{Display, Formatter};

/// The size of the ICMP echo header.
pub const ICMP_HEADER_SIZE: usize = 8;

/// The minimum size of an IPv4 header.
pub const IPV4_HEADER_SIZE: usize = 20;

/// The largest datagram we expect to receive.
pub const MAX_PACKET_SIZE: usize = 1500;

/// The largest echo payload whose reply still fits in [`MAX_PACKET_SIZE`].
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - IPV4_HEADER_SIZE - ICMP_HEADER_SIZE;

/// The maximum length of a varint encoded 64 bit integer.
pub const MAX_VARINT_LEN: usize = 10;

const IPPROTO_ICMP: u8 = 1;

/// The type of an ICMP message.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IcmpType {
    EchoReply,
    DestinationUnreachable,
    SourceQuench,
    Redirect,
    EchoRequest,
    TimeExceeded,
    ParameterProblem,
    Other(u8),
}

impl IcmpType {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::EchoReply => 0,
            Self::DestinationUnreachable => 3,
            Self::SourceQuench => 4,
            Self::Redirect => 5,
            Self::EchoRequest => 8,
            Self::TimeExceeded => 11,
            Self::ParameterProblem => 12,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IcmpType {
    fn from(id: u8) -> Self {
        match id {
            0 => Self::EchoReply,
            3 => Self::DestinationUnreachable,
            4 => Self::SourceQuench,
            5 => Self::Redirect,
            8 => Self::EchoRequest,
            11 => Self::TimeExceeded,
            12 => Self::ParameterProblem,
            id => Self::Other(id),
        }
    }
}

impl Display for IcmpType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EchoReply => write!(f, "echo reply"),
            Self::DestinationUnreachable => write!(f, "destination unreachable"),
            Self::SourceQuench => write!(f, "source quench"),
            Self::Redirect => write!(f, "redirect"),
            Self::EchoRequest => write!(f, "echo"),
            Self::TimeExceeded => write!(f, "time exceeded"),
            Self::ParameterProblem => write!(f, "parameter problem"),
            Self::Other(id) => write!(f, "{id}"),
        }
    }
}

/// An outgoing ICMP echo message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EchoPacket {
    pub icmp_type: IcmpType,
    pub code: u8,
    pub identifier: u16,
    pub sequence: u16,
    pub data: Vec<u8>,
}

impl EchoPacket {
    /// An `EchoRequest` with code 0.
    #[must_use]
    pub const fn request(identifier: u16, sequence: u16, data: Vec<u8>) -> Self {
        Self {
            icmp_type: IcmpType::EchoRequest,
            code: 0,
            identifier,
            sequence,
            data,
        }
    }

    /// Serialize to wire bytes with the checksum filled in.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.data.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::Marshal(self.data.len()));
        }
        let mut packet = vec![0_u8; ICMP_HEADER_SIZE + self.data.len()];
        packet[0] = self.icmp_type.id();
        packet[1] = self.code;
        NetworkEndian::write_u16(&mut packet[4..6], self.identifier);
        NetworkEndian::write_u16(&mut packet[6..8], self.sequence);
        packet[ICMP_HEADER_SIZE..].copy_from_slice(&self.data);
        let checksum = checksum(&packet);
        NetworkEndian::write_u16(&mut packet[2..4], checksum);
        Ok(packet)
    }
}

/// An incoming ICMP message of any type.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct IcmpMessage<'a> {
    pub icmp_type: IcmpType,
    pub code: u8,
    pub checksum: u16,
    pub body: &'a [u8],
}

impl<'a> IcmpMessage<'a> {
    /// Parse an ICMP message, skipping a leading IPv4 header if present.
    ///
    /// Raw IPv4 sockets deliver the IP header along with the ICMP message on
    /// most platforms. No valid ICMP type has a high nibble of 4, so a first
    /// byte of `0x4_` is taken to be the IPv4 version field.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let icmp = strip_ipv4_header(buf)?;
        if icmp.len() < 4 {
            return Err(Error::Parse(format!(
                "message too short ({} bytes)",
                icmp.len()
            )));
        }
        Ok(Self {
            icmp_type: IcmpType::from(icmp[0]),
            code: icmp[1],
            checksum: NetworkEndian::read_u16(&icmp[2..4]),
            body: &icmp[4..],
        })
    }

    /// Decode the body as an echo structure.
    pub fn echo(&self) -> Result<Echo<'a>> {
        if self.body.len() < 4 {
            return Err(Error::InvalidBody);
        }
        Ok(Echo {
            identifier: NetworkEndian::read_u16(&self.body[0..2]),
            sequence: NetworkEndian::read_u16(&self.body[2..4]),
            data: &self.body[4..],
        })
    }
}

/// The body of an echo request or reply.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Echo<'a> {
    pub identifier: u16,
    pub sequence: u16,
    pub data: &'a [u8],
}

fn strip_ipv4_header(buf: &[u8]) -> Result<&[u8]> {
    match buf.first() {
        Some(first) if first >> 4 == 4 => {
            let ihl = usize::from(first & 0x0f) * 4;
            if ihl < IPV4_HEADER_SIZE || buf.len() < ihl {
                return Err(Error::Parse(format!(
                    "truncated IPv4 header (ihl={ihl}, len={})",
                    buf.len()
                )));
            }
            if buf[9] != IPPROTO_ICMP {
                return Err(Error::Parse(format!(
                    "unexpected IPv4 protocol {}",
                    buf[9]
                )));
            }
            Ok(&buf[ihl..])
        }
        _ => Ok(buf),
    }
}

/// The internet checksum (RFC 1071) of `data`.
#[must_use]
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = 0_u32;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from(NetworkEndian::read_u16(word)));
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*last) << 8);
    }
    // fold the carries back into the low 16 bits
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !sum as u16
}

/// Encode a millisecond timestamp as a zig-zag varint in a buffer of
/// [`MAX_VARINT_LEN`] bytes.
#[must_use]
pub fn encode_timestamp(millis: i64) -> Vec<u8> {
    let mut buf = vec![0_u8; MAX_VARINT_LEN];
    let mut value = ((millis << 1) ^ (millis >> 63)) as u64;
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    buf
}

/// Decode a zig-zag varint millisecond timestamp from the front of `data`.
pub fn decode_timestamp(data: &[u8]) -> Result<i64> {
    let mut value = 0_u64;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate().take(MAX_VARINT_LEN) {
        if byte < 0x80 {
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(Error::InvalidTimestamp);
            }
            value |= u64::from(byte) << shift;
            let millis = (value >> 1) as i64;
            return Ok(if value & 1 == 0 { millis } else { !millis });
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Err(Error::InvalidTimestamp)
}
