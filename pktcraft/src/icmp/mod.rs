//! Icmp protocol.

use byteorder::{ByteOrder, NetworkEndian};
use tracing::trace;

use crate::checksum_utils;
use crate::pdu::{ParentLayer, Pdu, PduType};
use crate::raw::RawPdu;
use crate::{Error, Result};

enum_sim! {
    /// An enum-like type for representing the ICMP message type.
    pub struct IcmpType (u8) {
        /// Echo reply.
        ECHO_REPLY = 0,
        /// Destination unreachable.
        DST_UNREACHABLE = 3,
        /// Redirect.
        REDIRECT_MESSAGE = 5,
        /// Echo request.
        ECHO_REQUEST = 8,
        /// Router advertisement.
        ROUTER_ADVERTISEMENT = 9,
        /// Router solicitation.
        ROUTER_SOLICITATION = 10,
        /// Time exceeded.
        TIME_EXCEEDED = 11,
        /// Parameter problem.
        PARAMETER_PROBLEM = 12,
        /// Timestamp request.
        TIMESTAMP = 13,
        /// Timestamp reply.
        TIMESTAMP_REPLY = 14,
    }
}

header_field_val_accessors! {
    (msg_type, msg_type_mut, 0),
    (msg_code, msg_code_mut, 1),
}

header_field_range_accessors! {
    (checksum, checksum_mut, 2..4),
    (ident, ident_mut, 4..6),
    (seq_num, seq_num_mut, 6..8),
}

/// Length of the ICMP header.
pub const ICMP_HEADER_LEN: usize = 8;

/// An ICMP header. The second word is exposed as the echo identifier and
/// sequence number; other message types reuse it as raw data.
#[derive(Debug, Clone)]
pub struct Icmp {
    header: [u8; ICMP_HEADER_LEN],
    inner: Option<Box<dyn Pdu>>,
}

impl Default for Icmp {
    /// An echo request.
    fn default() -> Self {
        Self::new(IcmpType::ECHO_REQUEST)
    }
}

impl Icmp {
    /// A message of the given type with every other field zeroed.
    pub fn new(icmp_type: IcmpType) -> Self {
        let mut header = [0u8; ICMP_HEADER_LEN];
        header[0] = icmp_type.into();
        Self {
            header,
            inner: None,
        }
    }

    /// Parse a message. The bytes after the header become a [`RawPdu`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < ICMP_HEADER_LEN {
            return Err(Error::Malformed("icmp header too short"));
        }
        let mut header = [0u8; ICMP_HEADER_LEN];
        header.copy_from_slice(&buf[..ICMP_HEADER_LEN]);
        let mut icmp = Icmp {
            header,
            inner: None,
        };
        if buf.len() > ICMP_HEADER_LEN {
            icmp.inner = Some(Box::new(RawPdu::new(&buf[ICMP_HEADER_LEN..])));
        }

        trace!(icmp_type = icmp.icmp_type().raw(), code = icmp.code(), "decoded icmp");
        Ok(icmp)
    }

    /// The message type.
    #[inline]
    pub fn icmp_type(&self) -> IcmpType {
        IcmpType::from(*msg_type(&self.header[..]))
    }

    /// Set the message type.
    #[inline]
    pub fn set_icmp_type(&mut self, value: IcmpType) {
        *msg_type_mut(&mut self.header[..]) = value.into();
    }

    /// The message code.
    #[inline]
    pub fn code(&self) -> u8 {
        *msg_code(&self.header[..])
    }

    /// Set the message code.
    #[inline]
    pub fn set_code(&mut self, value: u8) {
        *msg_code_mut(&mut self.header[..]) = value;
    }

    /// The checksum, as parsed or as computed by the last serialization.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(checksum(&self.header[..]))
    }

    /// The echo identifier.
    #[inline]
    pub fn id(&self) -> u16 {
        NetworkEndian::read_u16(ident(&self.header[..]))
    }

    /// Set the echo identifier.
    #[inline]
    pub fn set_id(&mut self, value: u16) {
        NetworkEndian::write_u16(ident_mut(&mut self.header[..]), value);
    }

    /// The echo sequence number.
    #[inline]
    pub fn sequence(&self) -> u16 {
        NetworkEndian::read_u16(seq_num(&self.header[..]))
    }

    /// Set the echo sequence number.
    #[inline]
    pub fn set_sequence(&mut self, value: u16) {
        NetworkEndian::write_u16(seq_num_mut(&mut self.header[..]), value);
    }
}

impl Pdu for Icmp {
    pdu_common!();

    fn pdu_type(&self) -> PduType {
        PduType::ICMP
    }

    fn header_size(&self) -> usize {
        ICMP_HEADER_LEN
    }

    fn write_serialization(&mut self, buf: &mut [u8], _parent: Option<&ParentLayer>) {
        NetworkEndian::write_u16(checksum_mut(&mut self.header[..]), 0);
        buf[..ICMP_HEADER_LEN].copy_from_slice(&self.header[..]);

        let cksum = checksum_utils::checksum(buf);
        NetworkEndian::write_u16(checksum_mut(buf), cksum);
        NetworkEndian::write_u16(checksum_mut(&mut self.header[..]), cksum);
    }
}
