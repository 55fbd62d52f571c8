//! Udp protocol.

use byteorder::{ByteOrder, NetworkEndian};
use tracing::trace;

use crate::checksum_utils;
use crate::ipv4::{IpProtocol, Ipv4PseudoHeader};
use crate::pdu::{ParentLayer, Pdu, PduType};
use crate::raw::RawPdu;
use crate::{Error, Result};

header_field_range_accessors! {
    (src_port, src_port_mut, 0..2),
    (dst_port, dst_port_mut, 2..4),
    (length, length_mut, 4..6),
    (checksum, checksum_mut, 6..8),
}

/// Length of the UDP header.
pub const UDP_HEADER_LEN: usize = 8;

/// A UDP header.
#[derive(Debug, Clone)]
pub struct Udp {
    header: [u8; UDP_HEADER_LEN],
    inner: Option<Box<dyn Pdu>>,
}

impl Default for Udp {
    fn default() -> Self {
        Self {
            header: [0, 0, 0, 0, 0, 8, 0, 0],
            inner: None,
        }
    }
}

impl Udp {
    /// A header with the given ports.
    pub fn new(dport: u16, sport: u16) -> Self {
        let mut udp = Self::default();
        udp.set_dport(dport);
        udp.set_sport(sport);
        udp
    }

    /// Parse a datagram.
    ///
    /// The length field bounds the payload when it is consistent with the
    /// buffer; otherwise the whole buffer is used.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < UDP_HEADER_LEN {
            return Err(Error::Malformed("udp header too short"));
        }
        let mut header = [0u8; UDP_HEADER_LEN];
        header.copy_from_slice(&buf[..UDP_HEADER_LEN]);

        let len = usize::from(NetworkEndian::read_u16(length(&header[..])));
        let end = if (UDP_HEADER_LEN..=buf.len()).contains(&len) {
            len
        } else {
            buf.len()
        };

        let mut udp = Udp {
            header,
            inner: None,
        };
        if end > UDP_HEADER_LEN {
            udp.inner = Some(Box::new(RawPdu::new(&buf[UDP_HEADER_LEN..end])));
        }

        trace!(sport = udp.sport(), dport = udp.dport(), "decoded udp");
        Ok(udp)
    }

    /// The source port.
    #[inline]
    pub fn sport(&self) -> u16 {
        NetworkEndian::read_u16(src_port(&self.header[..]))
    }

    /// Set the source port.
    #[inline]
    pub fn set_sport(&mut self, value: u16) {
        NetworkEndian::write_u16(src_port_mut(&mut self.header[..]), value);
    }

    /// The destination port.
    #[inline]
    pub fn dport(&self) -> u16 {
        NetworkEndian::read_u16(dst_port(&self.header[..]))
    }

    /// Set the destination port.
    #[inline]
    pub fn set_dport(&mut self, value: u16) {
        NetworkEndian::write_u16(dst_port_mut(&mut self.header[..]), value);
    }

    /// The length field, as parsed or as written by the last serialization.
    #[inline]
    pub fn length(&self) -> u16 {
        NetworkEndian::read_u16(length(&self.header[..]))
    }

    /// The checksum, as parsed or as computed by the last serialization.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(checksum(&self.header[..]))
    }

    /// Store a checksum. It is written as is when the datagram is serialized
    /// without an enclosing IPv4 header.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(checksum_mut(&mut self.header[..]), value);
    }
}

impl Pdu for Udp {
    pdu_common!();

    fn pdu_type(&self) -> PduType {
        PduType::UDP
    }

    fn header_size(&self) -> usize {
        UDP_HEADER_LEN
    }

    fn write_serialization(&mut self, buf: &mut [u8], parent: Option<&ParentLayer>) {
        let len = u16::try_from(buf.len()).unwrap_or(u16::MAX);
        NetworkEndian::write_u16(length_mut(&mut self.header[..]), len);
        buf[..UDP_HEADER_LEN].copy_from_slice(&self.header[..]);

        if let Some(ParentLayer::Ipv4 { src_addr, dst_addr }) = parent {
            NetworkEndian::write_u16(checksum_mut(buf), 0);
            let phdr = Ipv4PseudoHeader::new(*src_addr, *dst_addr, IpProtocol::UDP, len);
            let cksum = match !checksum_utils::combine(&[
                phdr.calc_checksum(),
                checksum_utils::from_slice(buf),
            ]) {
                // An all-zero checksum means "no checksum" in UDP.
                0 => 0xffff,
                cksum => cksum,
            };
            NetworkEndian::write_u16(checksum_mut(buf), cksum);
            self.set_checksum(cksum);
        }
    }
}
