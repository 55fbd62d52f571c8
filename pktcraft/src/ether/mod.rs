//! Ethernet II framing.

use core::fmt;
use core::str::FromStr;

use byteorder::{ByteOrder, NetworkEndian};
use tracing::trace;

use crate::pdu::{ParentLayer, Pdu, PduType};
use crate::registry::Registry;
use crate::{Error, Result};

enum_sim! {
    /// An enum-like type for representing Ethertype in Ethernet frame.
    pub struct EtherType (u16) {
        /// Frame payload is Arp protocol.
        ARP =  0x0806,
        /// Frame payload is Ipv4 protocol.
        IPV4 = 0x0800,
        /// Frame payload is Ipv6 protocol.
        IPV6 = 0x86DD,
        /// Frame payload starts with a VLAN tag.
        VLAN = 0x8100,
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EtherType::ARP => write!(f, "ARP"),
            EtherType::IPV4 => write!(f, "IPv4"),
            EtherType::IPV6 => write!(f, "IPv6"),
            EtherType::VLAN => write!(f, "VLAN"),
            _ => write!(f, "0x{:04x}", u16::from(*self)),
        }
    }
}

impl EtherType {
    /// The ethertype identifying a payload of the given PDU type.
    pub fn from_pdu_type(pdu_type: PduType) -> Option<EtherType> {
        match pdu_type {
            PduType::IP => Some(EtherType::IPV4),
            _ => None,
        }
    }
}

/// A six-octet Ethernet II address.
///
/// This is copied from smoltcp and renamed to `EtherAddr`.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct EtherAddr(pub [u8; 6]);

impl EtherAddr {
    /// The broadcast address.
    pub const BROADCAST: EtherAddr = EtherAddr([0xff; 6]);

    /// Construct an Ethernet address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not six octets long.
    pub fn from_bytes(data: &[u8]) -> EtherAddr {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(data);
        EtherAddr(bytes)
    }

    /// Return an Ethernet address as a sequence of octets, in big-endian.
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Query whether the address is an unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_broadcast() || self.is_multicast())
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the 'multicast' bit in the OUI is set.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl FromStr for EtherAddr {
    type Err = Error;

    /// Parse a string with the form `Aa:0b:Cc:11:02:33`.
    fn from_str(s: &str) -> Result<Self> {
        let mut result = [0; 6];
        let mut parts = s.split(':');
        for octet in result.iter_mut() {
            let mut hex = parts.next().ok_or(Error::InvalidAddress)?.chars();
            let mut digit = || {
                hex.next()
                    .and_then(|c| c.to_digit(16))
                    .ok_or(Error::InvalidAddress)
            };
            *octet = ((digit()? << 4) | digit()?) as u8;
            if hex.next().is_some() {
                return Err(Error::InvalidAddress);
            }
        }
        if parts.next().is_some() {
            return Err(Error::InvalidAddress);
        }
        Ok(Self(result))
    }
}

impl fmt::Display for EtherAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
        )
    }
}

header_field_range_accessors! {
    (dst_mac, dst_mac_mut, 0..6),
    (src_mac, src_mac_mut, 6..12),
    (ethertype, ethertype_mut, 12..14),
}

/// Length of the Ethernet II header.
pub const ETHER_HEADER_LEN: usize = 14;

/// An Ethernet II header.
///
/// Frames are not padded to the 60-byte minimum and carry no frame check
/// sequence.
#[derive(Debug, Clone)]
pub struct EthernetII {
    header: [u8; ETHER_HEADER_LEN],
    inner: Option<Box<dyn Pdu>>,
}

impl Default for EthernetII {
    fn default() -> Self {
        Self {
            header: [0; ETHER_HEADER_LEN],
            inner: None,
        }
    }
}

impl EthernetII {
    /// A header with the given addresses.
    pub fn new(dst_addr: EtherAddr, src_addr: EtherAddr) -> Self {
        let mut eth = Self::default();
        eth.set_dst_addr(dst_addr);
        eth.set_src_addr(src_addr);
        eth
    }

    /// Parse a frame, dispatching the payload through the global [`Registry`].
    ///
    /// Trailer bytes the payload does not claim, such as the padding after
    /// an IPv4 packet's total length in a 60-byte minimum frame, are not
    /// kept: serializing the parsed frame yields the unpadded length.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        Self::from_bytes_with(buf, Registry::global())
    }

    /// Parse a frame, dispatching the payload through `registry`.
    pub fn from_bytes_with(buf: &[u8], registry: &Registry) -> Result<Self> {
        if buf.len() < ETHER_HEADER_LEN {
            return Err(Error::Malformed("ethernet header too short"));
        }
        let mut header = [0u8; ETHER_HEADER_LEN];
        header.copy_from_slice(&buf[..ETHER_HEADER_LEN]);
        let mut eth = EthernetII {
            header,
            inner: None,
        };
        if buf.len() > ETHER_HEADER_LEN {
            eth.inner = Some(registry.decode_ether(eth.ethertype(), &buf[ETHER_HEADER_LEN..])?);
        }

        trace!(src = %eth.src_addr(), dst = %eth.dst_addr(), ethertype = %eth.ethertype(), "decoded ethernet");
        Ok(eth)
    }

    /// The destination address.
    #[inline]
    pub fn dst_addr(&self) -> EtherAddr {
        EtherAddr::from_bytes(dst_mac(&self.header[..]))
    }

    /// Set the destination address.
    #[inline]
    pub fn set_dst_addr(&mut self, value: EtherAddr) {
        dst_mac_mut(&mut self.header[..]).copy_from_slice(value.as_bytes());
    }

    /// The source address.
    #[inline]
    pub fn src_addr(&self) -> EtherAddr {
        EtherAddr::from_bytes(src_mac(&self.header[..]))
    }

    /// Set the source address.
    #[inline]
    pub fn set_src_addr(&mut self, value: EtherAddr) {
        src_mac_mut(&mut self.header[..]).copy_from_slice(value.as_bytes());
    }

    /// The ethertype field.
    ///
    /// Serialization overwrites it when the inner PDU has an ethertype.
    #[inline]
    pub fn ethertype(&self) -> EtherType {
        EtherType::from(NetworkEndian::read_u16(ethertype(&self.header[..])))
    }

    /// Set the ethertype field.
    #[inline]
    pub fn set_ethertype(&mut self, value: EtherType) {
        NetworkEndian::write_u16(ethertype_mut(&mut self.header[..]), value.into());
    }
}

impl Pdu for EthernetII {
    pdu_common!();

    fn pdu_type(&self) -> PduType {
        PduType::ETHERNET_II
    }

    fn header_size(&self) -> usize {
        ETHER_HEADER_LEN
    }

    fn write_serialization(&mut self, buf: &mut [u8], _parent: Option<&ParentLayer>) {
        if let Some(ethertype) = self
            .inner
            .as_ref()
            .and_then(|inner| EtherType::from_pdu_type(inner.pdu_type()))
        {
            self.set_ethertype(ethertype);
        }
        buf[..ETHER_HEADER_LEN].copy_from_slice(&self.header[..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipv4::Ipv4;
    use crate::raw::RawPdu;

    #[test]
    fn etheraddr_from_str() {
        assert_eq!(
            "Aa:Bb:Cc:11:22:33".parse::<EtherAddr>(),
            Ok(EtherAddr([0xaa, 0xbb, 0xcc, 0x11, 0x22, 0x33]))
        );
        for s in [
            "Aa:Bb:Cc:11:22",
            "Aaa:Bb:Cc:11:22:33",
            "Za:Bb:Cc:11:22:33",
            "a:Bb:Cc:11:22:33",
            "Aa:Bb:Cc:11:22:33:44",
        ] {
            assert_eq!(s.parse::<EtherAddr>(), Err(Error::InvalidAddress), "{:?}", s);
        }

        let addr = EtherAddr([0x00, 0x0a, 0x5e, 0x53, 0xd8, 0xe5]);
        assert_eq!(addr.to_string(), "00:0a:5e:53:d8:e5");
        assert!(addr.is_unicast());
        assert!(EtherAddr::BROADCAST.is_broadcast());
    }

    #[test]
    fn ethertype_follows_inner_pdu() {
        let mut eth = EthernetII::new(EtherAddr::BROADCAST, EtherAddr([2, 0, 0, 0, 0, 1]));
        eth.set_ethertype(EtherType::ARP);
        let mut frame = eth.clone() / Ipv4::default();
        let bytes = frame.serialize();
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[..6], &[0xff; 6]);
        assert_eq!(&bytes[12..14], &[0x08, 0x00]);

        let mut frame = eth / RawPdu::new(&[0u8; 28][..]);
        assert_eq!(&frame.serialize()[12..14], &[0x08, 0x06]);
    }

    #[test]
    fn minimum_frame_padding_is_dropped() {
        let mut frame = EthernetII::new(EtherAddr::BROADCAST, EtherAddr([2, 0, 0, 0, 0, 1]))
            / Ipv4::default();
        let mut bytes = frame.serialize();
        bytes.resize(60, 0);

        let mut parsed = EthernetII::from_bytes(&bytes[..]).unwrap();
        assert_eq!(parsed.size(), 34);
        assert_eq!(parsed.serialize(), &bytes[..34]);
    }

    #[test]
    fn unknown_ethertype_is_raw() {
        let mut bytes = [0u8; 20];
        bytes[12] = 0x86;
        bytes[13] = 0xdd;
        let eth = EthernetII::from_bytes(&bytes[..]).unwrap();
        assert_eq!(eth.ethertype(), EtherType::IPV6);
        let inner = eth.inner_pdu().unwrap();
        assert_eq!(inner.pdu_type(), PduType::RAW);
        assert_eq!(inner.size(), 6);

        assert_eq!(
            EthernetII::from_bytes(&bytes[..13]).unwrap_err(),
            Error::Malformed("ethernet header too short")
        );
    }
}
