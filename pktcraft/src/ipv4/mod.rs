//! IPv4 protocol.

use core::fmt;

use byteorder::{ByteOrder, NetworkEndian};

use crate::pdu::PduType;

mod addr;
pub use addr::Ipv4Addr;

pub mod options;
pub use options::{Ipv4Option, OptionClass, OptionId, OptionNumber};

mod packet;
pub use packet::{Ipv4, DEFAULT_ID, DEFAULT_TTL, IPV4_HEADER_LEN, IPV4_HEADER_LEN_MAX};

enum_sim! {
    /// An enum-like type for representing the protocol carried by an IPv4 header.
    ///
    /// See https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml
    pub struct IpProtocol (u8) {
        /// IP packet payload is ICMP protocol.
        ICMP = 1,

        /// IP packet payload is IGMP protocol.
        IGMP = 2,

        /// IP packet payload is another IPv4 packet.
        IPIP = 4,

        /// IP packet payload is TCP protocol.
        TCP = 6,

        /// IP packet payload is UDP protocol.
        UDP =  17,

        /// IP packet payload is GRE.
        GRE = 47,

        /// IP packet payload is ESP.
        ESP = 50,

        /// IP packet payload is AH.
        AH = 51,
    }
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IpProtocol::ICMP => write!(f, "ICMP"),
            IpProtocol::IPIP => write!(f, "IPIP"),
            IpProtocol::TCP => write!(f, "TCP"),
            IpProtocol::UDP => write!(f, "UDP"),
            _ => write!(f, "0x{:02x}", u8::from(*self)),
        }
    }
}

impl IpProtocol {
    /// The protocol number identifying a payload of the given PDU type.
    pub fn from_pdu_type(pdu_type: PduType) -> Option<IpProtocol> {
        match pdu_type {
            PduType::ICMP => Some(IpProtocol::ICMP),
            PduType::IP => Some(IpProtocol::IPIP),
            PduType::TCP => Some(IpProtocol::TCP),
            PduType::UDP => Some(IpProtocol::UDP),
            _ => None,
        }
    }
}

/// The pseudo-header covered by TCP and UDP checksums.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4PseudoHeader {
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    proto_len: [u8; 4],
}

impl Ipv4PseudoHeader {
    /// Build the pseudo-header for a transport segment of `len` bytes.
    pub fn new(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, protocol: IpProtocol, len: u16) -> Self {
        let mut proto_len = [0u8; 4];
        proto_len[1] = protocol.into();
        NetworkEndian::write_u16(&mut proto_len[2..4], len);

        Self {
            src_ip,
            dst_ip,
            proto_len,
        }
    }

    /// The folded sum of the pseudo-header, ready to be combined with the
    /// sum of the segment.
    pub fn calc_checksum(&self) -> u16 {
        use crate::checksum_utils::{combine, from_slice};

        combine(&[
            from_slice(self.src_ip.as_bytes()),
            from_slice(self.dst_ip.as_bytes()),
            from_slice(&self.proto_len[..]),
        ])
    }
}
