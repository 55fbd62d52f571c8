//! Tcp protocol.
//!
//! Only the header is modeled: options are kept as raw bytes and the payload
//! is carried by the inner PDU.

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
    (seq_num, seq_num_mut, 4..8),
    (ack_num, ack_num_mut, 8..12),
    (win_size, win_size_mut, 14..16),
    (checksum, checksum_mut, 16..18),
    (urgent, urgent_mut, 18..20),
}

header_field_val_accessors! {
    (data_off, data_off_mut, 12),
    (flag_bits, flag_bits_mut, 13),
}

/// Length of the TCP header without options.
pub const TCP_HEADER_LEN: usize = 20;

/// Maximum length of the TCP header with options.
pub const TCP_HEADER_LEN_MAX: usize = 60;

/// Window size of a newly constructed header.
pub const TCP_DEFAULT_WINDOW: u16 = 32678;

const TCP_HEADER_TEMPLATE: [u8; TCP_HEADER_LEN] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x50, 0x00, 0x7f,
    0xa6, 0x00, 0x00, 0x00, 0x00,
];

/// A TCP header.
#[derive(Debug, Clone)]
pub struct Tcp {
    header: [u8; TCP_HEADER_LEN],
    options: Vec<u8>,
    inner: Option<Box<dyn Pdu>>,
}

impl Default for Tcp {
    fn default() -> Self {
        Self {
            header: TCP_HEADER_TEMPLATE,
            options: Vec::new(),
            inner: None,
        }
    }
}

impl Tcp {
    /// FIN flag.
    pub const FIN: u8 = 0x01;
    /// SYN flag.
    pub const SYN: u8 = 0x01 << 1;
    /// RST flag.
    pub const RST: u8 = 0x01 << 2;
    /// PSH flag.
    pub const PSH: u8 = 0x01 << 3;
    /// ACK flag.
    pub const ACK: u8 = 0x01 << 4;
    /// URG flag.
    pub const URG: u8 = 0x01 << 5;
    /// ECE flag.
    pub const ECE: u8 = 0x01 << 6;
    /// CWR flag.
    pub const CWR: u8 = 0x01 << 7;

    /// A header with the given ports and default fields.
    pub fn new(dport: u16, sport: u16) -> Self {
        let mut tcp = Self::default();
        tcp.set_dport(dport);
        tcp.set_sport(sport);
        tcp
    }

    /// Parse a segment. The bytes after the header become a [`RawPdu`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < TCP_HEADER_LEN {
            return Err(Error::Malformed("tcp header too short"));
        }
        let header_len = usize::from(buf[12] >> 4) * 4;
        if header_len < TCP_HEADER_LEN || header_len > buf.len() {
            return Err(Error::Malformed("invalid tcp data offset"));
        }

        let mut header = [0u8; TCP_HEADER_LEN];
        header.copy_from_slice(&buf[..TCP_HEADER_LEN]);
        let mut tcp = Tcp {
            header,
            options: buf[TCP_HEADER_LEN..header_len].to_vec(),
            inner: None,
        };
        if buf.len() > header_len {
            tcp.inner = Some(Box::new(RawPdu::new(&buf[header_len..])));
        }

        trace!(sport = tcp.sport(), dport = tcp.dport(), "decoded tcp");
        Ok(tcp)
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

    /// The sequence number.
    #[inline]
    pub fn seq(&self) -> u32 {
        NetworkEndian::read_u32(seq_num(&self.header[..]))
    }

    /// Set the sequence number.
    #[inline]
    pub fn set_seq(&mut self, value: u32) {
        NetworkEndian::write_u32(seq_num_mut(&mut self.header[..]), value);
    }

    /// The acknowledgment number.
    #[inline]
    pub fn ack_seq(&self) -> u32 {
        NetworkEndian::read_u32(ack_num(&self.header[..]))
    }

    /// Set the acknowledgment number.
    #[inline]
    pub fn set_ack_seq(&mut self, value: u32) {
        NetworkEndian::write_u32(ack_num_mut(&mut self.header[..]), value);
    }

    /// The header length in 32-bit words, derived from the options.
    #[inline]
    pub fn data_offset(&self) -> u8 {
        (self.header_size() / 4) as u8
    }

    /// The 8 flag bits, CWR to FIN.
    #[inline]
    pub fn flags(&self) -> u8 {
        *flag_bits(&self.header[..])
    }

    /// Overwrite all eight flag bits.
    #[inline]
    pub fn set_flags(&mut self, value: u8) {
        *flag_bits_mut(&mut self.header[..]) = value;
    }

    /// Whether every flag of `mask` is set.
    #[inline]
    pub fn has_flags(&self, mask: u8) -> bool {
        self.flags() & mask == mask
    }

    /// The receive window.
    #[inline]
    pub fn window(&self) -> u16 {
        NetworkEndian::read_u16(win_size(&self.header[..]))
    }

    /// Set the receive window.
    #[inline]
    pub fn set_window(&mut self, value: u16) {
        NetworkEndian::write_u16(win_size_mut(&mut self.header[..]), value);
    }

    /// The checksum, as parsed or as computed by the last serialization.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(checksum(&self.header[..]))
    }

    /// Store a checksum. It is written as is when the segment is serialized
    /// without an enclosing IPv4 header.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(checksum_mut(&mut self.header[..]), value);
    }

    /// The urgent pointer.
    #[inline]
    pub fn urg_ptr(&self) -> u16 {
        NetworkEndian::read_u16(urgent(&self.header[..]))
    }

    /// Set the urgent pointer.
    #[inline]
    pub fn set_urg_ptr(&mut self, value: u16) {
        NetworkEndian::write_u16(urgent_mut(&mut self.header[..]), value);
    }

    /// The raw option bytes, padding included for parsed segments.
    #[inline]
    pub fn options(&self) -> &[u8] {
        &self.options
    }

    /// Set the raw option bytes. They are zero-padded to a 4-byte boundary
    /// when serialized.
    pub fn set_options(&mut self, value: &[u8]) {
        self.options = value.to_vec();
    }
}

impl Pdu for Tcp {
    pdu_common!();

    fn pdu_type(&self) -> PduType {
        PduType::TCP
    }

    fn header_size(&self) -> usize {
        TCP_HEADER_LEN + ((self.options.len() + 3) & !3)
    }

    fn write_serialization(&mut self, buf: &mut [u8], parent: Option<&ParentLayer>) {
        let header_size = self.header_size();
        let data = data_off_mut(&mut self.header[..]);
        *data = (*data & 0x0f) | ((((header_size / 4) as u8) & 0x0f) << 4);

        buf[..TCP_HEADER_LEN].copy_from_slice(&self.header[..]);
        let option_region = &mut buf[TCP_HEADER_LEN..header_size];
        option_region[..self.options.len()].copy_from_slice(&self.options);
        option_region[self.options.len()..].fill(0);

        if let Some(ParentLayer::Ipv4 { src_addr, dst_addr }) = parent {
            NetworkEndian::write_u16(checksum_mut(buf), 0);
            let len = u16::try_from(buf.len()).unwrap_or(u16::MAX);
            let phdr = Ipv4PseudoHeader::new(*src_addr, *dst_addr, IpProtocol::TCP, len);
            let cksum = !checksum_utils::combine(&[
                phdr.calc_checksum(),
                checksum_utils::from_slice(buf),
            ]);
            NetworkEndian::write_u16(checksum_mut(buf), cksum);
            self.set_checksum(cksum);
        }
    }
}
