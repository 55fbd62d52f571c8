use byteorder::{ByteOrder, NetworkEndian};
use tracing::{debug, trace};

use super::options::{self, Ipv4Option, OptionId, RouteOption, Security, StreamId, Timestamp};
use super::{IpProtocol, Ipv4Addr};
use crate::checksum_utils;
use crate::pdu::{ParentLayer, Pdu, PduType};
use crate::raw::RawPdu;
use crate::registry::Registry;
use crate::{Error, Result};

header_field_val_accessors! {
    (ver_ihl, ver_ihl_mut, 0),
    (tos, tos_mut, 1),
    (ttl, ttl_mut, 8),
    (protocol, protocol_mut, 9),
}

header_field_range_accessors! {
    (length, length_mut, 2..4),
    (ident, ident_mut, 4..6),
    (flag_fragoff, flag_fragoff_mut, 6..8),
    (checksum, checksum_mut, 10..12),
    (source_ip, source_ip_mut, 12..16),
    (dest_ip, dest_ip_mut, 16..20),
}

/// Length of the IPv4 header without options.
pub const IPV4_HEADER_LEN: usize = 20;

/// Maximum length of the IPv4 header with options.
pub const IPV4_HEADER_LEN_MAX: usize = 60;

/// Time to live of a newly constructed header.
pub const DEFAULT_TTL: u8 = 128;

/// Identification of a newly constructed header.
pub const DEFAULT_ID: u16 = 1;

const IPV4_HEADER_TEMPLATE: [u8; IPV4_HEADER_LEN] = [
    0x45, 0x00, 0x00, 0x14, 0x00, 0x01, 0x00, 0x00, DEFAULT_TTL, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const FLAG_DONT_FRAG: u16 = 0x4000;
const FLAG_MORE_FRAGS: u16 = 0x2000;
const FRAG_OFFSET_MASK: u16 = 0x1fff;

// The total length field and the number of bytes consumed when parsing.
#[derive(Debug, Clone, Copy)]
struct CapturedLength {
    total_length: u16,
    size: usize,
}

/// An IPv4 header, its options and the PDU it carries.
///
/// The header length, total length, protocol and checksum fields are
/// derived when the packet is serialized:
///
/// ```
/// use pktcraft::ipv4::{Ipv4, Ipv4Addr};
/// use pktcraft::tcp::Tcp;
/// use pktcraft::Pdu;
///
/// let mut pkt = Ipv4::new(Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(1, 2, 3, 4)) / Tcp::new(12, 32);
/// let bytes = pkt.serialize();
/// assert_eq!(bytes.len(), 40);
/// assert_eq!(pkt.checksum(), 0x26ba);
/// ```
#[derive(Debug, Clone)]
pub struct Ipv4 {
    header: [u8; IPV4_HEADER_LEN],
    options: Vec<Ipv4Option>,
    // Option region bytes after the last option, as captured. Cleared when
    // the option list changes.
    padding: Vec<u8>,
    captured: Option<CapturedLength>,
    inner: Option<Box<dyn Pdu>>,
}

impl Default for Ipv4 {
    fn default() -> Self {
        Self {
            header: IPV4_HEADER_TEMPLATE,
            options: Vec::new(),
            padding: Vec::new(),
            captured: None,
            inner: None,
        }
    }
}

impl Ipv4 {
    /// A header with default fields and the given addresses.
    pub fn new(dst_addr: Ipv4Addr, src_addr: Ipv4Addr) -> Self {
        let mut ip = Self::default();
        ip.set_dst_addr(dst_addr);
        ip.set_src_addr(src_addr);
        ip
    }

    /// Parse a packet, dispatching the payload through the global [`Registry`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        Self::from_bytes_with(buf, Registry::global())
    }

    /// Parse a packet, dispatching the payload through `registry`.
    ///
    /// A zero total length is taken to mean that the whole buffer belongs to
    /// the packet. Bytes past a nonzero total length are ignored. Fragments
    /// carry their payload as [`RawPdu`].
    pub fn from_bytes_with(buf: &[u8], registry: &Registry) -> Result<Self> {
        if buf.len() < IPV4_HEADER_LEN {
            return Err(Error::Malformed("ipv4 header too short"));
        }
        let header_len = usize::from(buf[0] & 0x0f) * 4;
        if header_len < IPV4_HEADER_LEN || header_len > buf.len() {
            return Err(Error::Malformed("invalid ipv4 header length"));
        }

        let mut header = [0u8; IPV4_HEADER_LEN];
        header.copy_from_slice(&buf[..IPV4_HEADER_LEN]);
        let options = options::parse_options(&buf[IPV4_HEADER_LEN..header_len])?;
        let padding = buf[IPV4_HEADER_LEN + options::options_size(&options)..header_len].to_vec();

        let total_length = NetworkEndian::read_u16(length(&header[..]));
        let end = if total_length == 0 {
            debug!(len = buf.len(), "ipv4 total length is zero, using the buffer length");
            buf.len()
        } else {
            usize::from(total_length).min(buf.len())
        };
        let payload = if end > header_len {
            &buf[header_len..end]
        } else {
            &[][..]
        };

        let mut ip = Ipv4 {
            header,
            options,
            padding,
            captured: None,
            inner: None,
        };
        if !payload.is_empty() {
            let inner: Box<dyn Pdu> = if ip.is_fragmented() {
                debug!(
                    offset = ip.fragment_offset(),
                    more_frags = ip.more_frags(),
                    "ipv4 fragment, payload kept as raw data"
                );
                Box::new(RawPdu::new(payload))
            } else {
                registry.decode_ip(ip.protocol(), payload)?
            };
            ip.inner = Some(inner);
        }
        ip.captured = Some(CapturedLength {
            total_length,
            size: header_len + payload.len(),
        });

        trace!(src = %ip.src_addr(), dst = %ip.dst_addr(), protocol = %ip.protocol(), "decoded ipv4");
        Ok(ip)
    }

    /// The version field.
    #[inline]
    pub fn version(&self) -> u8 {
        *ver_ihl(&self.header[..]) >> 4
    }

    /// Set the version field, masked to 4 bits.
    #[inline]
    pub fn set_version(&mut self, value: u8) {
        let data = ver_ihl_mut(&mut self.header[..]);
        *data = (*data & 0x0f) | ((value & 0x0f) << 4);
    }

    /// The header length in 32-bit words, options and padding included.
    #[inline]
    pub fn header_len(&self) -> u8 {
        (self.header_size() / 4) as u8
    }

    /// The type of service field.
    #[inline]
    pub fn tos(&self) -> u8 {
        *tos(&self.header[..])
    }

    /// Set the type of service field.
    #[inline]
    pub fn set_tos(&mut self, value: u8) {
        *tos_mut(&mut self.header[..]) = value;
    }

    /// The differentiated services code point, the upper 6 bits of the
    /// type of service field.
    #[inline]
    pub fn dscp(&self) -> u8 {
        self.tos() >> 2
    }

    /// Set the differentiated services code point, masked to 6 bits.
    #[inline]
    pub fn set_dscp(&mut self, value: u8) {
        let data = tos_mut(&mut self.header[..]);
        *data = (*data & 0x03) | ((value & 0x3f) << 2);
    }

    /// The explicit congestion notification bits.
    #[inline]
    pub fn ecn(&self) -> u8 {
        self.tos() & 0x03
    }

    /// Set the explicit congestion notification bits, masked to 2 bits.
    #[inline]
    pub fn set_ecn(&mut self, value: u8) {
        let data = tos_mut(&mut self.header[..]);
        *data = (*data & 0xfc) | (value & 0x03);
    }

    /// The total length field, as parsed or as written by the last
    /// serialization.
    #[inline]
    pub fn total_length(&self) -> u16 {
        NetworkEndian::read_u16(length(&self.header[..]))
    }

    /// The identification field.
    #[inline]
    pub fn ident(&self) -> u16 {
        NetworkEndian::read_u16(ident(&self.header[..]))
    }

    /// Set the identification field.
    #[inline]
    pub fn set_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(ident_mut(&mut self.header[..]), value);
    }

    /// The raw 16-bit flags and fragment offset field.
    #[inline]
    pub fn frag_off(&self) -> u16 {
        NetworkEndian::read_u16(flag_fragoff(&self.header[..]))
    }

    /// Set the raw flags and fragment offset word.
    #[inline]
    pub fn set_frag_off(&mut self, value: u16) {
        NetworkEndian::write_u16(flag_fragoff_mut(&mut self.header[..]), value);
    }

    /// The 3 flag bits: reserved, don't fragment, more fragments.
    #[inline]
    pub fn flags(&self) -> u8 {
        (self.frag_off() >> 13) as u8
    }

    /// Set the 3 flag bits, masked to 3 bits.
    #[inline]
    pub fn set_flags(&mut self, value: u8) {
        let raw = (self.frag_off() & FRAG_OFFSET_MASK) | (u16::from(value & 0x07) << 13);
        self.set_frag_off(raw);
    }

    /// The don't fragment flag.
    #[inline]
    pub fn dont_frag(&self) -> bool {
        self.frag_off() & FLAG_DONT_FRAG != 0
    }

    /// Set the don't fragment flag.
    #[inline]
    pub fn set_dont_frag(&mut self, value: bool) {
        let raw = if value {
            self.frag_off() | FLAG_DONT_FRAG
        } else {
            self.frag_off() & !FLAG_DONT_FRAG
        };
        self.set_frag_off(raw);
    }

    /// The more fragments flag.
    #[inline]
    pub fn more_frags(&self) -> bool {
        self.frag_off() & FLAG_MORE_FRAGS != 0
    }

    /// Set the more fragments flag.
    #[inline]
    pub fn set_more_frags(&mut self, value: bool) {
        let raw = if value {
            self.frag_off() | FLAG_MORE_FRAGS
        } else {
            self.frag_off() & !FLAG_MORE_FRAGS
        };
        self.set_frag_off(raw);
    }

    /// The 13-bit fragment offset, in units of 8 bytes.
    #[inline]
    pub fn fragment_offset(&self) -> u16 {
        self.frag_off() & FRAG_OFFSET_MASK
    }

    /// Set the fragment offset in units of 8 bytes, masked to 13 bits.
    #[inline]
    pub fn set_fragment_offset(&mut self, value: u16) {
        let raw = (self.frag_off() & !FRAG_OFFSET_MASK) | (value & FRAG_OFFSET_MASK);
        self.set_frag_off(raw);
    }

    /// Whether the packet is a fragment: either more fragments follow, or
    /// the offset is nonzero.
    #[inline]
    pub fn is_fragmented(&self) -> bool {
        self.more_frags() || self.fragment_offset() != 0
    }

    /// The time to live field.
    #[inline]
    pub fn ttl(&self) -> u8 {
        *ttl(&self.header[..])
    }

    /// Set the time to live.
    #[inline]
    pub fn set_ttl(&mut self, value: u8) {
        *ttl_mut(&mut self.header[..]) = value;
    }

    /// The protocol field.
    ///
    /// Serialization overwrites it when the inner PDU has a protocol number.
    #[inline]
    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(*protocol(&self.header[..]))
    }

    /// Set the protocol field. Serialization overwrites it when the inner PDU has a protocol number.
    #[inline]
    pub fn set_protocol(&mut self, value: IpProtocol) {
        *protocol_mut(&mut self.header[..]) = value.into();
    }

    /// The header checksum, as parsed or as computed by the last
    /// serialization.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(checksum(&self.header[..]))
    }

    /// The source address.
    #[inline]
    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from_bytes(source_ip(&self.header[..]))
    }

    /// Set the source address.
    #[inline]
    pub fn set_src_addr(&mut self, value: Ipv4Addr) {
        source_ip_mut(&mut self.header[..]).copy_from_slice(value.as_bytes());
    }

    /// The destination address.
    #[inline]
    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from_bytes(dest_ip(&self.header[..]))
    }

    /// Set the destination address.
    #[inline]
    pub fn set_dst_addr(&mut self, value: Ipv4Addr) {
        dest_ip_mut(&mut self.header[..]).copy_from_slice(value.as_bytes());
    }

    /// The options in insertion order, padding excluded.
    #[inline]
    pub fn options(&self) -> &[Ipv4Option] {
        &self.options
    }

    /// Append an option. Options with the same identifier may coexist.
    pub fn add_option(&mut self, opt: Ipv4Option) {
        self.padding.clear();
        self.options.push(opt);
    }

    /// The first option with the identifier `id`.
    pub fn search_option<I: Into<OptionId>>(&self, id: I) -> Option<&Ipv4Option> {
        let id = id.into();
        self.options.iter().find(|opt| opt.id() == id)
    }

    /// Remove the first option with the identifier `id`, returning whether
    /// one was found.
    pub fn remove_option<I: Into<OptionId>>(&mut self, id: I) -> bool {
        let id = id.into();
        match self.options.iter().position(|opt| opt.id() == id) {
            Some(pos) => {
                self.padding.clear();
                self.options.remove(pos);
                true
            }
            None => false,
        }
    }

    // Put `opt` in place of the first option sharing its identifier and drop
    // the other ones, or append it.
    fn replace_option(&mut self, opt: Ipv4Option) {
        self.padding.clear();
        let id = opt.id();
        let mut slot = Some(opt);
        let mut options = Vec::with_capacity(self.options.len() + 1);
        for existing in self.options.drain(..) {
            if existing.id() != id {
                options.push(existing);
            } else if let Some(opt) = slot.take() {
                options.push(opt);
            }
        }
        options.extend(slot);
        self.options = options;
    }

    fn decode_option<T>(&self, id: OptionId, decode: fn(&Ipv4Option) -> Result<T>) -> Result<T> {
        self.search_option(id)
            .ok_or(Error::OptionNotFound)
            .and_then(decode)
    }

    /// The security option.
    pub fn security(&self) -> Result<Security> {
        self.decode_option(OptionId::SECURITY, Security::from_option)
    }

    /// Set the security option, replacing an existing one.
    pub fn set_security(&mut self, value: Security) {
        self.replace_option(value.to_option());
    }

    /// The loose source and record route option.
    pub fn lsrr(&self) -> Result<RouteOption> {
        self.decode_option(OptionId::LSRR, RouteOption::from_option)
    }

    /// Set the loose source and record route option, replacing an existing one.
    pub fn set_lsrr(&mut self, value: &RouteOption) {
        self.replace_option(value.to_option(OptionId::LSRR));
    }

    /// The strict source and record route option.
    pub fn ssrr(&self) -> Result<RouteOption> {
        self.decode_option(OptionId::SSRR, RouteOption::from_option)
    }

    /// Set the strict source and record route option, replacing an existing one.
    pub fn set_ssrr(&mut self, value: &RouteOption) {
        self.replace_option(value.to_option(OptionId::SSRR));
    }

    /// The record route option.
    pub fn record_route(&self) -> Result<RouteOption> {
        self.decode_option(OptionId::RECORD_ROUTE, RouteOption::from_option)
    }

    /// Set the record route option, replacing an existing one.
    pub fn set_record_route(&mut self, value: &RouteOption) {
        self.replace_option(value.to_option(OptionId::RECORD_ROUTE));
    }

    /// The stream identifier option.
    pub fn stream_identifier(&self) -> Result<u16> {
        self.decode_option(OptionId::STREAM_ID, StreamId::from_option)
            .map(|sid| sid.0)
    }

    /// Set the stream identifier option, replacing an existing one.
    pub fn set_stream_identifier(&mut self, value: u16) {
        self.replace_option(StreamId(value).to_option());
    }

    /// The internet timestamp option.
    pub fn timestamp(&self) -> Result<Timestamp> {
        self.decode_option(OptionId::TIMESTAMP, Timestamp::from_option)
    }

    /// Set the internet timestamp option, replacing an existing one.
    pub fn set_timestamp(&mut self, value: &Timestamp) {
        self.replace_option(value.to_option());
    }
}

impl Pdu for Ipv4 {
    pdu_common!();

    fn pdu_type(&self) -> PduType {
        PduType::IP
    }

    fn header_size(&self) -> usize {
        if self.padding.is_empty() {
            IPV4_HEADER_LEN + options::padded_options_size(&self.options)
        } else {
            IPV4_HEADER_LEN + options::options_size(&self.options) + self.padding.len()
        }
    }

    fn parent_layer(&self) -> Option<ParentLayer> {
        Some(ParentLayer::Ipv4 {
            src_addr: self.src_addr(),
            dst_addr: self.dst_addr(),
        })
    }

    fn write_serialization(&mut self, buf: &mut [u8], _parent: Option<&ParentLayer>) {
        let header_size = self.header_size();

        let total_length = match self.captured {
            Some(captured) if captured.size == buf.len() => captured.total_length,
            _ => u16::try_from(buf.len()).unwrap_or(u16::MAX),
        };
        NetworkEndian::write_u16(length_mut(&mut self.header[..]), total_length);

        if let Some(protocol) = self
            .inner
            .as_ref()
            .and_then(|inner| IpProtocol::from_pdu_type(inner.pdu_type()))
        {
            self.set_protocol(protocol);
        }

        let data = ver_ihl_mut(&mut self.header[..]);
        *data = (*data & 0xf0) | (((header_size / 4) as u8) & 0x0f);
        NetworkEndian::write_u16(checksum_mut(&mut self.header[..]), 0);

        buf[..IPV4_HEADER_LEN].copy_from_slice(&self.header[..]);
        options::write_options(&self.options, &mut buf[IPV4_HEADER_LEN..header_size]);
        buf[header_size - self.padding.len()..header_size].copy_from_slice(&self.padding);

        let cksum = checksum_utils::checksum(&buf[..header_size]);
        NetworkEndian::write_u16(checksum_mut(&mut self.header[..]), cksum);
        NetworkEndian::write_u16(checksum_mut(buf), cksum);
    }
}
