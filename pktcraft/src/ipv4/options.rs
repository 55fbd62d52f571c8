//! The IPv4 option codec.
//!
//! Options are kept as an ordered list of TLV entries. Each entry carries its
//! one-octet identifier, an opaque payload and an optional explicit length
//! octet; structured views ([`Security`], [`RouteOption`], [`Timestamp`] and
//! [`StreamId`]) convert to and from the opaque form.

use byteorder::{ByteOrder, NetworkEndian};
use bytes::BufMut;

use super::Ipv4Addr;
use crate::{Error, Result};

/// The maximum number of option bytes an IPv4 header can carry.
pub const OPTIONS_LEN_MAX: usize = 40;

enum_sim! {
    /// The 2-bit class of an IPv4 option.
    pub struct OptionClass (u8) {
        /// Datagram or network control.
        CONTROL = 0,
        /// Debugging and measurement.
        MEASUREMENT = 2,
    }
}

enum_sim! {
    /// The 5-bit number of an IPv4 option.
    pub struct OptionNumber (u8) {
        /// End of option list.
        END = 0,
        /// No operation.
        NOOP = 1,
        /// Security.
        SEC = 2,
        /// Loose source and record route.
        LSRR = 3,
        /// Internet timestamp.
        TIMESTAMP = 4,
        /// Extended security.
        EXTSEC = 5,
        /// Record route.
        RR = 7,
        /// Stream identifier.
        SID = 8,
        /// Strict source and record route.
        SSRR = 9,
        /// MTU probe.
        MTUPROBE = 11,
        /// MTU reply.
        MTUREPLY = 12,
        /// Encode.
        EIP = 17,
        /// Traceroute.
        TR = 18,
        /// Address extension.
        ADDEXT = 19,
        /// Router alert.
        RTRALT = 20,
        /// Selective directed broadcast.
        SDB = 21,
        /// Dynamic packet state.
        DPS = 23,
        /// Upstream multicast packet.
        UMP = 24,
        /// Quick-start.
        QS = 25,
    }
}

/// The identifier octet of an IPv4 option.
///
/// ```text
///   0   1   2   3   4   5   6   7
/// +---+-------+-------------------+
/// | C | class |      number       |
/// +---+-------+-------------------+
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct OptionId {
    /// The option number.
    pub number: OptionNumber,
    /// The option class.
    pub class: OptionClass,
    /// Whether the option is copied into every fragment.
    pub copied: bool,
}

impl OptionId {
    /// End of option list.
    pub const END: OptionId = OptionId::new(OptionNumber::END, OptionClass::CONTROL, false);
    /// No operation.
    pub const NOOP: OptionId = OptionId::new(OptionNumber::NOOP, OptionClass::CONTROL, false);
    /// Security, as carried by [`Security`].
    pub const SECURITY: OptionId = OptionId::new(OptionNumber::SEC, OptionClass::CONTROL, true);
    /// Loose source and record route.
    pub const LSRR: OptionId = OptionId::new(OptionNumber::LSRR, OptionClass::CONTROL, true);
    /// Strict source and record route.
    pub const SSRR: OptionId = OptionId::new(OptionNumber::SSRR, OptionClass::CONTROL, true);
    /// Record route.
    pub const RECORD_ROUTE: OptionId = OptionId::new(OptionNumber::RR, OptionClass::CONTROL, false);
    /// Stream identifier.
    pub const STREAM_ID: OptionId = OptionId::new(OptionNumber::SID, OptionClass::CONTROL, true);
    /// Internet timestamp.
    pub const TIMESTAMP: OptionId =
        OptionId::new(OptionNumber::TIMESTAMP, OptionClass::MEASUREMENT, false);

    /// Construct an identifier from its three parts.
    pub const fn new(number: OptionNumber, class: OptionClass, copied: bool) -> Self {
        Self {
            number,
            class,
            copied,
        }
    }

    /// Unpack an identifier octet.
    pub const fn from_byte(value: u8) -> Self {
        Self {
            number: OptionNumber(value & 0x1f),
            class: OptionClass((value >> 5) & 0x03),
            copied: value & 0x80 != 0,
        }
    }

    /// Pack the identifier into one octet.
    pub const fn to_byte(&self) -> u8 {
        ((self.copied as u8) << 7) | ((self.class.raw() & 0x03) << 5) | (self.number.raw() & 0x1f)
    }
}

impl From<u8> for OptionId {
    #[inline]
    fn from(value: u8) -> OptionId {
        OptionId::from_byte(value)
    }
}

impl From<OptionId> for u8 {
    #[inline]
    fn from(value: OptionId) -> u8 {
        value.to_byte()
    }
}

impl From<OptionNumber> for OptionId {
    /// A non-copied control option with the given number.
    #[inline]
    fn from(number: OptionNumber) -> OptionId {
        OptionId::new(number, OptionClass::CONTROL, false)
    }
}

/// One entry of the options list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Option {
    id: OptionId,
    length_field: Option<u8>,
    data: Vec<u8>,
}

impl Ipv4Option {
    /// An option carrying `data`, with a length octet of `data.len() + 2`.
    ///
    /// The length octet cannot describe more than 253 payload bytes. Longer
    /// payloads trip a debug assertion; use [`Ipv4Option::with_length_field`]
    /// to craft such an option on purpose.
    pub fn new<I: Into<OptionId>>(id: I, data: &[u8]) -> Self {
        debug_assert!(
            data.len() <= usize::from(u8::MAX) - 2,
            "ipv4 option payload of {} bytes does not fit the length octet",
            data.len()
        );
        Self {
            id: id.into(),
            length_field: None,
            data: data.to_vec(),
        }
    }

    /// An option whose length octet is `length` regardless of the payload
    /// size, for crafting malformed headers.
    pub fn with_length_field<I: Into<OptionId>>(id: I, length: u8, data: &[u8]) -> Self {
        Self {
            id: id.into(),
            length_field: Some(length),
            data: data.to_vec(),
        }
    }

    /// An option without payload, e.g. a NOOP.
    pub fn single<I: Into<OptionId>>(id: I) -> Self {
        Self::new(id, &[])
    }

    /// The option identifier.
    #[inline]
    pub fn id(&self) -> OptionId {
        self.id
    }

    /// The option payload.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The size of the option payload.
    #[inline]
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// The value of the length octet written on the wire.
    ///
    /// Without an explicit length this is `data_size() + 2`, saturated at 255.
    pub fn length_field(&self) -> u8 {
        self.length_field
            .unwrap_or_else(|| u8::try_from(self.data.len() + 2).unwrap_or(u8::MAX))
    }

    /// END and NOOP without payload occupy a single octet.
    pub fn is_single_octet(&self) -> bool {
        self.id.to_byte() <= 1 && self.data.is_empty() && self.length_field.is_none()
    }

    /// The number of bytes the option occupies on the wire.
    pub fn encoded_size(&self) -> usize {
        if self.is_single_octet() {
            1
        } else {
            2 + self.data.len()
        }
    }

    /// Append the wire form of the option to `buf`.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.id.to_byte());
        if !self.is_single_octet() {
            buf.put_u8(self.length_field());
            buf.put_slice(&self.data);
        }
    }
}

/// Decode an options region.
///
/// END terminates the list; the bytes after it are padding. NOOP octets
/// between options are kept, while NOOP octets at the tail of the list are
/// padding and dropped.
pub fn parse_options(region: &[u8]) -> Result<Vec<Ipv4Option>> {
    let mut options = Vec::new();
    let mut cursor = 0;
    while cursor < region.len() {
        let id = region[cursor];
        if id == OptionId::END.to_byte() {
            break;
        }
        if id == OptionId::NOOP.to_byte() {
            options.push(Ipv4Option::single(OptionId::NOOP));
            cursor += 1;
            continue;
        }

        let length = match region.get(cursor + 1) {
            Some(length) => usize::from(*length),
            None => return Err(Error::Malformed("ipv4 option without length")),
        };
        if length < 2 || cursor + length > region.len() {
            return Err(Error::Malformed("invalid ipv4 option length"));
        }
        options.push(Ipv4Option::new(id, &region[cursor + 2..cursor + length]));
        cursor += length;
    }

    while options
        .last()
        .map_or(false, |opt| opt.id == OptionId::NOOP && opt.is_single_octet())
    {
        options.pop();
    }
    Ok(options)
}

/// The number of bytes `options` occupy before padding.
pub fn options_size(options: &[Ipv4Option]) -> usize {
    options.iter().map(Ipv4Option::encoded_size).sum()
}

/// The number of bytes `options` occupy once padded to a 4-byte boundary.
pub fn padded_options_size(options: &[Ipv4Option]) -> usize {
    (options_size(options) + 3) & !3
}

/// Encode `options` into `buf` and zero the remaining bytes.
///
/// `buf` must hold at least [`options_size`] bytes.
pub fn write_options(options: &[Ipv4Option], buf: &mut [u8]) {
    let mut cursor = buf;
    for opt in options {
        opt.write_to(&mut cursor);
    }
    cursor.fill(0);
}

const SECURITY_DATA_LEN: usize = 9;

/// The payload of the security option (RFC 791).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Security {
    /// Security level.
    pub security: u16,
    /// Compartments.
    pub compartments: u16,
    /// Handling restrictions.
    pub handling_restrictions: u16,
    /// Transmission control code, 24 bits on the wire.
    pub transmission_control: u32,
}

impl Security {
    /// Build a security option, masking the transmission control code to 24 bits.
    pub fn to_option(&self) -> Ipv4Option {
        let mut data = [0u8; SECURITY_DATA_LEN];
        NetworkEndian::write_u16(&mut data[0..2], self.security);
        NetworkEndian::write_u16(&mut data[2..4], self.compartments);
        NetworkEndian::write_u16(&mut data[4..6], self.handling_restrictions);
        NetworkEndian::write_u24(&mut data[6..9], self.transmission_control & 0x00ff_ffff);
        Ipv4Option::new(OptionId::SECURITY, &data[..])
    }

    /// Decode the payload of a security option.
    pub fn from_option(opt: &Ipv4Option) -> Result<Self> {
        let data = opt.data();
        if data.len() != SECURITY_DATA_LEN {
            return Err(Error::MalformedOption);
        }
        Ok(Self {
            security: NetworkEndian::read_u16(&data[0..2]),
            compartments: NetworkEndian::read_u16(&data[2..4]),
            handling_restrictions: NetworkEndian::read_u16(&data[4..6]),
            transmission_control: NetworkEndian::read_u24(&data[6..9]),
        })
    }
}

/// The payload shared by the loose/strict source route and record route
/// options: a pointer octet followed by a list of addresses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteOption {
    /// Offset of the next address slot, counted from the option start.
    pub pointer: u8,
    /// The addresses, in order.
    pub routes: Vec<Ipv4Addr>,
}

impl RouteOption {
    /// Build a route option with the given identifier.
    pub fn to_option(&self, id: OptionId) -> Ipv4Option {
        let mut data = Vec::with_capacity(1 + 4 * self.routes.len());
        data.put_u8(self.pointer);
        for route in &self.routes {
            data.put_slice(route.as_bytes());
        }
        Ipv4Option::new(id, &data)
    }

    /// Decode the payload of a route option.
    pub fn from_option(opt: &Ipv4Option) -> Result<Self> {
        let (pointer, addrs) = opt.data().split_first().ok_or(Error::MalformedOption)?;
        if addrs.len() % 4 != 0 {
            return Err(Error::MalformedOption);
        }
        Ok(Self {
            pointer: *pointer,
            routes: addrs.chunks_exact(4).map(Ipv4Addr::from_bytes).collect(),
        })
    }
}

/// The payload of the internet timestamp option (RFC 791).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Timestamp {
    /// Offset of the next free slot, counted from the option start.
    pub pointer: u8,
    /// Number of hosts that could not record a timestamp, 4 bits.
    pub overflow: u8,
    /// Timestamp format flag, 4 bits.
    pub flag: u8,
    /// The recorded words: timestamps, or address/timestamp pairs.
    pub data: Vec<u32>,
}

impl Timestamp {
    /// Build a timestamp option.
    pub fn to_option(&self) -> Ipv4Option {
        let mut data = Vec::with_capacity(2 + 4 * self.data.len());
        data.put_u8(self.pointer);
        data.put_u8((self.overflow << 4) | (self.flag & 0x0f));
        for word in &self.data {
            data.put_u32(*word);
        }
        Ipv4Option::new(OptionId::TIMESTAMP, &data)
    }

    /// Decode the payload of a timestamp option.
    pub fn from_option(opt: &Ipv4Option) -> Result<Self> {
        let data = opt.data();
        if data.len() < 2 || (data.len() - 2) % 4 != 0 {
            return Err(Error::MalformedOption);
        }
        Ok(Self {
            pointer: data[0],
            overflow: data[1] >> 4,
            flag: data[1] & 0x0f,
            data: data[2..].chunks_exact(4).map(NetworkEndian::read_u32).collect(),
        })
    }
}

/// The payload of the stream identifier option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamId(pub u16);

impl StreamId {
    /// Build a stream identifier option.
    pub fn to_option(&self) -> Ipv4Option {
        Ipv4Option::new(OptionId::STREAM_ID, &self.0.to_be_bytes())
    }

    /// Decode the payload of a stream identifier option.
    pub fn from_option(opt: &Ipv4Option) -> Result<Self> {
        match opt.data() {
            [hi, lo] => Ok(StreamId(u16::from_be_bytes([*hi, *lo]))),
            _ => Err(Error::MalformedOption),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_payload_fits_length_octet() {
        let opt = Ipv4Option::new(OptionId::SECURITY, &[0u8; 253][..]);
        assert_eq!(opt.length_field(), 255);
        assert_eq!(opt.encoded_size(), 255);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "does not fit the length octet")]
    fn oversized_payload_is_rejected() {
        Ipv4Option::new(OptionId::SECURITY, &[0u8; 254][..]);
    }

    #[test]
    fn id_octet_packing() {
        assert_eq!(OptionId::SECURITY.to_byte(), 130);
        assert_eq!(OptionId::LSRR.to_byte(), 131);
        assert_eq!(OptionId::SSRR.to_byte(), 137);
        assert_eq!(OptionId::RECORD_ROUTE.to_byte(), 7);
        assert_eq!(OptionId::STREAM_ID.to_byte(), 136);
        assert_eq!(OptionId::TIMESTAMP.to_byte(), 68);

        let id = OptionId::from_byte(0xe5);
        assert!(id.copied);
        assert_eq!(id.class, OptionClass(3));
        assert_eq!(id.number, OptionNumber::EXTSEC);
        assert_eq!(id.to_byte(), 0xe5);
    }

    #[test]
    fn parse_keeps_inner_noops_and_drops_padding() {
        let region = [1, 7, 7, 4, 10, 0, 0, 1, 1, 1, 0, 0];
        let opts = parse_options(&region[..]).unwrap();
        assert_eq!(opts.len(), 2);
        assert_eq!(opts[0], Ipv4Option::single(OptionId::NOOP));
        assert_eq!(opts[1].id(), OptionId::RECORD_ROUTE);
        assert_eq!(opts[1].data(), &[4, 10, 0, 0, 1]);
    }

    #[test]
    fn parse_stops_at_end() {
        let region = [0, 130, 11, 0];
        assert!(parse_options(&region[..]).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_bad_lengths() {
        assert_eq!(
            parse_options(&[7][..]),
            Err(Error::Malformed("ipv4 option without length"))
        );
        assert_eq!(
            parse_options(&[7, 1, 0, 0][..]),
            Err(Error::Malformed("invalid ipv4 option length"))
        );
        assert_eq!(
            parse_options(&[7, 9, 0, 0][..]),
            Err(Error::Malformed("invalid ipv4 option length"))
        );
    }

    #[test]
    fn padding_and_encoding() {
        let opts = vec![
            Ipv4Option::single(OptionId::NOOP),
            Ipv4Option::new(OptionId::STREAM_ID, &[0x12, 0x34]),
        ];
        assert_eq!(options_size(&opts), 5);
        assert_eq!(padded_options_size(&opts), 8);

        let mut buf = [0xffu8; 8];
        write_options(&opts, &mut buf[..]);
        assert_eq!(buf, [1, 136, 4, 0x12, 0x34, 0, 0, 0]);
    }

    #[test]
    fn spoofed_length_field() {
        let opt = Ipv4Option::with_length_field(OptionId::NOOP, 250, &[1, 2, 3, 4, 5, 6]);
        assert!(!opt.is_single_octet());
        assert_eq!(opt.encoded_size(), 8);

        let mut buf = Vec::new();
        opt.write_to(&mut buf);
        assert_eq!(buf, [1, 250, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn security_payload() {
        let sec = Security {
            security: 0x746a,
            compartments: 26539,
            handling_restrictions: 0x77ab,
            transmission_control: 0x68656c,
        };
        let opt = sec.to_option();
        assert_eq!(opt.id(), OptionId::SECURITY);
        assert_eq!(opt.length_field(), 11);
        assert_eq!(opt.data(), &[0x74, 0x6a, 0x67, 0xab, 0x77, 0xab, 0x68, 0x65, 0x6c]);
        assert_eq!(Security::from_option(&opt), Ok(sec));

        let wide = Security {
            transmission_control: 0x0112_3456,
            ..sec
        };
        assert_eq!(
            Security::from_option(&wide.to_option()).unwrap().transmission_control,
            0x12_3456
        );

        let short = Ipv4Option::new(OptionId::SECURITY, &[0; 8]);
        assert_eq!(Security::from_option(&short), Err(Error::MalformedOption));
    }

    #[test]
    fn route_payload() {
        let route = RouteOption {
            pointer: 0x2d,
            routes: vec![Ipv4Addr::new(192, 168, 2, 3), Ipv4Addr::new(30, 31, 32, 33)],
        };
        let opt = route.to_option(OptionId::LSRR);
        assert_eq!(opt.length_field(), 11);
        assert_eq!(RouteOption::from_option(&opt), Ok(route));

        let empty = RouteOption {
            pointer: 4,
            routes: Vec::new(),
        };
        assert_eq!(empty.to_option(OptionId::RECORD_ROUTE).length_field(), 3);

        let bad = Ipv4Option::new(OptionId::LSRR, &[4, 1, 2]);
        assert_eq!(RouteOption::from_option(&bad), Err(Error::MalformedOption));
        let bad = Ipv4Option::new(OptionId::LSRR, &[]);
        assert_eq!(RouteOption::from_option(&bad), Err(Error::MalformedOption));
    }

    #[test]
    fn timestamp_payload() {
        let ts = Timestamp {
            pointer: 5,
            overflow: 2,
            flag: 1,
            data: vec![0xc0a8_0001, 1000],
        };
        let opt = ts.to_option();
        assert_eq!(opt.id().to_byte(), 68);
        assert_eq!(&opt.data()[..2], &[5, 0x21]);
        assert_eq!(Timestamp::from_option(&opt), Ok(ts));
    }

    #[test]
    fn stream_id_payload() {
        let opt = StreamId(0x91fa).to_option();
        assert_eq!(opt.data(), &[0x91, 0xfa]);
        assert_eq!(StreamId::from_option(&opt), Ok(StreamId(0x91fa)));
        assert_eq!(
            StreamId::from_option(&Ipv4Option::new(OptionId::STREAM_ID, &[1])),
            Err(Error::MalformedOption)
        );
    }
}
