use core::fmt;
use core::str::FromStr;

use crate::{Error, Result};

/// A four-octet IPv4 address.
///
/// The layout follows smoltcp: the octets are stored in network order, so the
/// derived ordering is the numeric ordering of the address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Ipv4Addr(pub [u8; 4]);

impl Ipv4Addr {
    /// The unspecified address `0.0.0.0`.
    pub const UNSPECIFIED: Ipv4Addr = Ipv4Addr([0x00; 4]);

    /// The limited broadcast address `255.255.255.255`.
    pub const BROADCAST: Ipv4Addr = Ipv4Addr([0xff; 4]);

    /// Construct an address from its four octets.
    #[inline]
    pub const fn new(a0: u8, a1: u8, a2: u8, a3: u8) -> Ipv4Addr {
        Ipv4Addr([a0, a1, a2, a3])
    }

    /// Construct an address from the first four bytes of `data`.
    ///
    /// # Panics
    /// The function panics if `data` is shorter than four bytes.
    #[inline]
    pub fn from_bytes(data: &[u8]) -> Ipv4Addr {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&data[..4]);
        Ipv4Addr(bytes)
    }

    /// The address as a sequence of octets, in network order.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The four octets of the address.
    #[inline]
    pub const fn octets(&self) -> [u8; 4] {
        self.0
    }

    /// Query whether the address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.0 == [255; 4]
    }

    /// Query whether the address is a multicast address.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0xf0 == 224
    }

    /// Query whether the address falls into the "unspecified" range.
    pub const fn is_unspecified(&self) -> bool {
        u32::from_be_bytes(self.0) == 0
    }

    /// Query whether the address falls into the "loopback" range.
    pub const fn is_loopback(&self) -> bool {
        self.0[0] == 127
    }
}

impl From<u32> for Ipv4Addr {
    #[inline]
    fn from(value: u32) -> Ipv4Addr {
        Ipv4Addr(value.to_be_bytes())
    }
}

impl From<Ipv4Addr> for u32 {
    #[inline]
    fn from(Ipv4Addr(x): Ipv4Addr) -> u32 {
        u32::from_be_bytes(x)
    }
}

impl From<[u8; 4]> for Ipv4Addr {
    #[inline]
    fn from(octets: [u8; 4]) -> Ipv4Addr {
        Ipv4Addr(octets)
    }
}

impl From<std::net::Ipv4Addr> for Ipv4Addr {
    #[inline]
    fn from(x: std::net::Ipv4Addr) -> Ipv4Addr {
        Ipv4Addr(x.octets())
    }
}

impl From<Ipv4Addr> for std::net::Ipv4Addr {
    #[inline]
    fn from(Ipv4Addr(x): Ipv4Addr) -> std::net::Ipv4Addr {
        x.into()
    }
}

impl FromStr for Ipv4Addr {
    type Err = Error;

    /// Parse the dotted-decimal form, e.g. `192.168.0.1`.
    ///
    /// Exactly four octets are required, each made of one to three decimal
    /// digits with a value no larger than 255.
    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0u8; 4];
        let mut parts = s.split('.');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(Error::InvalidAddress)?;
            if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidAddress);
            }
            *octet = part.parse().map_err(|_| Error::InvalidAddress)?;
        }
        if parts.next().is_some() {
            return Err(Error::InvalidAddress);
        }
        Ok(Ipv4Addr(octets))
    }
}

impl fmt::Display for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let addr: Ipv4Addr = "192.155.32.10".parse().unwrap();
        assert_eq!(addr, Ipv4Addr::new(192, 155, 32, 10));
        assert_eq!(addr.to_string(), "192.155.32.10");

        assert_eq!("0.0.0.0".parse::<Ipv4Addr>(), Ok(Ipv4Addr::UNSPECIFIED));
        assert_eq!("255.255.255.255".parse::<Ipv4Addr>(), Ok(Ipv4Addr::BROADCAST));
    }

    #[test]
    fn parse_rejects_bad_text() {
        for s in [
            "", "1.2.3", "1.2.3.4.5", "256.1.1.1", "1..2.3", "1.2.3.+4", "1.2.3.a", "1.2.3.0004",
            " 1.2.3.4",
        ] {
            assert_eq!(s.parse::<Ipv4Addr>(), Err(Error::InvalidAddress), "{:?}", s);
        }
    }

    #[test]
    fn numeric_order() {
        let low: Ipv4Addr = "9.255.255.255".parse().unwrap();
        let high: Ipv4Addr = "10.0.0.0".parse().unwrap();
        assert!(low < high);
        assert_eq!(u32::from(high), 0x0a00_0000);
        assert_eq!(Ipv4Addr::from(0x0a00_0000u32), high);
    }

    #[test]
    fn std_conversion() {
        let std_addr = std::net::Ipv4Addr::new(127, 0, 0, 1);
        let addr = Ipv4Addr::from(std_addr);
        assert!(addr.is_loopback());
        assert_eq!(std::net::Ipv4Addr::from(addr), std_addr);
    }
}
