//! Decoders for the payload of network and link layer headers.
//!
//! Parsing an [`Ipv4`] or [`crate::ether::EthernetII`] header hands the remaining bytes to
//! the decoder registered for the protocol number or ethertype. Payloads of
//! unregistered protocols are kept as [`RawPdu`].

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use tracing::{debug, trace};

use crate::ether::EtherType;
use crate::icmp::Icmp;
use crate::ipv4::{IpProtocol, Ipv4};
use crate::pdu::Pdu;
use crate::raw::RawPdu;
use crate::tcp::Tcp;
use crate::udp::Udp;
use crate::Result;

/// Parse a payload into a PDU chain. The registry is passed along so that
/// encapsulating protocols can dispatch their own payload.
pub type Decoder = fn(&[u8], &Registry) -> Result<Box<dyn Pdu>>;

/// Maps protocol numbers and ethertypes to decoders.
#[derive(Clone)]
pub struct Registry {
    ip: BTreeMap<IpProtocol, Decoder>,
    ether: BTreeMap<EtherType, Decoder>,
}

impl Registry {
    /// A registry without any decoder: every payload is kept as raw data.
    pub fn empty() -> Self {
        Self {
            ip: BTreeMap::new(),
            ether: BTreeMap::new(),
        }
    }

    /// The process-wide default registry.
    pub fn global() -> &'static Registry {
        static GLOBAL: Lazy<Registry> = Lazy::new(Registry::default);
        &GLOBAL
    }

    /// Register `decoder` for an IP protocol number, returning the decoder
    /// it replaces.
    pub fn register_ip(&mut self, protocol: IpProtocol, decoder: Decoder) -> Option<Decoder> {
        self.ip.insert(protocol, decoder)
    }

    /// Register `decoder` for an ethertype, returning the decoder it replaces.
    pub fn register_ether(&mut self, ethertype: EtherType, decoder: Decoder) -> Option<Decoder> {
        self.ether.insert(ethertype, decoder)
    }

    /// Decode the payload of an IP header.
    pub fn decode_ip(&self, protocol: IpProtocol, buf: &[u8]) -> Result<Box<dyn Pdu>> {
        match self.ip.get(&protocol) {
            Some(decoder) => {
                trace!(%protocol, len = buf.len(), "decoding ip payload");
                decoder(buf, self)
            }
            None => {
                debug!(%protocol, len = buf.len(), "unknown ip protocol, payload kept as raw data");
                Ok(Box::new(RawPdu::new(buf)))
            }
        }
    }

    /// Decode the payload of an ethernet frame.
    pub fn decode_ether(&self, ethertype: EtherType, buf: &[u8]) -> Result<Box<dyn Pdu>> {
        match self.ether.get(&ethertype) {
            Some(decoder) => {
                trace!(%ethertype, len = buf.len(), "decoding ethernet payload");
                decoder(buf, self)
            }
            None => {
                debug!(%ethertype, len = buf.len(), "unknown ethertype, payload kept as raw data");
                Ok(Box::new(RawPdu::new(buf)))
            }
        }
    }
}

impl Default for Registry {
    /// ICMP, IPv4-in-IPv4, TCP and UDP over IP, and IPv4 over ethernet.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_ip(IpProtocol::ICMP, decode_icmp);
        registry.register_ip(IpProtocol::IPIP, decode_ipv4);
        registry.register_ip(IpProtocol::TCP, decode_tcp);
        registry.register_ip(IpProtocol::UDP, decode_udp);
        registry.register_ether(EtherType::IPV4, decode_ipv4);
        registry
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("ip", &self.ip.keys().collect::<Vec<_>>())
            .field("ether", &self.ether.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn decode_ipv4(buf: &[u8], registry: &Registry) -> Result<Box<dyn Pdu>> {
    Ok(Box::new(Ipv4::from_bytes_with(buf, registry)?))
}

fn decode_tcp(buf: &[u8], _registry: &Registry) -> Result<Box<dyn Pdu>> {
    Ok(Box::new(Tcp::from_bytes(buf)?))
}

fn decode_udp(buf: &[u8], _registry: &Registry) -> Result<Box<dyn Pdu>> {
    Ok(Box::new(Udp::from_bytes(buf)?))
}

fn decode_icmp(buf: &[u8], _registry: &Registry) -> Result<Box<dyn Pdu>> {
    Ok(Box::new(Icmp::from_bytes(buf)?))
}
