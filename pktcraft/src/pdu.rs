//! The protocol data unit abstraction shared by every layer.
//!
//! A packet is a chain of PDUs: each node exclusively owns at most one inner
//! node, so dropping a node drops everything it encapsulates and cloning a
//! node deep-clones its whole inner chain. Chains are built with the `/`
//! operator (`EthernetII / Ipv4 / Tcp`), serialized with [`Pdu::serialize`]
//! and searched by concrete type with [`PduExt::find_pdu`] and
//! [`PduExt::rfind_pdu`].

use core::any::Any;
use core::fmt;

use crate::ipv4::Ipv4Addr;

enum_sim! {
    /// Tag identifying the protocol implemented by a PDU.
    pub struct PduType (u16) {
        /// Opaque payload bytes.
        RAW = 0,
        /// Ethernet II frame header.
        ETHERNET_II = 1,
        /// IPv4 header.
        IP = 2,
        /// TCP header.
        TCP = 3,
        /// UDP header.
        UDP = 4,
        /// ICMP header.
        ICMP = 5,
    }
}

impl fmt::Display for PduType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PduType::RAW => write!(f, "Raw"),
            PduType::ETHERNET_II => write!(f, "EthernetII"),
            PduType::IP => write!(f, "IP"),
            PduType::TCP => write!(f, "TCP"),
            PduType::UDP => write!(f, "UDP"),
            PduType::ICMP => write!(f, "ICMP"),
            _ => write!(f, "0x{:04x}", self.raw()),
        }
    }
}

/// Context an outer network layer hands to its inner PDU while serializing.
///
/// Transport checksums cover a pseudo-header built from the network-layer
/// addresses, so the inner PDU recomputes its checksum from this value every
/// time the chain is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLayer {
    /// The inner PDU is carried by an IPv4 header with these addresses.
    Ipv4 {
        /// Source address of the enclosing header.
        src_addr: Ipv4Addr,
        /// Destination address of the enclosing header.
        dst_addr: Ipv4Addr,
    },
}

/// One protocol layer of a packet.
///
/// The trait is object safe; chains store their inner layers as
/// `Box<dyn Pdu>`. Generic helpers live in [`PduExt`].
pub trait Pdu: Any + Send + Sync + fmt::Debug {
    /// The protocol tag of this layer.
    fn pdu_type(&self) -> PduType;

    /// Size in bytes of this layer alone, without its inner chain.
    fn header_size(&self) -> usize;

    /// The slot holding the owned inner chain.
    fn inner_slot(&self) -> &Option<Box<dyn Pdu>>;

    /// Mutable access to the slot holding the owned inner chain.
    fn inner_slot_mut(&mut self) -> &mut Option<Box<dyn Pdu>>;

    /// Deep-clone this layer together with its inner chain.
    fn clone_pdu(&self) -> Box<dyn Pdu>;

    /// Upcast used for typed lookups.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast used for typed lookups.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Write this layer into `buf`.
    ///
    /// `buf` spans exactly [`Pdu::size`] bytes; the inner chain has already
    /// been written after the first [`Pdu::header_size`] bytes, so checksums
    /// covering the payload can be computed here. `parent` is the context of
    /// the enclosing layer, if it provides one.
    fn write_serialization(&mut self, buf: &mut [u8], parent: Option<&ParentLayer>);

    /// The context this layer hands to its inner PDU during serialization.
    fn parent_layer(&self) -> Option<ParentLayer> {
        None
    }

    /// Size in bytes of this layer and its whole inner chain.
    fn size(&self) -> usize {
        self.header_size() + self.inner_pdu().map_or(0, |inner| inner.size())
    }

    /// The inner PDU, if any.
    fn inner_pdu(&self) -> Option<&dyn Pdu> {
        self.inner_slot().as_deref()
    }

    /// The inner PDU, if any.
    fn inner_pdu_mut(&mut self) -> Option<&mut dyn Pdu> {
        match self.inner_slot_mut() {
            Some(inner) => Some(&mut **inner),
            None => None,
        }
    }

    /// Replace the inner chain, dropping the previous one.
    fn set_inner_pdu(&mut self, pdu: Option<Box<dyn Pdu>>) {
        *self.inner_slot_mut() = pdu;
    }

    /// Detach the inner chain and hand its ownership to the caller.
    fn release_inner_pdu(&mut self) -> Option<Box<dyn Pdu>> {
        self.inner_slot_mut().take()
    }

    /// Attach `pdu` as the innermost layer of the chain.
    fn append_pdu(&mut self, pdu: Box<dyn Pdu>) {
        match self.inner_slot_mut() {
            Some(inner) => inner.append_pdu(pdu),
            slot => *slot = Some(pdu),
        }
    }

    /// Serialize the chain starting at this layer, outer header first.
    fn serialize(&mut self) -> Vec<u8> {
        let mut buf = vec![0u8; self.size()];
        self.serialize_into(&mut buf, None);
        buf
    }

    /// Serialize the chain into `buf`, which must span [`Pdu::size`] bytes.
    ///
    /// The inner chain is written first so that every layer sees its final
    /// payload when computing its own header.
    fn serialize_into(&mut self, buf: &mut [u8], parent: Option<&ParentLayer>) {
        assert_eq!(buf.len(), self.size());

        let header_size = self.header_size();
        let context = self.parent_layer();
        if let Some(inner) = self.inner_pdu_mut() {
            let inner_size = inner.size();
            inner.serialize_into(
                &mut buf[header_size..header_size + inner_size],
                context.as_ref(),
            );
        }
        self.write_serialization(buf, parent);
    }
}

impl Clone for Box<dyn Pdu> {
    fn clone(&self) -> Self {
        self.clone_pdu()
    }
}

/// Typed helpers available on every [`Pdu`], including `dyn Pdu`.
pub trait PduExt: Pdu {
    /// The first layer of type `P`, searching from this layer inwards.
    fn find_pdu<P: Pdu>(&self) -> Option<&P> {
        if let Some(found) = self.as_any().downcast_ref::<P>() {
            return Some(found);
        }
        let mut current = self.inner_pdu();
        while let Some(pdu) = current {
            if let Some(found) = pdu.as_any().downcast_ref::<P>() {
                return Some(found);
            }
            current = pdu.inner_pdu();
        }
        None
    }

    /// The first layer of type `P`, searching from this layer inwards.
    fn find_pdu_mut<P: Pdu>(&mut self) -> Option<&mut P> {
        if self.as_any().is::<P>() {
            return self.as_any_mut().downcast_mut::<P>();
        }
        self.inner_pdu_mut()?.find_pdu_mut::<P>()
    }

    /// The last (innermost) layer of type `P`, this layer included.
    fn rfind_pdu<P: Pdu>(&self) -> Option<&P> {
        self.inner_pdu()
            .and_then(|inner| inner.rfind_pdu::<P>())
            .or_else(|| self.as_any().downcast_ref::<P>())
    }

    /// Replace the inner chain with `pdu`.
    fn set_inner<P: Pdu>(&mut self, pdu: P) {
        self.set_inner_pdu(Some(Box::new(pdu)));
    }

    /// Attach `pdu` as the innermost layer.
    fn append<P: Pdu>(&mut self, pdu: P) {
        self.append_pdu(Box::new(pdu));
    }
}

impl<T: Pdu + ?Sized> PduExt for T {}
