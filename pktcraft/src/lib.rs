#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! Provide composable protocol data units for crafting and parsing network
//! packets.
//!
//! Every protocol layer implements [`Pdu`] and owns the layer it
//! encapsulates. Layers are stacked with `/`, serialized with
//! [`Pdu::serialize`] and parsed back with `from_bytes`:
//!
//! ```
//! use pktcraft::ipv4::Ipv4;
//! use pktcraft::raw::RawPdu;
//! use pktcraft::tcp::Tcp;
//! use pktcraft::{Pdu, PduExt};
//!
//! let mut pkt = Ipv4::new("8.8.8.8".parse().unwrap(), "192.168.0.2".parse().unwrap())
//!     / Tcp::new(80, 40000)
//!     / RawPdu::new(&b"GET / HTTP/1.0\r\n\r\n"[..]);
//! let bytes = pkt.serialize();
//!
//! let parsed = Ipv4::from_bytes(&bytes[..]).unwrap();
//! assert_eq!(parsed.find_pdu::<Tcp>().unwrap().dport(), 80);
//! assert_eq!(parsed.find_pdu::<RawPdu>().unwrap().payload_size(), 18);
//! ```

#[macro_use]
extern crate quick_error;

#[macro_use]
mod macros;

mod error;
pub use error::{Error, Result};

pub mod checksum_utils;
pub mod pdu;
pub use pdu::{ParentLayer, Pdu, PduExt, PduType};

pub mod registry;
pub use registry::Registry;

pub mod ether;
pub mod icmp;
pub mod ipv4;
pub mod raw;
pub mod tcp;
pub mod udp;

impl_stacking!(
    ether::EthernetII,
    ipv4::Ipv4,
    tcp::Tcp,
    udp::Udp,
    icmp::Icmp,
    raw::RawPdu,
);
