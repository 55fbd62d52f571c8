mod common;
use common::*;

use pktcraft::ether::{EtherAddr, EtherType, EthernetII};
use pktcraft::icmp::{Icmp, IcmpType};
use pktcraft::ipv4::{IpProtocol, Ipv4, Ipv4Addr};
use pktcraft::raw::RawPdu;
use pktcraft::tcp::Tcp;
use pktcraft::udp::Udp;
use pktcraft::{Pdu, PduExt, PduType, Registry, Result};

use pnet::packet::Packet;
use smoltcp::wire;

fn std_addr(addr: Ipv4Addr) -> std::net::Ipv4Addr {
    std::net::Ipv4Addr::from(addr.octets())
}

#[test]
fn ether_ipv4_icmp_frame() {
    let frame = file_to_packet("EtherIpv4Icmp.dat");
    let mut pkt = EthernetII::from_bytes(&frame[..]).unwrap();

    assert_eq!(pkt.dst_addr(), EtherAddr([0x00, 0x19, 0x06, 0xea, 0xb8, 0xc1]));
    assert_eq!(pkt.src_addr(), EtherAddr([0x00, 0x18, 0x73, 0xde, 0x57, 0xc1]));
    assert_eq!(pkt.ethertype(), EtherType::IPV4);

    let ip = pkt.find_pdu::<Ipv4>().unwrap();
    assert_eq!(ip.src_addr(), Ipv4Addr::new(192, 168, 123, 2));
    assert_eq!(ip.dst_addr(), Ipv4Addr::new(192, 168, 123, 1));
    assert_eq!(ip.ttl(), 255);
    assert_eq!(ip.protocol(), IpProtocol::ICMP);
    assert_eq!(ip.total_length(), 100);

    let icmp = pkt.find_pdu::<Icmp>().unwrap();
    assert_eq!(icmp.icmp_type(), IcmpType::ECHO_REQUEST);
    assert_eq!(icmp.code(), 0);
    assert_eq!(icmp.checksum(), 0x949a);
    assert_eq!(icmp.id(), 1);
    assert_eq!(icmp.sequence(), 0);
    assert_eq!(pkt.rfind_pdu::<RawPdu>().unwrap().payload_size(), 72);

    assert_eq!(pkt.size(), frame.len());
    assert_eq!(pkt.serialize(), frame);
}

#[test]
fn ether_ipv4_tcp_frame() {
    let frame = file_to_packet("EtherIpv4Tcp.dat");
    let mut pkt = EthernetII::from_bytes(&frame[..]).unwrap();

    let tcp = pkt.find_pdu::<Tcp>().unwrap();
    assert_eq!(tcp.sport(), 57678);
    assert_eq!(tcp.dport(), 80);
    assert_eq!(tcp.seq(), 0x8e501902);
    assert_eq!(tcp.ack_seq(), 0xc7529d89);
    assert_eq!(tcp.data_offset(), 8);
    assert!(tcp.has_flags(Tcp::ACK | Tcp::PSH));
    assert!(!tcp.has_flags(Tcp::SYN));
    assert_eq!(tcp.window(), 46);
    assert_eq!(tcp.checksum(), 0x4729);
    assert_eq!(tcp.options().len(), 12);
    assert_eq!(tcp.inner_pdu().unwrap().size(), 134);

    // The capture was taken before checksum offload filled in the TCP checksum.
    let bytes = pkt.serialize();
    assert_eq!(bytes.len(), frame.len());
    assert_eq!(&bytes[..50], &frame[..50]);
    assert_eq!(&bytes[52..], &frame[52..]);
    assert_eq!(pkt.find_pdu::<Tcp>().unwrap().checksum(), 0xc0dd);

    let ip = pnet::packet::ipv4::Ipv4Packet::new(&bytes[14..]).unwrap();
    let tcp = pnet::packet::tcp::TcpPacket::new(ip.payload()).unwrap();
    assert_eq!(tcp.get_source(), 57678);
    assert_eq!(
        pnet::packet::tcp::ipv4_checksum(&tcp, &ip.get_source(), &ip.get_destination()),
        tcp.get_checksum()
    );
}

#[test]
fn ether_ipv4_udp_frame() {
    let frame = file_to_packet("EtherIpv4Udp.dat");
    let mut pkt = EthernetII::from_bytes(&frame[..]).unwrap();

    let ip = pkt.find_pdu::<Ipv4>().unwrap();
    assert_eq!(ip.src_addr(), Ipv4Addr::new(192, 168, 29, 58));
    assert_eq!(ip.dst_addr(), Ipv4Addr::new(192, 168, 29, 160));
    assert_eq!(ip.ident(), 0x5c65);
    assert_eq!(ip.total_length(), 94);
    assert_eq!(ip.checksum(), 0);

    let udp = pkt.find_pdu::<Udp>().unwrap();
    assert_eq!(udp.sport(), 60376);
    assert_eq!(udp.dport(), 161);
    assert_eq!(udp.length(), 74);
    assert_eq!(udp.checksum(), 0xbc86);
    assert_eq!(udp.inner_pdu().unwrap().size(), 66);

    // The two bytes past the IPv4 total length are link padding.
    let bytes = pkt.serialize();
    assert_eq!(bytes.len(), frame.len() - 2);
    assert_eq!(pkt.find_pdu::<Ipv4>().unwrap().checksum(), 0x21ff);
    assert_eq!(pkt.find_pdu::<Udp>().unwrap().checksum(), 0x07e9);

    let ip = wire::Ipv4Packet::new_checked(&bytes[14..]).unwrap();
    assert!(ip.verify_checksum());
    assert_eq!(ip.total_len(), 94);

    let ip = pnet::packet::ipv4::Ipv4Packet::new(&bytes[14..]).unwrap();
    let udp = pnet::packet::udp::UdpPacket::new(ip.payload()).unwrap();
    assert_eq!(
        pnet::packet::udp::ipv4_checksum(&udp, &ip.get_source(), &ip.get_destination()),
        0x07e9
    );
}

#[test]
fn crafted_frame_parses_with_smoltcp() {
    let src = Ipv4Addr::new(10, 0, 0, 1);
    let dst = Ipv4Addr::new(10, 0, 0, 2);
    let mut ip = Ipv4::new(dst, src);
    ip.set_ttl(64);
    ip.set_ident(0x1234);

    let mut tcp = Tcp::new(443, 51000);
    tcp.set_seq(1);
    tcp.set_flags(Tcp::SYN);

    let mut frame = EthernetII::new(EtherAddr::BROADCAST, "02:00:00:00:00:01".parse().unwrap())
        / ip
        / tcp
        / RawPdu::new(&b"hello"[..]);
    let bytes = frame.serialize();
    assert_eq!(bytes.len(), 14 + 20 + 20 + 5);

    let eth = wire::EthernetFrame::new_checked(&bytes[..]).unwrap();
    assert_eq!(eth.ethertype(), wire::EthernetProtocol::Ipv4);
    assert_eq!(eth.src_addr(), wire::EthernetAddress([2, 0, 0, 0, 0, 1]));

    let ip = wire::Ipv4Packet::new_checked(eth.payload()).unwrap();
    assert!(ip.verify_checksum());
    assert_eq!(ip.src_addr(), wire::Ipv4Address([10, 0, 0, 1]));
    assert_eq!(ip.dst_addr(), wire::Ipv4Address([10, 0, 0, 2]));
    assert_eq!(ip.protocol(), wire::IpProtocol::Tcp);
    assert_eq!(ip.ident(), 0x1234);
    assert_eq!(ip.hop_limit(), 64);
    assert_eq!(ip.total_len(), 45);

    let tcp = pnet::packet::tcp::TcpPacket::new(&bytes[34..]).unwrap();
    assert_eq!(tcp.get_destination(), 443);
    assert_eq!(tcp.payload(), b"hello");
    assert_eq!(
        pnet::packet::tcp::ipv4_checksum(&tcp, &std_addr(src), &std_addr(dst)),
        tcp.get_checksum()
    );
}

#[test]
fn udp_checksum_matches_pnet() {
    let src = Ipv4Addr::new(192, 168, 1, 7);
    let dst = Ipv4Addr::new(224, 0, 0, 251);
    let mut pkt = Ipv4::new(dst, src) / Udp::new(5353, 5353) / RawPdu::new(vec![0u8; 31]);
    let bytes = pkt.serialize();

    let ip = pnet::packet::ipv4::Ipv4Packet::new(&bytes[..]).unwrap();
    assert_eq!(pnet::packet::ipv4::checksum(&ip), ip.get_checksum());
    let udp = pnet::packet::udp::UdpPacket::new(ip.payload()).unwrap();
    assert_eq!(udp.get_length(), 39);
    assert_eq!(
        pnet::packet::udp::ipv4_checksum(&udp, &std_addr(src), &std_addr(dst)),
        udp.get_checksum()
    );
}

#[test]
fn checksum_follows_the_enclosing_addresses() {
    let mut pkt = Ipv4::new(Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(1, 2, 3, 4)) / Tcp::new(12, 32);
    assert_eq!(pkt.serialize(), IP_TCP_PACKET);

    pkt.set_src_addr(Ipv4Addr::new(1, 2, 3, 5));
    pkt.serialize();
    assert_eq!(pkt.find_pdu::<Tcp>().unwrap().checksum(), 0x1bfc);

    // Detached from its parent, the segment keeps the last computed checksum.
    let mut tcp = pkt.release_inner_pdu().unwrap();
    let bytes = tcp.serialize();
    assert_eq!(&bytes[16..18], &[0x1b, 0xfc]);
}

#[test]
fn nested_copy_is_independent() {
    let frame = file_to_packet("EtherIpv4Tcp.dat");
    let original = EthernetII::from_bytes(&frame[..]).unwrap();
    let mut copy = original.clone();

    copy.find_pdu_mut::<Tcp>().unwrap().set_dport(8080);
    copy.find_pdu_mut::<RawPdu>().unwrap().payload_mut().clear();

    assert_eq!(original.find_pdu::<Tcp>().unwrap().dport(), 80);
    assert_eq!(original.size(), frame.len());
    assert_eq!(copy.size(), frame.len() - 134);
}

fn opaque(buf: &[u8], _registry: &Registry) -> Result<Box<dyn Pdu>> {
    Ok(Box::new(RawPdu::new(buf)))
}

#[test]
fn custom_registry() {
    let frame = file_to_packet("EtherIpv4Tcp.dat");

    let mut registry = Registry::default();
    assert!(registry.register_ip(IpProtocol::TCP, opaque).is_some());
    let pkt = EthernetII::from_bytes_with(&frame[..], &registry).unwrap();
    assert!(pkt.find_pdu::<Tcp>().is_none());
    let ip = pkt.find_pdu::<Ipv4>().unwrap();
    assert_eq!(ip.inner_pdu().unwrap().pdu_type(), PduType::RAW);
    assert_eq!(ip.inner_pdu().unwrap().size(), 32 + 134);

    let empty = Registry::empty();
    let pkt = EthernetII::from_bytes_with(&frame[..], &empty).unwrap();
    assert_eq!(pkt.inner_pdu().unwrap().pdu_type(), PduType::RAW);
    assert_eq!(pkt.size(), frame.len());
}
