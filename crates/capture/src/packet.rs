//! Frame decoding down to the TCP payload
//!
//! Header fields are read through `pnet_packet` views; lengths are
//! re-checked against the captured bytes since a snapshot may be cut short.

use pnet_packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::tcp::TcpPacket;
use std::net::{IpAddr, SocketAddr};

const ETHERNET_HEADER: usize = 14;
const VLAN_TAG: usize = 4;
const LINUX_SLL_HEADER: usize = 16;
const NULL_HEADER: usize = 4;
const IPV6_HEADER: usize = 40;
const MIN_TCP_HEADER: usize = 20;

/// Link-layer framing of captured packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    Ethernet,
    LinuxSll,
    RawIp,
    Null,
}

impl LinkLayer {
    /// Map a libpcap DLT value.
    #[must_use]
    pub const fn from_dlt(dlt: i32) -> Option<Self> {
        match dlt {
            1 => Some(LinkLayer::Ethernet),
            113 => Some(LinkLayer::LinuxSll),
            12 | 14 | 101 | 228 | 229 => Some(LinkLayer::RawIp),
            0 | 108 => Some(LinkLayer::Null),
            _ => None,
        }
    }
}

/// A payload-bearing TCP segment and the peer that sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub source: SocketAddr,
    pub payload: &'a [u8],
}

/// Decode a captured frame to its TCP payload.
///
/// Returns `None` for anything that is not TCP over IPv4/IPv6, is cut
/// short, or carries no payload.
pub fn extract_segment(link: LinkLayer, frame: &[u8]) -> Option<Segment<'_>> {
    let ip = network_layer(link, frame)?;
    match ip.first()? >> 4 {
        4 => ipv4_segment(ip),
        6 => ipv6_segment(ip),
        _ => None,
    }
}

fn network_layer(link: LinkLayer, frame: &[u8]) -> Option<&[u8]> {
    match link {
        LinkLayer::Ethernet => {
            let ethernet = EthernetPacket::new(frame)?;
            match ethernet.get_ethertype() {
                EtherTypes::Ipv4 | EtherTypes::Ipv6 => frame.get(ETHERNET_HEADER..),
                EtherTypes::Vlan => {
                    let inner = frame.get(ETHERNET_HEADER + 2..ETHERNET_HEADER + VLAN_TAG)?;
                    match EtherType(u16::from_be_bytes([inner[0], inner[1]])) {
                        EtherTypes::Ipv4 | EtherTypes::Ipv6 => {
                            frame.get(ETHERNET_HEADER + VLAN_TAG..)
                        }
                        _ => None,
                    }
                }
                _ => None,
            }
        }
        LinkLayer::LinuxSll => frame.get(LINUX_SLL_HEADER..),
        LinkLayer::RawIp => Some(frame),
        LinkLayer::Null => frame.get(NULL_HEADER..),
    }
}

fn ipv4_segment(ip: &[u8]) -> Option<Segment<'_>> {
    let packet = Ipv4Packet::new(ip)?;
    if packet.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }
    let header = usize::from(packet.get_header_length()) * 4;
    // offloaded captures may report a zero total length
    let total = match usize::from(packet.get_total_length()) {
        0 => ip.len(),
        n => n.min(ip.len()),
    };
    if header < 20 || total < header {
        return None;
    }
    tcp_segment(IpAddr::V4(packet.get_source()), &ip[header..total])
}

fn ipv6_segment(ip: &[u8]) -> Option<Segment<'_>> {
    let packet = Ipv6Packet::new(ip)?;
    if packet.get_next_header() != IpNextHeaderProtocols::Tcp {
        return None;
    }
    let end = match usize::from(packet.get_payload_length()) {
        0 => ip.len(),
        n => (IPV6_HEADER + n).min(ip.len()),
    };
    tcp_segment(IpAddr::V6(packet.get_source()), ip.get(IPV6_HEADER..end)?)
}

fn tcp_segment(source_ip: IpAddr, bytes: &[u8]) -> Option<Segment<'_>> {
    let tcp = TcpPacket::new(bytes)?;
    let offset = usize::from(tcp.get_data_offset()) * 4;
    if offset < MIN_TCP_HEADER || offset >= bytes.len() {
        return None;
    }
    Some(Segment {
        source: SocketAddr::new(source_ip.to_canonical(), tcp.get_source()),
        payload: &bytes[offset..],
    })
}
