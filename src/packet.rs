use std::fmt;
use std::net::Ipv4Addr;

use crate::ofp_header::{OfpHeader, Xid};
use crate::ofp_message::OfpError;
use crate::openflow0x01::message::decode_packet_in;
use crate::openflow0x01::{Match, MsgCode, PacketIn, PacketInReason, Wildcards, NO_BUFFER};

pub const ETH_HEADER_LENGTH: usize = 14;
pub const VLAN_TAG_LENGTH: usize = 4;
const ARP_PAYLOAD_LENGTH: usize = 28;
const IPV4_MIN_HEADER_LENGTH: usize = 20;

pub const ARP_REQUEST: u8 = 1;
pub const ARP_REPLY: u8 = 2;

/// `dl_vlan` value for frames without an 802.1Q tag.
pub const OFP_VLAN_NONE: u16 = 0xffff;

/// Ethernet types the controller knows by name.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EtherType {
    Ip,
    Arp,
    Vlan,
    Ipv6,
    Rarp,
    /// 0x002c, seen from some switches with no registered protocol behind it.
    Unspecified,
    Other(u16),
}

impl EtherType {
    pub fn of_int(typ: u16) -> EtherType {
        match typ {
            0x0800 => EtherType::Ip,
            0x0806 => EtherType::Arp,
            0x8100 => EtherType::Vlan,
            0x86dd => EtherType::Ipv6,
            0x8035 => EtherType::Rarp,
            0x002c => EtherType::Unspecified,
            t => EtherType::Other(t),
        }
    }

    pub fn to_int(&self) -> u16 {
        match *self {
            EtherType::Ip => 0x0800,
            EtherType::Arp => 0x0806,
            EtherType::Vlan => 0x8100,
            EtherType::Ipv6 => 0x86dd,
            EtherType::Rarp => 0x8035,
            EtherType::Unspecified => 0x002c,
            EtherType::Other(t) => t,
        }
    }
}

/// 802.1Q tag fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Vlan {
    pub id: u16,
    pub pcp: u8,
}

/// Match fields extracted from one packet-in, used for a single forwarding decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub xid: Xid,
    pub buffer_id: u32,
    pub total_len: u16,
    pub in_port: u16,
    pub reason: PacketInReason,
    pub dl_src: [u8; 6],
    pub dl_dst: [u8; 6],
    pub eth_type: u16,
    pub vlan: Option<Vlan>,
    pub nw_tos: u8,
    /// IP protocol, or the ARP opcode for ARP frames.
    pub nw_proto: u8,
    pub nw_src: Ipv4Addr,
    pub nw_dst: Ipv4Addr,
    pub tp_src: u16,
    pub tp_dst: u16,
    pub arp_sha: [u8; 6],
    pub arp_tha: [u8; 6],
    /// Offset of the network header within the frame.
    pub l3_offset: usize,
    pub wildcards: Wildcards,
}

fn be16(buf: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([buf[off], buf[off + 1]])
}

fn ipv4_at(buf: &[u8], off: usize) -> Ipv4Addr {
    Ipv4Addr::new(buf[off], buf[off + 1], buf[off + 2], buf[off + 3])
}

fn mac_at(buf: &[u8], off: usize) -> [u8; 6] {
    let mut mac = [0; 6];
    mac.copy_from_slice(&buf[off..off + 6]);
    mac
}

fn need(what: &'static str, buf: &[u8], len: usize) -> Result<(), OfpError> {
    if buf.len() < len {
        Err(OfpError::truncated(what, len, buf.len()))
    } else {
        Ok(())
    }
}

impl Flow {
    /// A flow carrying nothing but its transaction id.
    pub fn empty(xid: Xid) -> Flow {
        Flow {
            xid,
            buffer_id: NO_BUFFER,
            total_len: 0,
            in_port: 0,
            reason: PacketInReason::NoMatch,
            dl_src: [0; 6],
            dl_dst: [0; 6],
            eth_type: 0,
            vlan: None,
            nw_tos: 0,
            nw_proto: 0,
            nw_src: Ipv4Addr::UNSPECIFIED,
            nw_dst: Ipv4Addr::UNSPECIFIED,
            tp_src: 0,
            tp_dst: 0,
            arp_sha: [0; 6],
            arp_tha: [0; 6],
            l3_offset: 0,
            wildcards: Wildcards::empty(),
        }
    }

    /// Extract a flow from a decoded message. Hello, error and echo-request messages
    /// yield an empty flow.
    pub fn extract(header: &OfpHeader, body: &[u8]) -> Result<Flow, OfpError> {
        match header.type_code()? {
            MsgCode::Hello | MsgCode::Error | MsgCode::EchoReq => Ok(Flow::empty(header.xid())),
            MsgCode::PacketIn => Flow::from_packet_in(header.xid(), &decode_packet_in(body)?),
            code => Err(OfpError::malformed("flow", format!("{} carries no packet", code))),
        }
    }

    /// Walk the Ethernet, 802.1Q, ARP and IPv4 headers of the frame in `pi`.
    ///
    /// Ethertypes other than IPv4, ARP, IPv6, RARP and 0x002c fail with
    /// `UnknownEtherType`.
    pub fn from_packet_in(xid: Xid, pi: &PacketIn) -> Result<Flow, OfpError> {
        let frame = pi.input_payload.data();
        need("ethernet header", frame, ETH_HEADER_LENGTH)?;

        let mut flow = Flow::empty(xid);
        flow.buffer_id = pi.input_payload.buffer_id();
        flow.total_len = pi.total_len;
        flow.in_port = pi.port;
        flow.reason = pi.reason;
        flow.dl_dst = mac_at(frame, 0);
        flow.dl_src = mac_at(frame, 6);

        let outer = be16(frame, 12);
        let l3 = if EtherType::of_int(outer) == EtherType::Vlan {
            need("vlan tag", frame, ETH_HEADER_LENGTH + VLAN_TAG_LENGTH)?;
            let tci = be16(frame, 14);
            flow.vlan = Some(Vlan {
                id: tci & 0x0fff,
                pcp: (tci >> 13) as u8,
            });
            flow.eth_type = be16(frame, 16);
            ETH_HEADER_LENGTH + VLAN_TAG_LENGTH
        } else {
            flow.eth_type = outer;
            ETH_HEADER_LENGTH
        };
        flow.l3_offset = l3;

        match EtherType::of_int(flow.eth_type) {
            EtherType::Arp => flow.parse_arp(frame)?,
            EtherType::Ip => flow.parse_ipv4(frame)?,
            EtherType::Ipv6 | EtherType::Rarp | EtherType::Unspecified => {}
            EtherType::Vlan | EtherType::Other(_) => {
                return Err(OfpError::UnknownEtherType { eth_type: flow.eth_type })
            }
        }
        Ok(flow)
    }

    fn parse_arp(&mut self, frame: &[u8]) -> Result<(), OfpError> {
        let l3 = self.l3_offset;
        need("arp payload", frame, l3 + ARP_PAYLOAD_LENGTH)?;
        let hw_type = be16(frame, l3);
        let proto_type = be16(frame, l3 + 2);
        let hw_len = frame[l3 + 4];
        let proto_len = frame[l3 + 5];
        let opcode = be16(frame, l3 + 6);
        if hw_type != 1 || proto_type != EtherType::Ip.to_int() || hw_len != 6 ||
           proto_len != 4 || opcode > 0xff {
            return Ok(());
        }
        self.nw_proto = opcode as u8;
        self.arp_sha = mac_at(frame, l3 + 8);
        self.nw_src = ipv4_at(frame, l3 + 14);
        self.arp_tha = mac_at(frame, l3 + 18);
        self.nw_dst = ipv4_at(frame, l3 + 24);
        self.wildcards = Wildcards::TP_SRC | Wildcards::TP_DST | Wildcards::DL_VLAN |
                         Wildcards::DL_VLAN_PCP;
        Ok(())
    }

    fn parse_ipv4(&mut self, frame: &[u8]) -> Result<(), OfpError> {
        let l3 = self.l3_offset;
        need("ipv4 header", frame, l3 + IPV4_MIN_HEADER_LENGTH)?;
        let ihl = frame[l3] & 0x0f;
        self.nw_tos = frame[l3 + 1] >> 2;
        self.nw_proto = frame[l3 + 9];
        self.nw_src = ipv4_at(frame, l3 + 12);
        self.nw_dst = ipv4_at(frame, l3 + 16);
        let l4 = l3 + if ihl > 5 { 24 } else { 20 };
        self.wildcards = Wildcards::DL_VLAN | Wildcards::DL_VLAN_PCP;
        if frame.len() >= l4 + 4 {
            self.tp_src = be16(frame, l4);
            self.tp_dst = be16(frame, l4 + 2);
        } else {
            self.wildcards |= Wildcards::TP_SRC | Wildcards::TP_DST;
        }
        Ok(())
    }

    pub fn ether_type(&self) -> EtherType {
        EtherType::of_int(self.eth_type)
    }

    /// IPv6 multicast frames are addressed to 33:33:xx:xx:xx:xx.
    pub fn is_ipv6_multicast(&self) -> bool {
        self.dl_dst[0] == 0x33 && self.dl_dst[1] == 0x33
    }

    /// The match a flow-mod installs for this flow.
    pub fn pattern(&self) -> Match {
        Match {
            wildcards: self.wildcards,
            in_port: self.in_port,
            dl_src: self.dl_src,
            dl_dst: self.dl_dst,
            dl_vlan: self.vlan.map_or(OFP_VLAN_NONE, |v| v.id),
            dl_vlan_pcp: self.vlan.map_or(0, |v| v.pcp),
            dl_type: self.eth_type,
            nw_tos: self.nw_tos,
            nw_proto: self.nw_proto,
            nw_src: self.nw_src,
            nw_dst: self.nw_dst,
            tp_src: self.tp_src,
            tp_dst: self.tp_dst,
        }
    }
}

/// Colon-separated hex form of a MAC address.
pub struct MacAddr<'a>(pub &'a [u8]);

impl<'a> fmt::Display for MacAddr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "xid {} port {} {} -> {} type 0x{:04x}",
               self.xid,
               self.in_port,
               MacAddr(&self.dl_src),
               MacAddr(&self.dl_dst),
               self.eth_type)?;
        if let Some(v) = self.vlan {
            write!(f, " vlan {} pcp {}", v.id, v.pcp)?;
        }
        match self.ether_type() {
            EtherType::Ip => {
                write!(f,
                       " {}:{} -> {}:{} proto {}",
                       self.nw_src,
                       self.tp_src,
                       self.nw_dst,
                       self.tp_dst,
                       self.nw_proto)
            }
            EtherType::Arp => {
                write!(f, " arp op {} {} -> {}", self.nw_proto, self.nw_src, self.nw_dst)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x01::Payload;

    const TEST_XID: u32 = 0x0a0b0c0d;

    const MAC_1: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01];
    const MAC_2: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x02];

    fn eth(dst: [u8; 6], src: [u8; 6], vlan: Option<u16>, typ: u16) -> Vec<u8> {
        let mut frame = dst.to_vec();
        frame.extend_from_slice(&src);
        if let Some(tci) = vlan {
            frame.extend_from_slice(&[0x81, 0x00]);
            frame.extend_from_slice(&tci.to_be_bytes());
        }
        frame.extend_from_slice(&typ.to_be_bytes());
        frame
    }

    fn ipv4_tcp(ihl: u8) -> Vec<u8> {
        let mut ip = vec![0x40 | ihl, 0x28, 0x00, 0x28, 0, 0, 0, 0, 64, 6, 0, 0];
        ip.extend_from_slice(&[10, 0, 0, 2]);
        ip.extend_from_slice(&[10, 0, 0, 1]);
        if ihl > 5 {
            ip.extend_from_slice(&[1, 1, 1, 1]);
        }
        ip.extend_from_slice(&40000u16.to_be_bytes());
        ip.extend_from_slice(&80u16.to_be_bytes());
        ip.resize(ip.len() + 16, 0);
        ip
    }

    fn arp(opcode: u16) -> Vec<u8> {
        let mut a = vec![0, 1, 0x08, 0x00, 6, 4];
        a.extend_from_slice(&opcode.to_be_bytes());
        a.extend_from_slice(&MAC_2);
        a.extend_from_slice(&[10, 0, 0, 2]);
        a.extend_from_slice(&[0; 6]);
        a.extend_from_slice(&[10, 0, 0, 1]);
        a
    }

    fn packet_in(frame: Vec<u8>) -> PacketIn {
        PacketIn {
            total_len: frame.len() as u16,
            input_payload: Payload::Buffered(0x200, frame),
            port: 1,
            reason: PacketInReason::NoMatch,
        }
    }

    #[test]
    fn test_parse_ipv4_flow() {
        let mut frame = eth(MAC_1, MAC_2, None, 0x0800);
        frame.extend(ipv4_tcp(5));
        let flow = Flow::from_packet_in(TEST_XID, &packet_in(frame)).unwrap();
        assert_eq!(flow.xid, TEST_XID);
        assert_eq!(flow.buffer_id, 0x200);
        assert_eq!(flow.in_port, 1);
        assert_eq!(flow.dl_src, MAC_2);
        assert_eq!(flow.dl_dst, MAC_1);
        assert_eq!(flow.ether_type(), EtherType::Ip);
        assert_eq!(flow.nw_tos, 0x28 >> 2);
        assert_eq!(flow.nw_proto, 6);
        assert_eq!(flow.nw_src, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(flow.nw_dst, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(flow.tp_src, 40000);
        assert_eq!(flow.tp_dst, 80);
        assert_eq!(flow.wildcards, Wildcards::DL_VLAN | Wildcards::DL_VLAN_PCP);
    }

    #[test]
    fn test_parse_ipv4_with_options() {
        let mut frame = eth(MAC_1, MAC_2, None, 0x0800);
        frame.extend(ipv4_tcp(6));
        let flow = Flow::from_packet_in(TEST_XID, &packet_in(frame)).unwrap();
        assert_eq!(flow.tp_src, 40000);
        assert_eq!(flow.tp_dst, 80);
    }

    #[test]
    fn test_parse_ipv4_without_ports() {
        let mut frame = eth(MAC_1, MAC_2, None, 0x0800);
        frame.extend_from_slice(&ipv4_tcp(5)[..20]);
        let flow = Flow::from_packet_in(TEST_XID, &packet_in(frame)).unwrap();
        assert_eq!(flow.nw_src, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!((flow.tp_src, flow.tp_dst), (0, 0));
        assert_eq!(flow.wildcards,
                   Wildcards::TP_SRC | Wildcards::TP_DST | Wildcards::DL_VLAN |
                   Wildcards::DL_VLAN_PCP);
    }

    #[test]
    fn test_parse_vlan_offset() {
        let mut plain = eth(MAC_1, MAC_2, None, 0x0800);
        plain.extend(ipv4_tcp(5));
        let mut tagged = eth(MAC_1, MAC_2, Some((5 << 13) | 42), 0x0800);
        tagged.extend(ipv4_tcp(5));

        let plain = Flow::from_packet_in(TEST_XID, &packet_in(plain)).unwrap();
        let tagged = Flow::from_packet_in(TEST_XID, &packet_in(tagged)).unwrap();
        assert_eq!(tagged.l3_offset - plain.l3_offset, 4);
        assert_eq!(plain.eth_type, 0x0800);
        assert_eq!(tagged.eth_type, 0x0800);
        assert_eq!(plain.vlan, None);
        assert_eq!(tagged.vlan, Some(Vlan { id: 42, pcp: 5 }));
        assert_eq!(tagged.nw_dst, plain.nw_dst);
        assert_eq!(tagged.tp_dst, plain.tp_dst);
        assert_eq!(tagged.pattern().dl_vlan, 42);
        assert_eq!(plain.pattern().dl_vlan, OFP_VLAN_NONE);
    }

    #[test]
    fn test_parse_arp_request() {
        let mut frame = eth([0xff; 6], MAC_2, None, 0x0806);
        frame.extend(arp(1));
        let flow = Flow::from_packet_in(TEST_XID, &packet_in(frame)).unwrap();
        assert_eq!(flow.ether_type(), EtherType::Arp);
        assert_eq!(flow.nw_proto, ARP_REQUEST);
        assert_eq!(flow.arp_sha, MAC_2);
        assert_eq!(flow.arp_tha, [0; 6]);
        assert_eq!(flow.nw_src, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(flow.nw_dst, Ipv4Addr::new(10, 0, 0, 1));
        assert!(flow.wildcards.contains(Wildcards::TP_SRC | Wildcards::TP_DST));
        assert!(flow.wildcards.contains(Wildcards::DL_VLAN | Wildcards::DL_VLAN_PCP));
    }

    #[test]
    fn test_parse_arp_not_ethernet_ipv4() {
        let mut payload = arp(2);
        payload[1] = 6;
        let mut frame = eth(MAC_1, MAC_2, None, 0x0806);
        frame.extend(payload);
        let flow = Flow::from_packet_in(TEST_XID, &packet_in(frame)).unwrap();
        assert_eq!(flow.nw_proto, 0);
        assert_eq!(flow.wildcards, Wildcards::empty());
    }

    #[test]
    fn test_parse_recognized_shallow_types() {
        for &typ in &[0x86dd, 0x8035, 0x002c] {
            let mut frame = eth(MAC_1, MAC_2, None, typ);
            frame.resize(60, 0);
            let flow = Flow::from_packet_in(TEST_XID, &packet_in(frame)).unwrap();
            assert_eq!(flow.eth_type, typ);
            assert_eq!(flow.wildcards, Wildcards::empty());
        }
    }

    #[test]
    fn test_parse_unknown_ether_type() {
        let mut frame = eth(MAC_1, MAC_2, None, 0x88cc);
        frame.resize(60, 0);
        match Flow::from_packet_in(TEST_XID, &packet_in(frame)) {
            Err(OfpError::UnknownEtherType { eth_type }) => assert_eq!(eth_type, 0x88cc),
            other => panic!("expected an unknown ethertype, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_truncated_frames() {
        assert!(Flow::from_packet_in(TEST_XID, &packet_in(vec![0; 13])).is_err());
        let mut frame = eth(MAC_1, MAC_2, None, 0x0806);
        frame.extend_from_slice(&arp(1)[..20]);
        match Flow::from_packet_in(TEST_XID, &packet_in(frame)) {
            Err(OfpError::Truncated { .. }) => {}
            other => panic!("expected a truncated frame, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_short_circuits() {
        for &code in &[MsgCode::Hello, MsgCode::Error, MsgCode::EchoReq] {
            let header = OfpHeader::new(1, code as u8, 8, TEST_XID);
            assert_eq!(Flow::extract(&header, &[]).unwrap(), Flow::empty(TEST_XID));
        }
        let header = OfpHeader::new(1, MsgCode::FeaturesResp as u8, 8, TEST_XID);
        assert!(Flow::extract(&header, &[]).is_err());
    }

    #[test]
    fn test_extract_packet_in_body() {
        let mut body = vec![0xff, 0xff, 0xff, 0xff, 0x00, 0x3c, 0x00, 0x04, 0x00, 0x00];
        let mut frame = eth(MAC_1, MAC_2, None, 0x0800);
        frame.extend(ipv4_tcp(5));
        body.extend(frame);
        let header = OfpHeader::new(1, MsgCode::PacketIn as u8, (8 + body.len()) as u16, 3);
        let flow = Flow::extract(&header, &body).unwrap();
        assert_eq!(flow.buffer_id, NO_BUFFER);
        assert_eq!(flow.in_port, 4);
        assert_eq!(flow.l3_offset, 14);
    }

    #[test]
    fn test_mac_display() {
        assert_eq!(MacAddr(&MAC_1).to_string(), "aa:bb:cc:dd:ee:01");
    }
}
