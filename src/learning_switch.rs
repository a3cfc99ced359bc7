use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::ofp_controller::SessionVariant;
use crate::ofp_message::OfpError;
use crate::openflow0x01::{Action, FlowMod, FlowModCmd, FlowModFlags, PacketIn, PacketOut,
                          PseudoPort, Timeout, NO_BUFFER};
use crate::packet::{EtherType, Flow, MacAddr, ARP_REPLY, ARP_REQUEST};

pub const FLOW_COOKIE: u64 = 9;
pub const FLOW_PRIORITY: u16 = 9;
pub const FLOW_IDLE_TIMEOUT: u16 = 60;

const MAC_LEN: usize = 6;

/// Byte-wise MAC comparison. Both addresses must be exactly 6 bytes.
pub fn mac_eq(a: &[u8], b: &[u8]) -> Result<bool, OfpError> {
    Ok(mac_key(a)? == mac_key(b)?)
}

fn mac_key(mac: &[u8]) -> Result<[u8; 6], OfpError> {
    if mac.len() != MAC_LEN {
        return Err(OfpError::InvalidAddressLength { len: mac.len() });
    }
    let mut key = [0; 6];
    key.copy_from_slice(mac);
    Ok(key)
}

/// Source MAC to switch port, one entry per MAC.
#[derive(Debug, Default, Clone)]
pub struct LearningTable {
    known_hosts: HashMap<[u8; 6], u16>,
}

impl LearningTable {
    pub fn new() -> LearningTable {
        LearningTable { known_hosts: HashMap::new() }
    }

    /// Record that `mac` was seen on `port`, replacing any older port for it.
    pub fn learn(&mut self, mac: &[u8], port: u16) -> Result<(), OfpError> {
        let key = mac_key(mac)?;
        match self.known_hosts.insert(key, port) {
            Some(old) if old != port => {
                debug!("host {} moved from port {} to port {}", MacAddr(mac), old, port)
            }
            None => debug!("learned host {} on port {}", MacAddr(mac), port),
            _ => {}
        }
        Ok(())
    }

    /// The port `mac` was last seen on, or `Flood` when it has never been seen.
    pub fn lookup(&self, mac: &[u8]) -> Result<PseudoPort, OfpError> {
        let key = mac_key(mac)?;
        Ok(self.known_hosts
            .get(&key)
            .map_or(PseudoPort::Flood, |p| PseudoPort::PhysicalPort(*p)))
    }

    pub fn len(&self) -> usize {
        self.known_hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_hosts.is_empty()
    }
}

impl fmt::Display for LearningTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut hosts: Vec<_> = self.known_hosts.iter().collect();
        hosts.sort();
        write!(f, "Known Hosts:")?;
        for (mac, port) in hosts {
            write!(f, " {}@{}", MacAddr(mac), port)?;
        }
        Ok(())
    }
}

/// What to do with a packet-in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Forwarding {
    /// Install a flow sending the packet and its successors to this port.
    Install(PseudoPort),
    /// Send this packet out of every port.
    Flood,
    /// Flood a packet the controller has no policy for.
    FloodUnknown,
}

/// Forwarding decision for `flow`, by ethertype.
pub fn decide(flow: &Flow, table: &LearningTable) -> Result<Forwarding, OfpError> {
    let decision = match flow.ether_type() {
        EtherType::Ip => Forwarding::Install(table.lookup(&flow.dl_dst)?),
        EtherType::Arp => {
            match flow.nw_proto {
                ARP_REQUEST => Forwarding::Flood,
                ARP_REPLY => Forwarding::Install(table.lookup(&flow.dl_dst)?),
                _ => Forwarding::FloodUnknown,
            }
        }
        EtherType::Rarp | EtherType::Unspecified => Forwarding::Flood,
        EtherType::Ipv6 if flow.is_ipv6_multicast() => Forwarding::Flood,
        EtherType::Ipv6 | EtherType::Vlan | EtherType::Other(_) => Forwarding::FloodUnknown,
    };
    Ok(decision)
}

/// Flow-mod installing `flow`'s match with a single output to `port`.
pub fn install_flow(flow: &Flow, port: PseudoPort) -> FlowMod {
    FlowMod {
        command: FlowModCmd::AddFlow,
        pattern: flow.pattern(),
        priority: FLOW_PRIORITY,
        actions: vec![Action::Output(port)],
        cookie: FLOW_COOKIE,
        idle_timeout: Timeout::ExpiresAfter(FLOW_IDLE_TIMEOUT),
        hard_timeout: Timeout::Permanent,
        flags: FlowModFlags::empty(),
        apply_to_packet: match flow.buffer_id {
            NO_BUFFER => None,
            id => Some(id),
        },
        out_port: Some(port),
    }
}

/// Packet-out flooding the packet of `pkt`. A switch-buffered packet is referenced
/// by buffer id; otherwise the frame itself is sent back.
pub fn flood(pkt: &PacketIn) -> PacketOut {
    PacketOut {
        output_payload: pkt.input_payload.clone(),
        port_id: Some(pkt.port),
        apply_actions: vec![Action::Output(PseudoPort::Flood)],
    }
}

/// Plain learning switch: the base forwarding policy and nothing else.
#[derive(Debug, Default, Copy, Clone)]
pub struct LearningSwitch;

impl SessionVariant for LearningSwitch {}
