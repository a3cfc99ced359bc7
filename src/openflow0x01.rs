use std::convert::TryFrom;
use std::fmt::{Display, Error, Formatter};
use std::io::{BufRead, Cursor, Read};
use std::net::Ipv4Addr;

use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::ofp_message::OfpError;
use crate::ofp_utils::{read_fixed_size_string, read_mac, write_padding_bytes};

pub const OFP_ETH_ALEN: usize = 6;
pub const OFP_MAX_PORT_NAME_LEN: usize = 16;
pub const OFP_MATCH_LENGTH: usize = 40;
pub const OFP_PHY_PORT_LENGTH: usize = 48;
/// Fixed part of a features-reply body, ports excluded.
pub const OFP_SWITCH_FEATURES_LENGTH: usize = 24;
/// Packet-in body prefix preceding the captured frame.
pub const OFP_PACKET_IN_LENGTH: usize = 10;
/// Packet-out header plus fixed fields.
pub const OFP_PACKET_OUT_LENGTH: usize = 16;
/// Flow-mod header plus fixed fields.
pub const OFP_FLOW_MOD_LENGTH: usize = 72;
pub const OFP_ACTION_OUTPUT_LENGTH: usize = 8;

/// Buffer id meaning "the packet is not buffered on the switch".
pub const NO_BUFFER: u32 = 0xffff_ffff;

/// OpenFlow 1.0 message type codes, used by headers to identify meaning of the rest of a message.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MsgCode {
    Hello,
    Error,
    EchoReq,
    EchoResp,
    Vendor,
    FeaturesReq,
    FeaturesResp,
    GetConfigReq,
    GetConfigResp,
    SetConfig,
    PacketIn,
    FlowRemoved,
    PortStatus,
    PacketOut,
    FlowMod,
    PortMod,
    StatsReq,
    StatsResp,
    BarrierReq,
    BarrierResp,
    QueueGetConfigReq,
    QueueGetConfigResp,
}

impl TryFrom<u8> for MsgCode {
    type Error = OfpError;

    fn try_from(code: u8) -> Result<MsgCode, OfpError> {
        let msg = match code {
            0 => MsgCode::Hello,
            1 => MsgCode::Error,
            2 => MsgCode::EchoReq,
            3 => MsgCode::EchoResp,
            4 => MsgCode::Vendor,
            5 => MsgCode::FeaturesReq,
            6 => MsgCode::FeaturesResp,
            7 => MsgCode::GetConfigReq,
            8 => MsgCode::GetConfigResp,
            9 => MsgCode::SetConfig,
            10 => MsgCode::PacketIn,
            11 => MsgCode::FlowRemoved,
            12 => MsgCode::PortStatus,
            13 => MsgCode::PacketOut,
            14 => MsgCode::FlowMod,
            15 => MsgCode::PortMod,
            16 => MsgCode::StatsReq,
            17 => MsgCode::StatsResp,
            18 => MsgCode::BarrierReq,
            19 => MsgCode::BarrierResp,
            20 => MsgCode::QueueGetConfigReq,
            21 => MsgCode::QueueGetConfigResp,
            t => return Err(OfpError::violation(format!("unknown message type {}", t))),
        };
        Ok(msg)
    }
}

impl Display for MsgCode {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let text = match self {
            MsgCode::Hello => "Hello",
            MsgCode::Error => "Error",
            MsgCode::EchoReq => "EchoReq",
            MsgCode::EchoResp => "EchoResp",
            MsgCode::Vendor => "Vendor",
            MsgCode::FeaturesReq => "FeaturesReq",
            MsgCode::FeaturesResp => "FeaturesResp",
            MsgCode::GetConfigReq => "GetConfigReq",
            MsgCode::GetConfigResp => "GetConfigResp",
            MsgCode::SetConfig => "SetConfig",
            MsgCode::PacketIn => "PacketIn",
            MsgCode::FlowRemoved => "FlowRemoved",
            MsgCode::PortStatus => "PortStatus",
            MsgCode::PacketOut => "PacketOut",
            MsgCode::FlowMod => "FlowMod",
            MsgCode::PortMod => "PortMod",
            MsgCode::StatsReq => "StatsReq",
            MsgCode::StatsResp => "StatsResp",
            MsgCode::BarrierReq => "BarrierReq",
            MsgCode::BarrierResp => "BarrierResp",
            MsgCode::QueueGetConfigReq => "QueueGetConfigReq",
            MsgCode::QueueGetConfigResp => "QueueGetConfigResp",
        };
        f.write_str(text)
    }
}

/// Common API for message types implementing OpenFlow Message Codes (see `MsgCode` enum).
pub trait MessageType: Sized {
    /// Return the byte-size of a message body.
    fn size_of(msg: &Self) -> usize;
    /// Parse a buffer into a message.
    fn parse(buf: &[u8]) -> Result<Self, OfpError>;
    /// Marshal a message into a `u8` buffer.
    fn marshal(msg: &Self, bytes: &mut Vec<u8>) -> Result<(), OfpError>;
}

bitflags! {
    /// Capabilities supported by the datapath.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const FLOW_STATS = 1 << 0;
        const TABLE_STATS = 1 << 1;
        const PORT_STATS = 1 << 2;
        const STP = 1 << 3;
        const RESERVED = 1 << 4;
        const IP_REASM = 1 << 5;
        const QUEUE_STATS = 1 << 6;
        const ARP_MATCH_IP = 1 << 7;
    }
}

bitflags! {
    /// Actions supported by the datapath, one bit per action type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SupportedActions: u32 {
        const OUTPUT = 1 << 0;
        const SET_VLAN_VID = 1 << 1;
        const SET_VLAN_PCP = 1 << 2;
        const STRIP_VLAN = 1 << 3;
        const SET_DL_SRC = 1 << 4;
        const SET_DL_DST = 1 << 5;
        const SET_NW_SRC = 1 << 6;
        const SET_NW_DST = 1 << 7;
        const SET_NW_TOS = 1 << 8;
        const SET_TP_SRC = 1 << 9;
        const SET_TP_DST = 1 << 10;
        const ENQUEUE = 1 << 11;
    }
}

bitflags! {
    /// Flags to indicate behavior of the physical port.
    ///
    /// These flags are used both to describe the current configuration of a physical port,
    /// and to configure a port's behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PortConfig: u32 {
        const PORT_DOWN = 1 << 0;
        const NO_STP = 1 << 1;
        const NO_RECV = 1 << 2;
        const NO_RECV_STP = 1 << 3;
        const NO_FLOOD = 1 << 4;
        const NO_FWD = 1 << 5;
        const NO_PACKET_IN = 1 << 6;
    }
}

bitflags! {
    /// Current state of a physical port. Not configurable by the controller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PortState: u32 {
        const LINK_DOWN = 1 << 0;
        const STP_LEARN = 1 << 8;
        const STP_FORWARD = 2 << 8;
        const STP_BLOCK = 3 << 8;
        const STP_MASK = 3 << 8;
    }
}

/// STP state of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StpState {
    Listen,
    Learn,
    Forward,
    Block,
}

impl PortState {
    pub fn stp_state(&self) -> StpState {
        match (self.bits() & PortState::STP_MASK.bits()) >> 8 {
            0 => StpState::Listen,
            1 => StpState::Learn,
            2 => StpState::Forward,
            _ => StpState::Block,
        }
    }
}

bitflags! {
    /// Features of physical ports available in a datapath.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PortFeatures: u32 {
        const F_10MB_HD = 1 << 0;
        const F_10MB_FD = 1 << 1;
        const F_100MB_HD = 1 << 2;
        const F_100MB_FD = 1 << 3;
        const F_1GB_HD = 1 << 4;
        const F_1GB_FD = 1 << 5;
        const F_10GB_FD = 1 << 6;
        const COPPER = 1 << 7;
        const FIBER = 1 << 8;
        const AUTONEG = 1 << 9;
        const PAUSE = 1 << 10;
        const PAUSE_ASYM = 1 << 11;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FlowModFlags: u16 {
        /// Send flow removed message when flow expires or is deleted.
        const SEND_FLOW_REM = 1 << 0;
        /// Check for overlapping entries first.
        const CHECK_OVERLAP = 1 << 1;
        /// Remark this is for emergency.
        const EMERG = 1 << 2;
    }
}

bitflags! {
    /// Fields of a `Match` the switch ignores.
    ///
    /// `NW_SRC_MASK` and `NW_DST_MASK` are 6-bit counts of ignored low-order address
    /// bits rather than single flags; see `nw_src_bits` and `with_nw_src_bits`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Wildcards: u32 {
        const IN_PORT = 1 << 0;
        const DL_VLAN = 1 << 1;
        const DL_SRC = 1 << 2;
        const DL_DST = 1 << 3;
        const DL_TYPE = 1 << 4;
        const NW_PROTO = 1 << 5;
        const TP_SRC = 1 << 6;
        const TP_DST = 1 << 7;
        const NW_SRC_MASK = 0x3f << 8;
        const NW_SRC_ALL = 32 << 8;
        const NW_DST_MASK = 0x3f << 14;
        const NW_DST_ALL = 32 << 14;
        const DL_VLAN_PCP = 1 << 20;
        const NW_TOS = 1 << 21;
        const ALL = (1 << 22) - 1;
    }
}

const NW_SRC_SHIFT: u32 = 8;
const NW_DST_SHIFT: u32 = 14;

impl Wildcards {
    fn get_nw_mask(&self, shift: u32) -> u32 {
        (self.bits() >> shift) & 0x3f
    }

    fn set_nw_mask(self, shift: u32, v: u32) -> Wildcards {
        let cleared = self.bits() & !(0x3f << shift);
        Wildcards::from_bits_retain(cleared | ((v.min(32) & 0x3f) << shift))
    }

    /// Number of ignored low-order bits of the IPv4 source address (32 ignores it all).
    pub fn nw_src_bits(&self) -> u32 {
        self.get_nw_mask(NW_SRC_SHIFT)
    }

    pub fn nw_dst_bits(&self) -> u32 {
        self.get_nw_mask(NW_DST_SHIFT)
    }

    pub fn with_nw_src_bits(self, bits: u32) -> Wildcards {
        self.set_nw_mask(NW_SRC_SHIFT, bits)
    }

    pub fn with_nw_dst_bits(self, bits: u32) -> Wildcards {
        self.set_nw_mask(NW_DST_SHIFT, bits)
    }
}

/// Fields to match against flows. Always 40 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub wildcards: Wildcards,
    pub in_port: u16,
    pub dl_src: [u8; 6],
    pub dl_dst: [u8; 6],
    pub dl_vlan: u16,
    pub dl_vlan_pcp: u8,
    pub dl_type: u16,
    pub nw_tos: u8,
    pub nw_proto: u8,
    pub nw_src: Ipv4Addr,
    pub nw_dst: Ipv4Addr,
    pub tp_src: u16,
    pub tp_dst: u16,
}

impl Match {
    /// A match with every field wildcarded.
    pub fn match_all() -> Match {
        Match {
            wildcards: Wildcards::ALL,
            in_port: 0,
            dl_src: [0; 6],
            dl_dst: [0; 6],
            dl_vlan: 0,
            dl_vlan_pcp: 0,
            dl_type: 0,
            nw_tos: 0,
            nw_proto: 0,
            nw_src: Ipv4Addr::UNSPECIFIED,
            nw_dst: Ipv4Addr::UNSPECIFIED,
            tp_src: 0,
            tp_dst: 0,
        }
    }

    pub fn size_of() -> usize {
        OFP_MATCH_LENGTH
    }

    fn parse(bytes: &mut Cursor<&[u8]>) -> Result<Match, OfpError> {
        let wildcards = Wildcards::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        let in_port = bytes.read_u16::<BigEndian>()?;
        let dl_src = read_mac(bytes)?;
        let dl_dst = read_mac(bytes)?;
        let dl_vlan = bytes.read_u16::<BigEndian>()?;
        let dl_vlan_pcp = bytes.read_u8()?;
        bytes.consume(1);
        let dl_type = bytes.read_u16::<BigEndian>()?;
        let nw_tos = bytes.read_u8()?;
        let nw_proto = bytes.read_u8()?;
        bytes.consume(2);
        let nw_src = Ipv4Addr::from(bytes.read_u32::<BigEndian>()?);
        let nw_dst = Ipv4Addr::from(bytes.read_u32::<BigEndian>()?);
        let tp_src = bytes.read_u16::<BigEndian>()?;
        let tp_dst = bytes.read_u16::<BigEndian>()?;
        Ok(Match {
            wildcards,
            in_port,
            dl_src,
            dl_dst,
            dl_vlan,
            dl_vlan_pcp,
            dl_type,
            nw_tos,
            nw_proto,
            nw_src,
            nw_dst,
            tp_src,
            tp_dst,
        })
    }

    /// Parse a wire match. The buffer must be exactly 40 bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Match, OfpError> {
        if buf.len() != OFP_MATCH_LENGTH {
            return Err(OfpError::InvalidMatch { len: buf.len() });
        }
        Match::parse(&mut Cursor::new(buf))
    }

    fn marshal(m: &Match, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        bytes.write_u32::<BigEndian>(m.wildcards.bits())?;
        bytes.write_u16::<BigEndian>(m.in_port)?;
        bytes.extend_from_slice(&m.dl_src);
        bytes.extend_from_slice(&m.dl_dst);
        bytes.write_u16::<BigEndian>(m.dl_vlan)?;
        bytes.write_u8(m.dl_vlan_pcp)?;
        write_padding_bytes(bytes, 1)?;
        bytes.write_u16::<BigEndian>(m.dl_type)?;
        bytes.write_u8(m.nw_tos)?;
        bytes.write_u8(m.nw_proto)?;
        write_padding_bytes(bytes, 2)?;
        bytes.extend_from_slice(&m.nw_src.octets());
        bytes.extend_from_slice(&m.nw_dst.octets());
        bytes.write_u16::<BigEndian>(m.tp_src)?;
        bytes.write_u16::<BigEndian>(m.tp_dst)?;
        Ok(())
    }

    /// The 40-byte wire form of this match.
    pub fn to_bytes(&self) -> [u8; OFP_MATCH_LENGTH] {
        let mut arr = [0; OFP_MATCH_LENGTH];
        arr[0..4].copy_from_slice(&self.wildcards.bits().to_be_bytes());
        arr[4..6].copy_from_slice(&self.in_port.to_be_bytes());
        arr[6..12].copy_from_slice(&self.dl_src);
        arr[12..18].copy_from_slice(&self.dl_dst);
        arr[18..20].copy_from_slice(&self.dl_vlan.to_be_bytes());
        arr[20] = self.dl_vlan_pcp;
        arr[22..24].copy_from_slice(&self.dl_type.to_be_bytes());
        arr[24] = self.nw_tos;
        arr[25] = self.nw_proto;
        arr[28..32].copy_from_slice(&self.nw_src.octets());
        arr[32..36].copy_from_slice(&self.nw_dst.octets());
        arr[36..38].copy_from_slice(&self.tp_src.to_be_bytes());
        arr[38..40].copy_from_slice(&self.tp_dst.to_be_bytes());
        arr
    }
}

/// Reserved port numbers.
#[repr(u16)]
pub enum OfpPort {
    OFPPMax = 0xff00,
    OFPPInPort = 0xfff8,
    OFPPTable = 0xfff9,
    OFPPNormal = 0xfffa,
    OFPPFlood = 0xfffb,
    OFPPAll = 0xfffc,
    OFPPController = 0xfffd,
    OFPPLocal = 0xfffe,
    OFPPNone = 0xffff,
}

/// Port behavior.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PseudoPort {
    PhysicalPort(u16),
    InPort,
    Table,
    Normal,
    Flood,
    AllPorts,
    Controller(u16),
    Local,
}

impl PseudoPort {
    /// Port number `OFPP_NONE` maps to `None`.
    pub fn of_int(p: u16) -> Result<Option<PseudoPort>, OfpError> {
        if (OfpPort::OFPPNone as u16) == p {
            Ok(None)
        } else {
            Ok(Some(PseudoPort::make(p, 0)?))
        }
    }

    /// Build a port from its number; `len` is the max_len for `Controller`.
    pub fn make(p: u16, len: u16) -> Result<PseudoPort, OfpError> {
        let res = match p {
            p if p == (OfpPort::OFPPInPort as u16) => PseudoPort::InPort,
            p if p == (OfpPort::OFPPTable as u16) => PseudoPort::Table,
            p if p == (OfpPort::OFPPNormal as u16) => PseudoPort::Normal,
            p if p == (OfpPort::OFPPFlood as u16) => PseudoPort::Flood,
            p if p == (OfpPort::OFPPAll as u16) => PseudoPort::AllPorts,
            p if p == (OfpPort::OFPPController as u16) => PseudoPort::Controller(len),
            p if p == (OfpPort::OFPPLocal as u16) => PseudoPort::Local,
            _ => {
                if p <= (OfpPort::OFPPMax as u16) {
                    PseudoPort::PhysicalPort(p)
                } else {
                    return Err(OfpError::malformed("port number",
                                                   format!("unsupported port 0x{:x}", p)));
                }
            }
        };
        Ok(res)
    }

    pub fn to_int(&self) -> u16 {
        match *self {
            PseudoPort::PhysicalPort(p) => p,
            PseudoPort::InPort => OfpPort::OFPPInPort as u16,
            PseudoPort::Table => OfpPort::OFPPTable as u16,
            PseudoPort::Normal => OfpPort::OFPPNormal as u16,
            PseudoPort::Flood => OfpPort::OFPPFlood as u16,
            PseudoPort::AllPorts => OfpPort::OFPPAll as u16,
            PseudoPort::Controller(_) => OfpPort::OFPPController as u16,
            PseudoPort::Local => OfpPort::OFPPLocal as u16,
        }
    }

    fn marshal(pp: PseudoPort, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        bytes.write_u16::<BigEndian>(pp.to_int())?;
        Ok(())
    }
}

/// Actions associated with flows and packets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Output(PseudoPort),
}

#[repr(u16)]
enum OfpActionType {
    OFPATOutput,
}

impl Action {
    fn type_code(a: &Action) -> OfpActionType {
        match *a {
            Action::Output(_) => OfpActionType::OFPATOutput,
        }
    }

    pub fn size_of(a: &Action) -> usize {
        match *a {
            Action::Output(_) => OFP_ACTION_OUTPUT_LENGTH,
        }
    }

    pub fn size_of_sequence(actions: &[Action]) -> usize {
        actions.iter().map(Action::size_of).sum()
    }

    fn parse(bytes: &mut Cursor<&[u8]>) -> Result<Action, OfpError> {
        let action_code = bytes.read_u16::<BigEndian>()?;
        let len = bytes.read_u16::<BigEndian>()?;
        if action_code != OfpActionType::OFPATOutput as u16 {
            return Err(OfpError::malformed("action",
                                           format!("unsupported action type {}", action_code)));
        }
        if len as usize != OFP_ACTION_OUTPUT_LENGTH {
            return Err(OfpError::malformed("action", format!("output action of length {}", len)));
        }
        let port_code = bytes.read_u16::<BigEndian>()?;
        let max_len = bytes.read_u16::<BigEndian>()?;
        Ok(Action::Output(PseudoPort::make(port_code, max_len)?))
    }

    fn parse_sequence(buf: &[u8]) -> Result<Vec<Action>, OfpError> {
        let mut bytes = Cursor::new(buf);
        let mut v = vec![];
        while (bytes.position() as usize) < buf.len() {
            v.push(Action::parse(&mut bytes)?);
        }
        Ok(v)
    }

    fn move_controller_last(acts: &[Action]) -> Vec<Action> {
        let (mut to_ctrl, mut not_to_ctrl): (Vec<Action>, Vec<Action>) = acts.iter()
            .partition(|act| match **act {
                Action::Output(PseudoPort::Controller(_)) => true,
                _ => false,
            });
        not_to_ctrl.append(&mut to_ctrl);
        not_to_ctrl
    }

    fn marshal(act: &Action, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        bytes.write_u16::<BigEndian>(Action::type_code(act) as u16)?;
        bytes.write_u16::<BigEndian>(Action::size_of(act) as u16)?;
        match *act {
            Action::Output(pp) => {
                PseudoPort::marshal(pp, bytes)?;
                bytes.write_u16::<BigEndian>(match pp {
                        PseudoPort::Controller(w) => w,
                        _ => 0,
                    })?;
            }
        }
        Ok(())
    }

    fn marshal_sequence(actions: &[Action], bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        for act in actions {
            Action::marshal(act, bytes)?;
        }
        Ok(())
    }
}

/// How long before a flow entry expires.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Timeout {
    Permanent,
    ExpiresAfter(u16),
}

impl Timeout {
    fn of_int(tm: u16) -> Timeout {
        match tm {
            0 => Timeout::Permanent,
            d => Timeout::ExpiresAfter(d),
        }
    }

    fn to_int(tm: Timeout) -> u16 {
        match tm {
            Timeout::Permanent => 0,
            Timeout::ExpiresAfter(d) => d,
        }
    }
}

/// Switch features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchFeatures {
    pub datapath_id: u64,
    pub num_buffers: u32,
    pub num_tables: u8,
    pub supported_capabilities: Capabilities,
    pub supported_actions: SupportedActions,
    pub ports: Vec<PortDesc>,
}

impl SwitchFeatures {
    /// The first port whose name is exactly `name`.
    pub fn port_named(&self, name: &str) -> Option<&PortDesc> {
        self.ports.iter().find(|pd| pd.name == name)
    }
}

impl MessageType for SwitchFeatures {
    fn size_of(sf: &SwitchFeatures) -> usize {
        OFP_SWITCH_FEATURES_LENGTH + sf.ports.len() * OFP_PHY_PORT_LENGTH
    }

    fn parse(buf: &[u8]) -> Result<SwitchFeatures, OfpError> {
        if buf.len() < OFP_SWITCH_FEATURES_LENGTH {
            return Err(OfpError::truncated("features reply", OFP_SWITCH_FEATURES_LENGTH, buf.len()));
        }
        let ports_len = buf.len() - OFP_SWITCH_FEATURES_LENGTH;
        if ports_len % OFP_PHY_PORT_LENGTH != 0 {
            return Err(OfpError::malformed("features reply",
                                           format!("{} port bytes is not a multiple of {}",
                                                   ports_len,
                                                   OFP_PHY_PORT_LENGTH)));
        }
        let mut bytes = Cursor::new(buf);
        let datapath_id = bytes.read_u64::<BigEndian>()?;
        let num_buffers = bytes.read_u32::<BigEndian>()?;
        let num_tables = bytes.read_u8()?;
        bytes.consume(3);
        let supported_capabilities =
            Capabilities::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        let supported_actions = SupportedActions::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        let ports = (0..ports_len / OFP_PHY_PORT_LENGTH)
            .map(|_| PortDesc::parse(&mut bytes))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SwitchFeatures {
            datapath_id,
            num_buffers,
            num_tables,
            supported_capabilities,
            supported_actions,
            ports,
        })
    }

    fn marshal(sf: &SwitchFeatures, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        bytes.write_u64::<BigEndian>(sf.datapath_id)?;
        bytes.write_u32::<BigEndian>(sf.num_buffers)?;
        bytes.write_u8(sf.num_tables)?;
        write_padding_bytes(bytes, 3)?;
        bytes.write_u32::<BigEndian>(sf.supported_capabilities.bits())?;
        bytes.write_u32::<BigEndian>(sf.supported_actions.bits())?;
        for pd in &sf.ports {
            PortDesc::marshal(pd, bytes)?;
        }
        Ok(())
    }
}

/// Description of a physical port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDesc {
    pub port_no: u16,
    pub hw_addr: [u8; 6],
    pub name: String,
    pub config: PortConfig,
    pub state: PortState,
    pub curr: PortFeatures,
    pub advertised: PortFeatures,
    pub supported: PortFeatures,
    pub peer: PortFeatures,
}

impl PortDesc {
    fn parse(bytes: &mut Cursor<&[u8]>) -> Result<PortDesc, OfpError> {
        let port_no = bytes.read_u16::<BigEndian>()?;
        let hw_addr = read_mac(bytes)?;
        let name = read_fixed_size_string(bytes, OFP_MAX_PORT_NAME_LEN)?;
        let config = PortConfig::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        let state = PortState::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        let curr = PortFeatures::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        let advertised = PortFeatures::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        let supported = PortFeatures::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        let peer = PortFeatures::from_bits_retain(bytes.read_u32::<BigEndian>()?);
        Ok(PortDesc {
            port_no,
            hw_addr,
            name,
            config,
            state,
            curr,
            advertised,
            supported,
            peer,
        })
    }

    fn marshal(pd: &PortDesc, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        bytes.write_u16::<BigEndian>(pd.port_no)?;
        bytes.extend_from_slice(&pd.hw_addr);
        let name = pd.name.as_bytes();
        let name_len = name.len().min(OFP_MAX_PORT_NAME_LEN);
        bytes.extend_from_slice(&name[..name_len]);
        write_padding_bytes(bytes, OFP_MAX_PORT_NAME_LEN - name_len)?;
        bytes.write_u32::<BigEndian>(pd.config.bits())?;
        bytes.write_u32::<BigEndian>(pd.state.bits())?;
        bytes.write_u32::<BigEndian>(pd.curr.bits())?;
        bytes.write_u32::<BigEndian>(pd.advertised.bits())?;
        bytes.write_u32::<BigEndian>(pd.supported.bits())?;
        bytes.write_u32::<BigEndian>(pd.peer.bits())?;
        Ok(())
    }
}

/// Type of modification to perform on a flow table.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlowModCmd {
    AddFlow,
    ModFlow,
    ModStrictFlow,
    DeleteFlow,
    DeleteStrictFlow,
}

impl TryFrom<u16> for FlowModCmd {
    type Error = OfpError;

    fn try_from(cmd: u16) -> Result<FlowModCmd, OfpError> {
        match cmd {
            0 => Ok(FlowModCmd::AddFlow),
            1 => Ok(FlowModCmd::ModFlow),
            2 => Ok(FlowModCmd::ModStrictFlow),
            3 => Ok(FlowModCmd::DeleteFlow),
            4 => Ok(FlowModCmd::DeleteStrictFlow),
            c => Err(OfpError::malformed("flow mod", format!("unknown command {}", c))),
        }
    }
}

/// Represents modifications to a flow table from the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    pub command: FlowModCmd,
    pub pattern: Match,
    pub priority: u16,
    pub actions: Vec<Action>,
    pub cookie: u64,
    pub idle_timeout: Timeout,
    pub hard_timeout: Timeout,
    pub flags: FlowModFlags,
    pub apply_to_packet: Option<u32>,
    pub out_port: Option<PseudoPort>,
}

impl MessageType for FlowMod {
    fn size_of(msg: &FlowMod) -> usize {
        OFP_FLOW_MOD_LENGTH - crate::ofp_header::OFP_HEADER_LENGTH +
        Action::size_of_sequence(&msg.actions)
    }

    fn parse(buf: &[u8]) -> Result<FlowMod, OfpError> {
        let fixed = OFP_FLOW_MOD_LENGTH - crate::ofp_header::OFP_HEADER_LENGTH;
        if buf.len() < fixed {
            return Err(OfpError::truncated("flow mod", fixed, buf.len()));
        }
        let pattern = Match::from_bytes(&buf[..OFP_MATCH_LENGTH])?;
        let mut bytes = Cursor::new(&buf[OFP_MATCH_LENGTH..fixed]);
        let cookie = bytes.read_u64::<BigEndian>()?;
        let command = FlowModCmd::try_from(bytes.read_u16::<BigEndian>()?)?;
        let idle = Timeout::of_int(bytes.read_u16::<BigEndian>()?);
        let hard = Timeout::of_int(bytes.read_u16::<BigEndian>()?);
        let prio = bytes.read_u16::<BigEndian>()?;
        let buffer_id = bytes.read_u32::<BigEndian>()?;
        let out_port = PseudoPort::of_int(bytes.read_u16::<BigEndian>()?)?;
        let flags = FlowModFlags::from_bits_retain(bytes.read_u16::<BigEndian>()?);
        let actions = Action::parse_sequence(&buf[fixed..])?;
        Ok(FlowMod {
            command,
            pattern,
            priority: prio,
            actions,
            cookie,
            idle_timeout: idle,
            hard_timeout: hard,
            flags,
            apply_to_packet: match buffer_id {
                NO_BUFFER => None,
                n => Some(n),
            },
            out_port,
        })
    }

    fn marshal(fm: &FlowMod, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        Match::marshal(&fm.pattern, bytes)?;
        bytes.write_u64::<BigEndian>(fm.cookie)?;
        bytes.write_u16::<BigEndian>(fm.command as u16)?;
        bytes.write_u16::<BigEndian>(Timeout::to_int(fm.idle_timeout))?;
        bytes.write_u16::<BigEndian>(Timeout::to_int(fm.hard_timeout))?;
        bytes.write_u16::<BigEndian>(fm.priority)?;
        bytes.write_u32::<BigEndian>(fm.apply_to_packet.unwrap_or(NO_BUFFER))?;
        match fm.out_port {
            None => bytes.write_u16::<BigEndian>(OfpPort::OFPPNone as u16)?,
            Some(x) => PseudoPort::marshal(x, bytes)?,
        }
        bytes.write_u16::<BigEndian>(fm.flags.bits())?;
        for act in Action::move_controller_last(&fm.actions) {
            if let Action::Output(PseudoPort::Table) = act {
                return Err(OfpError::malformed("flow mod",
                                               "OFPP_TABLE not allowed in installed flow"));
            }
            Action::marshal(&act, bytes)?
        }
        Ok(())
    }
}

/// The data associated with a packet received by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Buffered(u32, Vec<u8>),
    NotBuffered(Vec<u8>),
}

impl Payload {
    pub fn size_of(payload: &Payload) -> usize {
        payload.data().len()
    }

    /// The captured frame, whether or not the switch also buffered it.
    pub fn data(&self) -> &[u8] {
        match *self {
            Payload::Buffered(_, ref buf) |
            Payload::NotBuffered(ref buf) => buf,
        }
    }

    /// The switch buffer id, `NO_BUFFER` when not buffered.
    pub fn buffer_id(&self) -> u32 {
        match *self {
            Payload::Buffered(id, _) => id,
            Payload::NotBuffered(_) => NO_BUFFER,
        }
    }
}

/// The reason a packet arrives at the controller.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PacketInReason {
    NoMatch,
    ExplicitSend,
}

impl TryFrom<u8> for PacketInReason {
    type Error = OfpError;

    fn try_from(reason: u8) -> Result<PacketInReason, OfpError> {
        match reason {
            0 => Ok(PacketInReason::NoMatch),
            1 => Ok(PacketInReason::ExplicitSend),
            r => Err(OfpError::malformed("packet in", format!("unknown reason {}", r))),
        }
    }
}

/// Represents packets received by the datapath and sent to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    pub input_payload: Payload,
    pub total_len: u16,
    pub port: u16,
    pub reason: PacketInReason,
}

impl MessageType for PacketIn {
    fn size_of(pi: &PacketIn) -> usize {
        OFP_PACKET_IN_LENGTH + Payload::size_of(&pi.input_payload)
    }

    fn parse(buf: &[u8]) -> Result<PacketIn, OfpError> {
        if buf.len() < OFP_PACKET_IN_LENGTH {
            return Err(OfpError::truncated("packet in", OFP_PACKET_IN_LENGTH, buf.len()));
        }
        let mut bytes = Cursor::new(buf);
        let buf_id = bytes.read_u32::<BigEndian>()?;
        let total_len = bytes.read_u16::<BigEndian>()?;
        let port = bytes.read_u16::<BigEndian>()?;
        let reason = PacketInReason::try_from(bytes.read_u8()?)?;
        let pk = buf[OFP_PACKET_IN_LENGTH..].to_vec();
        let payload = match buf_id {
            NO_BUFFER => Payload::NotBuffered(pk),
            n => Payload::Buffered(n, pk),
        };
        Ok(PacketIn {
            input_payload: payload,
            total_len,
            port,
            reason,
        })
    }

    fn marshal(pi: &PacketIn, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        bytes.write_u32::<BigEndian>(pi.input_payload.buffer_id())?;
        bytes.write_u16::<BigEndian>(pi.total_len)?;
        bytes.write_u16::<BigEndian>(pi.port)?;
        bytes.write_u8(pi.reason as u8)?;
        write_padding_bytes(bytes, 1)?;
        bytes.extend_from_slice(pi.input_payload.data());
        Ok(())
    }
}

/// Represents packets sent from the controller.
///
/// A buffered payload only names the switch buffer; an unbuffered payload carries
/// the frame after the action list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    pub output_payload: Payload,
    pub port_id: Option<u16>,
    pub apply_actions: Vec<Action>,
}

impl MessageType for PacketOut {
    fn size_of(po: &PacketOut) -> usize {
        let data = match po.output_payload {
            Payload::Buffered(..) => 0,
            Payload::NotBuffered(ref buf) => buf.len(),
        };
        OFP_PACKET_OUT_LENGTH - crate::ofp_header::OFP_HEADER_LENGTH +
        Action::size_of_sequence(&po.apply_actions) + data
    }

    fn parse(buf: &[u8]) -> Result<PacketOut, OfpError> {
        let fixed = OFP_PACKET_OUT_LENGTH - crate::ofp_header::OFP_HEADER_LENGTH;
        if buf.len() < fixed {
            return Err(OfpError::truncated("packet out", fixed, buf.len()));
        }
        let mut bytes = Cursor::new(buf);
        let buf_id = bytes.read_u32::<BigEndian>()?;
        let in_port = bytes.read_u16::<BigEndian>()?;
        let actions_len = bytes.read_u16::<BigEndian>()? as usize;
        if buf.len() < fixed + actions_len {
            return Err(OfpError::truncated("packet out actions", fixed + actions_len, buf.len()));
        }
        let apply_actions = Action::parse_sequence(&buf[fixed..fixed + actions_len])?;
        let data = buf[fixed + actions_len..].to_vec();
        Ok(PacketOut {
            output_payload: match buf_id {
                NO_BUFFER => Payload::NotBuffered(data),
                n => Payload::Buffered(n, data),
            },
            port_id: if in_port == OfpPort::OFPPNone as u16 {
                None
            } else {
                Some(in_port)
            },
            apply_actions,
        })
    }

    fn marshal(po: &PacketOut, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        bytes.write_u32::<BigEndian>(po.output_payload.buffer_id())?;
        bytes.write_u16::<BigEndian>(po.port_id.unwrap_or(OfpPort::OFPPNone as u16))?;
        bytes.write_u16::<BigEndian>(Action::size_of_sequence(&po.apply_actions) as u16)?;
        Action::marshal_sequence(&po.apply_actions, bytes)?;
        if let Payload::NotBuffered(ref data) = po.output_payload {
            bytes.extend_from_slice(data);
        }
        Ok(())
    }
}

/// Values for the `type` field of an error message.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorType {
    HelloFailed,
    BadRequest,
    BadAction,
    FlowModFailed,
    PortModFailed,
    QueueOpFailed,
}

impl ErrorType {
    fn of_int(typ: u16) -> Option<ErrorType> {
        match typ {
            0 => Some(ErrorType::HelloFailed),
            1 => Some(ErrorType::BadRequest),
            2 => Some(ErrorType::BadAction),
            3 => Some(ErrorType::FlowModFailed),
            4 => Some(ErrorType::PortModFailed),
            5 => Some(ErrorType::QueueOpFailed),
            _ => None,
        }
    }
}

/// An error reported by the switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMsg {
    pub typ: u16,
    pub code: u16,
    pub data: Vec<u8>,
}

impl ErrorMsg {
    pub fn error_type(&self) -> Option<ErrorType> {
        ErrorType::of_int(self.typ)
    }
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        match self.error_type() {
            Some(t) => write!(f, "{:?} code {}", t, self.code),
            None => write!(f, "type {} code {}", self.typ, self.code),
        }
    }
}

impl MessageType for ErrorMsg {
    fn size_of(err: &ErrorMsg) -> usize {
        4 + err.data.len()
    }

    fn parse(buf: &[u8]) -> Result<ErrorMsg, OfpError> {
        if buf.len() < 4 {
            return Err(OfpError::truncated("error", 4, buf.len()));
        }
        let mut bytes = Cursor::new(buf);
        let typ = bytes.read_u16::<BigEndian>()?;
        let code = bytes.read_u16::<BigEndian>()?;
        let mut data = vec![];
        bytes.read_to_end(&mut data)?;
        Ok(ErrorMsg { typ, code, data })
    }

    fn marshal(err: &ErrorMsg, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
        bytes.write_u16::<BigEndian>(err.typ)?;
        bytes.write_u16::<BigEndian>(err.code)?;
        bytes.extend_from_slice(&err.data);
        Ok(())
    }
}

/// Encapsulates handling of messages implementing `MessageType` trait.
pub mod message {
    use super::*;
    use crate::ofp_header::{OfpHeader, Xid, OFP_HEADER_LENGTH};
    use crate::ofp_message::OfpMessage;

    /// Abstractions of OpenFlow messages mapping to message codes.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Message {
        Hello,
        Error(ErrorMsg),
        EchoRequest(Vec<u8>),
        EchoReply(Vec<u8>),
        FeaturesReq,
        FeaturesReply(SwitchFeatures),
        PacketIn(PacketIn),
        PacketOut(PacketOut),
        FlowMod(FlowMod),
        /// A recognized message type this controller does not model.
        Unmodeled(MsgCode, Vec<u8>),
    }

    impl Message {
        /// Map `Message` to associated OpenFlow message type code `MsgCode`.
        pub fn msg_code_of_message(msg: &Message) -> MsgCode {
            match *msg {
                Message::Hello => MsgCode::Hello,
                Message::Error(_) => MsgCode::Error,
                Message::EchoRequest(_) => MsgCode::EchoReq,
                Message::EchoReply(_) => MsgCode::EchoResp,
                Message::FeaturesReq => MsgCode::FeaturesReq,
                Message::FeaturesReply(_) => MsgCode::FeaturesResp,
                Message::PacketIn(_) => MsgCode::PacketIn,
                Message::PacketOut(_) => MsgCode::PacketOut,
                Message::FlowMod(_) => MsgCode::FlowMod,
                Message::Unmodeled(code, _) => code,
            }
        }

        /// Marshal the OpenFlow message `msg`.
        fn marshal_body(msg: &Message, bytes: &mut Vec<u8>) -> Result<(), OfpError> {
            match *msg {
                Message::Hello | Message::FeaturesReq => Ok(()),
                Message::EchoRequest(ref buf) |
                Message::EchoReply(ref buf) |
                Message::Unmodeled(_, ref buf) => {
                    bytes.extend_from_slice(buf);
                    Ok(())
                }
                Message::Error(ref err) => ErrorMsg::marshal(err, bytes),
                Message::FeaturesReply(ref feats) => SwitchFeatures::marshal(feats, bytes),
                Message::PacketIn(ref packet_in) => PacketIn::marshal(packet_in, bytes),
                Message::PacketOut(ref packet_out) => PacketOut::marshal(packet_out, bytes),
                Message::FlowMod(ref flow_mod) => FlowMod::marshal(flow_mod, bytes),
            }
        }
    }

    impl OfpMessage for Message {
        fn size_of(msg: &Message) -> usize {
            OFP_HEADER_LENGTH +
            match *msg {
                Message::Hello | Message::FeaturesReq => 0,
                Message::EchoRequest(ref buf) |
                Message::EchoReply(ref buf) |
                Message::Unmodeled(_, ref buf) => buf.len(),
                Message::Error(ref err) => ErrorMsg::size_of(err),
                Message::FeaturesReply(ref feats) => SwitchFeatures::size_of(feats),
                Message::PacketIn(ref packet_in) => PacketIn::size_of(packet_in),
                Message::PacketOut(ref packet_out) => PacketOut::size_of(packet_out),
                Message::FlowMod(ref flow_mod) => FlowMod::size_of(flow_mod),
            }
        }

        fn header_of(version: u8, xid: Xid, msg: &Message) -> Result<OfpHeader, OfpError> {
            let sizeof_buf = Self::size_of(msg);
            if sizeof_buf > u16::max_value() as usize {
                return Err(OfpError::malformed("message",
                                               format!("{} bytes exceeds the length field",
                                                       sizeof_buf)));
            }
            Ok(OfpHeader::new(version,
                              Self::msg_code_of_message(msg) as u8,
                              sizeof_buf as u16,
                              xid))
        }

        fn marshal(version: u8, xid: Xid, msg: &Message) -> Result<Vec<u8>, OfpError> {
            let hdr = Self::header_of(version, xid, msg)?;
            let mut bytes = Vec::with_capacity(hdr.length());
            OfpHeader::marshal(&mut bytes, hdr)?;
            Message::marshal_body(msg, &mut bytes)?;
            Ok(bytes)
        }

        fn parse(header: &OfpHeader, buf: &[u8]) -> Result<(Xid, Message), OfpError> {
            let msg = match header.type_code()? {
                MsgCode::Hello => Message::Hello,
                MsgCode::Error => Message::Error(ErrorMsg::parse(buf)?),
                MsgCode::EchoReq => Message::EchoRequest(buf.to_vec()),
                MsgCode::EchoResp => Message::EchoReply(buf.to_vec()),
                MsgCode::FeaturesReq => Message::FeaturesReq,
                MsgCode::FeaturesResp => Message::FeaturesReply(SwitchFeatures::parse(buf)?),
                MsgCode::PacketIn => Message::PacketIn(PacketIn::parse(buf)?),
                MsgCode::PacketOut => Message::PacketOut(PacketOut::parse(buf)?),
                MsgCode::FlowMod => Message::FlowMod(FlowMod::parse(buf)?),
                code => Message::Unmodeled(code, buf.to_vec()),
            };
            Ok((header.xid(), msg))
        }
    }

    /// Return a `FlowMod` adding a flow parameterized by the given `priority`, `pattern`,
    /// and `actions`.
    pub fn add_flow(prio: u16, pattern: Match, actions: Vec<Action>) -> FlowMod {
        FlowMod {
            command: FlowModCmd::AddFlow,
            pattern,
            priority: prio,
            actions,
            cookie: 0,
            idle_timeout: Timeout::Permanent,
            hard_timeout: Timeout::Permanent,
            flags: FlowModFlags::empty(),
            out_port: None,
            apply_to_packet: None,
        }
    }

    pub fn encode_hello(version: u8, xid: Xid) -> Result<Vec<u8>, OfpError> {
        Message::marshal(version, xid, &Message::Hello)
    }

    pub fn encode_features_request(version: u8, xid: Xid) -> Result<Vec<u8>, OfpError> {
        Message::marshal(version, xid, &Message::FeaturesReq)
    }

    /// Echo reply carrying `payload` back to the requester.
    pub fn encode_echo_reply(version: u8, xid: Xid, payload: &[u8]) -> Result<Vec<u8>, OfpError> {
        Message::marshal(version, xid, &Message::EchoReply(payload.to_vec()))
    }

    pub fn decode_features_reply(body: &[u8]) -> Result<SwitchFeatures, OfpError> {
        SwitchFeatures::parse(body)
    }

    /// Decode one 48-byte port description.
    pub fn decode_phy_port(buf: &[u8]) -> Result<PortDesc, OfpError> {
        if buf.len() < OFP_PHY_PORT_LENGTH {
            return Err(OfpError::truncated("port description", OFP_PHY_PORT_LENGTH, buf.len()));
        }
        PortDesc::parse(&mut Cursor::new(&buf[..OFP_PHY_PORT_LENGTH]))
    }

    pub fn encode_match(pattern: &Match) -> [u8; OFP_MATCH_LENGTH] {
        pattern.to_bytes()
    }

    pub fn decode_match(buf: &[u8]) -> Result<Match, OfpError> {
        Match::from_bytes(buf)
    }

    pub fn encode_action_output(port: PseudoPort) -> Result<Vec<u8>, OfpError> {
        let mut bytes = Vec::with_capacity(OFP_ACTION_OUTPUT_LENGTH);
        Action::marshal(&Action::Output(port), &mut bytes)?;
        Ok(bytes)
    }

    pub fn encode_packet_out(version: u8,
                             xid: Xid,
                             packet_out: &PacketOut)
                             -> Result<Vec<u8>, OfpError> {
        Message::marshal(version, xid, &Message::PacketOut(packet_out.clone()))
    }

    pub fn encode_flow_mod(version: u8, xid: Xid, flow_mod: &FlowMod) -> Result<Vec<u8>, OfpError> {
        Message::marshal(version, xid, &Message::FlowMod(flow_mod.clone()))
    }

    /// Flow-mod whose match is given in wire form; it replaces `flow_mod.pattern`.
    /// Fails with `InvalidMatch` unless `pattern` is exactly 40 bytes.
    pub fn encode_flow_mod_raw(version: u8,
                               xid: Xid,
                               pattern: &[u8],
                               flow_mod: &FlowMod)
                               -> Result<Vec<u8>, OfpError> {
        let mut flow_mod = flow_mod.clone();
        flow_mod.pattern = Match::from_bytes(pattern)?;
        encode_flow_mod(version, xid, &flow_mod)
    }

    pub fn decode_packet_in(body: &[u8]) -> Result<PacketIn, OfpError> {
        PacketIn::parse(body)
    }

    pub fn decode_packet_out(body: &[u8]) -> Result<PacketOut, OfpError> {
        PacketOut::parse(body)
    }

    pub fn decode_flow_mod(body: &[u8]) -> Result<FlowMod, OfpError> {
        FlowMod::parse(body)
    }

    /// Parse a complete message (header plus body) from `buf`.
    pub fn decode_message(buf: &[u8]) -> Result<(OfpHeader, Message), OfpError> {
        let header = OfpHeader::parse(buf)?;
        if header.length() < OFP_HEADER_LENGTH || buf.len() < header.length() {
            return Err(OfpError::truncated("message", header.length(), buf.len()));
        }
        let (_, msg) = Message::parse(&header, &buf[OFP_HEADER_LENGTH..header.length()])?;
        Ok((header, msg))
    }
}
