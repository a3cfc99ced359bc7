use std::io::{self, Cursor, Read, Write};

use rust_ofp_bridge::bridge::{IpcBridge, QueueBridge, DEFAULT_TAP_NAME};
use rust_ofp_bridge::learning_switch::LearningSwitch;
use rust_ofp_bridge::ofp_controller::{ControllerSession, SessionState, SessionVariant};
use rust_ofp_bridge::ofp_header::OfpHeader;
use rust_ofp_bridge::ofp_message::{OfpError, OfpMessage};
use rust_ofp_bridge::openflow0x01::message::{decode_message, Message};
use rust_ofp_bridge::openflow0x01::{Action, Capabilities, FlowModCmd, MsgCode, PacketIn,
                                    PacketInReason, Payload, PortConfig, PortDesc, PortFeatures,
                                    PortState, PseudoPort, SupportedActions, SwitchFeatures,
                                    Timeout, NO_BUFFER};

const HOST_1: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01];
const HOST_2: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x02];
const TEST_XID: u32 = 0x42;

/// Scripted switch: the session reads `input` and writes into `output`.
struct Duplex {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl Read for Duplex {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for Duplex {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Script {
    bytes: Vec<u8>,
}

impl Script {
    fn new() -> Script {
        Script { bytes: vec![] }
    }

    fn message(mut self, version: u8, xid: u32, msg: Message) -> Script {
        self.bytes.extend(Message::marshal(version, xid, &msg).unwrap());
        self
    }

    fn raw(mut self, bytes: &[u8]) -> Script {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn features(self, port_names: &[&str]) -> Script {
        self.message(1, 0, Message::FeaturesReply(features(port_names)))
    }

    fn packet_in(self, xid: u32, port: u16, reason: PacketInReason, frame: Vec<u8>) -> Script {
        let pi = PacketIn {
            total_len: frame.len() as u16,
            input_payload: Payload::Buffered(0x100 + xid, frame),
            port,
            reason,
        };
        self.message(1, xid, Message::PacketIn(pi))
    }

    fn run<V: SessionVariant>(self, variant: V) -> (ControllerSession<Duplex, V>, OfpError) {
        self.run_seeded(variant, &[])
    }

    fn run_seeded<V: SessionVariant>(self,
                                     variant: V,
                                     seed: &[([u8; 6], u16)])
                                     -> (ControllerSession<Duplex, V>, OfpError) {
        let stream = Duplex {
            input: Cursor::new(self.bytes),
            output: vec![],
        };
        let mut session = ControllerSession::new(stream, variant);
        for &(mac, port) in seed {
            session.learning_table_mut().learn(&mac, port).unwrap();
        }
        let err = session.run().unwrap_err();
        assert_eq!(session.state(), SessionState::Terminated);
        (session, err)
    }
}

fn features(port_names: &[&str]) -> SwitchFeatures {
    let ports = port_names.iter()
        .enumerate()
        .map(|(i, name)| {
            PortDesc {
                port_no: i as u16 + 1,
                hw_addr: [0x02, 0, 0, 0, 0, i as u8 + 1],
                name: name.to_string(),
                config: PortConfig::empty(),
                state: PortState::empty(),
                curr: PortFeatures::F_1GB_FD | PortFeatures::COPPER,
                advertised: PortFeatures::empty(),
                supported: PortFeatures::F_1GB_FD,
                peer: PortFeatures::empty(),
            }
        })
        .collect();
    SwitchFeatures {
        datapath_id: 0xd0d0,
        num_buffers: 256,
        num_tables: 1,
        supported_capabilities: Capabilities::FLOW_STATS | Capabilities::ARP_MATCH_IP,
        supported_actions: SupportedActions::OUTPUT,
        ports,
    }
}

fn eth(dst: [u8; 6], src: [u8; 6], typ: u16) -> Vec<u8> {
    let mut frame = dst.to_vec();
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&typ.to_be_bytes());
    frame
}

fn ipv4_frame(dst: [u8; 6], src: [u8; 6]) -> Vec<u8> {
    let mut frame = eth(dst, src, 0x0800);
    frame.extend_from_slice(&[0x45, 0, 0, 40, 0, 0, 0, 0, 64, 17, 0, 0]);
    frame.extend_from_slice(&[192, 168, 0, 2, 192, 168, 0, 1]);
    frame.extend_from_slice(&5353u16.to_be_bytes());
    frame.extend_from_slice(&53u16.to_be_bytes());
    frame.resize(60, 0);
    frame
}

fn arp_frame(opcode: u16) -> Vec<u8> {
    let mut frame = eth([0xff; 6], HOST_2, 0x0806);
    frame.extend_from_slice(&[0, 1, 0x08, 0x00, 6, 4]);
    frame.extend_from_slice(&opcode.to_be_bytes());
    frame.extend_from_slice(&HOST_2);
    frame.extend_from_slice(&[192, 168, 0, 2]);
    frame.extend_from_slice(&[0; 6]);
    frame.extend_from_slice(&[192, 168, 0, 1]);
    frame.resize(60, 0);
    frame
}

/// Everything the session wrote after its hello and features request.
fn replies<V: SessionVariant>(session: &ControllerSession<Duplex, V>)
                              -> Vec<(OfpHeader, Message)> {
    let mut rest = &session.stream().output[..];
    let mut msgs = vec![];
    while !rest.is_empty() {
        let (header, msg) = decode_message(rest).unwrap();
        rest = &rest[header.length()..];
        msgs.push((header, msg));
    }
    assert_eq!(msgs[0].1, Message::Hello);
    assert_eq!(msgs[1].1, Message::FeaturesReq);
    msgs.split_off(2)
}

#[test]
fn handshake_and_features() {
    let (session, err) = Script::new().features(&["eth1", "tapdevice"]).run(LearningSwitch);
    assert!(err.is_fatal());
    let feats = session.features().unwrap();
    assert_eq!(feats.datapath_id, 0xd0d0);
    assert_eq!(feats.ports.len(), 2);
    assert_eq!(feats.ports[1].name, "tapdevice");
    assert!(replies(&session).is_empty());
}

#[test]
fn later_features_reply_replaces_ports() {
    let (session, _) = Script::new()
        .features(&["eth1", "eth2", "eth3"])
        .features(&["eth9"])
        .run(LearningSwitch);
    let feats = session.features().unwrap();
    assert_eq!(feats.ports.len(), 1);
    assert_eq!(feats.ports[0].name, "eth9");
}

#[test]
fn echo_request_is_answered() {
    let (session, _) = Script::new()
        .message(1, 0x99, Message::EchoRequest(vec![7, 7, 7]))
        .run(LearningSwitch);
    let replies = replies(&session);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0.xid(), 0x99);
    assert_eq!(replies[0].0.length(), 11);
    assert_eq!(replies[0].1, Message::EchoReply(vec![7, 7, 7]));
}

#[test]
fn hello_negotiates_version_down() {
    let (session, _) = Script::new()
        .message(0, 1, Message::Hello)
        .features(&["eth1"])
        .packet_in(TEST_XID, 1, PacketInReason::NoMatch, ipv4_frame(HOST_1, HOST_2))
        .run(LearningSwitch);
    assert_eq!(session.version(), 0);
    let replies = replies(&session);
    assert_eq!(replies[0].0.version(), 0);

    let (session, _) = Script::new().message(5, 1, Message::Hello).run(LearningSwitch);
    assert_eq!(session.version(), 1);
}

#[test]
fn learned_destination_installs_flow() {
    let (session, _) = Script::new()
        .features(&["eth1", "eth2", "eth3"])
        .packet_in(TEST_XID, 1, PacketInReason::NoMatch, ipv4_frame(HOST_1, HOST_2))
        .run_seeded(LearningSwitch, &[(HOST_1, 3)]);

    let table = session.learning_table();
    assert_eq!(table.lookup(&HOST_2).unwrap(), PseudoPort::PhysicalPort(1));
    assert_eq!(table.len(), 2);

    let replies = replies(&session);
    assert_eq!(replies.len(), 1);
    let (header, msg) = &replies[0];
    assert_eq!(header.type_code().unwrap(), MsgCode::FlowMod);
    assert_eq!(header.xid(), TEST_XID);
    match msg {
        Message::FlowMod(fm) => {
            assert_eq!(fm.command, FlowModCmd::AddFlow);
            assert_eq!(fm.priority, 9);
            assert_eq!(fm.cookie, 9);
            assert_eq!(fm.idle_timeout, Timeout::ExpiresAfter(60));
            assert_eq!(fm.hard_timeout, Timeout::Permanent);
            assert_eq!(fm.out_port, Some(PseudoPort::PhysicalPort(3)));
            assert_eq!(fm.apply_to_packet, Some(0x100 + TEST_XID));
            assert_eq!(fm.actions, vec![Action::Output(PseudoPort::PhysicalPort(3))]);
            assert_eq!(fm.pattern.dl_src, HOST_2);
            assert_eq!(fm.pattern.dl_dst, HOST_1);
            assert_eq!(fm.pattern.in_port, 1);
        }
        other => panic!("expected a flow mod, got {:?}", other),
    }
}

#[test]
fn unknown_destination_floods() {
    let (session, _) = Script::new()
        .features(&["eth1"])
        .packet_in(TEST_XID, 1, PacketInReason::NoMatch, ipv4_frame(HOST_1, HOST_2))
        .run(LearningSwitch);
    assert_eq!(session.learning_table().lookup(&HOST_2).unwrap(),
               PseudoPort::PhysicalPort(1));
    match &replies(&session)[..] {
        [(_, Message::FlowMod(fm))] => {
            assert_eq!(fm.actions, vec![Action::Output(PseudoPort::Flood)])
        }
        other => panic!("expected one flow mod, got {:?}", other),
    }
}

#[test]
fn arp_request_floods_packet() {
    let (session, _) = Script::new()
        .features(&["eth1"])
        .packet_in(TEST_XID, 2, PacketInReason::NoMatch, arp_frame(1))
        .run(LearningSwitch);
    match &replies(&session)[..] {
        [(header, Message::PacketOut(po))] => {
            assert_eq!(header.xid(), TEST_XID);
            assert_eq!(header.length(), 24);
            assert_eq!(po.output_payload.buffer_id(), 0x100 + TEST_XID);
            assert_eq!(po.port_id, Some(2));
            assert_eq!(po.apply_actions, vec![Action::Output(PseudoPort::Flood)]);
        }
        other => panic!("expected one packet out, got {:?}", other),
    }
}

#[test]
fn arp_reply_installs_flow() {
    let (session, _) = Script::new()
        .features(&["eth1"])
        .packet_in(TEST_XID, 2, PacketInReason::NoMatch, arp_frame(2))
        .run(LearningSwitch);
    match &replies(&session)[..] {
        [(_, Message::FlowMod(fm))] => assert_eq!(fm.priority, 9),
        other => panic!("expected one flow mod, got {:?}", other),
    }
}

#[test]
fn unknown_ether_type_floods_without_learning() {
    let mut lldp = eth([0x01, 0x80, 0xc2, 0, 0, 0x0e], HOST_2, 0x88cc);
    lldp.resize(60, 0);
    let (session, _) = Script::new()
        .features(&["eth1"])
        .packet_in(TEST_XID, 1, PacketInReason::NoMatch, lldp)
        .run(LearningSwitch);
    assert!(session.learning_table().is_empty());
    match &replies(&session)[..] {
        [(_, Message::PacketOut(po))] => {
            assert_eq!(po.apply_actions, vec![Action::Output(PseudoPort::Flood)])
        }
        other => panic!("expected one packet out, got {:?}", other),
    }
}

#[test]
fn truncated_packet_in_is_dropped() {
    let (session, err) = Script::new()
        .features(&["eth1"])
        .packet_in(1, 1, PacketInReason::NoMatch, vec![0; 8])
        .packet_in(2, 2, PacketInReason::NoMatch, arp_frame(1))
        .run(LearningSwitch);
    match err {
        OfpError::TransportFailure { .. } => {}
        other => panic!("expected a transport failure, got {:?}", other),
    }
    let replies = replies(&session);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0.xid(), 2);
}

#[test]
fn switch_error_terminates() {
    let (session, err) = Script::new()
        .features(&["eth1"])
        .raw(&[1, 1, 0, 12, 0, 0, 0, 9, 0, 3, 0, 1])
        .packet_in(TEST_XID, 2, PacketInReason::NoMatch, arp_frame(1))
        .run(LearningSwitch);
    match err {
        OfpError::ProtocolViolation { .. } => {}
        other => panic!("expected a protocol violation, got {:?}", other),
    }
    assert!(replies(&session).is_empty());
}

#[test]
fn unknown_message_type_terminates() {
    let (_, err) = Script::new()
        .raw(&[1, 0x40, 0, 8, 0, 0, 0, 1])
        .message(1, 2, Message::EchoRequest(vec![]))
        .run(LearningSwitch);
    match err {
        OfpError::ProtocolViolation { .. } => {}
        other => panic!("expected a protocol violation, got {:?}", other),
    }
}

#[test]
fn unmodeled_messages_are_ignored() {
    let (session, err) = Script::new()
        .raw(&[1, MsgCode::BarrierResp as u8, 0, 8, 0, 0, 0, 1])
        .features(&["eth1"])
        .run(LearningSwitch);
    assert!(matches!(err, OfpError::TransportFailure { .. }));
    assert!(session.features().is_some());
}

fn assert_injected(session_replies: &[(OfpHeader, Message)], port: u16, frame: &[u8]) {
    let injected: Vec<_> = session_replies.iter()
        .filter_map(|(_, msg)| match msg {
            Message::PacketOut(po) if po.port_id.is_none() => Some(po),
            _ => None,
        })
        .collect();
    assert_eq!(injected.len(), 1);
    let po = injected[0];
    assert_eq!(po.output_payload.buffer_id(), NO_BUFFER);
    assert_eq!(po.output_payload.data(), frame);
    assert_eq!(po.apply_actions, vec![Action::Output(PseudoPort::PhysicalPort(port))]);
}

#[test]
fn queue_bridge_moves_captured_frames() {
    let (capturing, injecting) = QueueBridge::pair(16, DEFAULT_TAP_NAME);
    let captured = ipv4_frame(HOST_1, HOST_2);

    let (_, _) = Script::new()
        .features(&["eth1"])
        .packet_in(1, 1, PacketInReason::NoMatch, ipv4_frame(HOST_2, HOST_1))
        .packet_in(2, 1, PacketInReason::ExplicitSend, captured.clone())
        .run(capturing);

    let (session, _) = Script::new()
        .features(&["eth1", "eth2", "tapdevice"])
        .packet_in(7, 1, PacketInReason::NoMatch, arp_frame(1))
        .packet_in(8, 1, PacketInReason::NoMatch, arp_frame(1))
        .run(injecting);
    assert_eq!(session.variant().tap_port(), Some(3));
    let replies = replies(&session);
    assert_eq!(replies.len(), 3);
    assert_injected(&replies, 3, &captured);
}

#[test]
fn ipc_bridge_moves_captured_frames() {
    let path = std::env::temp_dir()
        .join(format!("rust_ofp_bridge_session_{}.sock", std::process::id()));
    let injecting = IpcBridge::inject(&path, DEFAULT_TAP_NAME).unwrap();
    let capturing = IpcBridge::capture(&path).unwrap();
    let captured = arp_frame(2);

    let (_, _) = Script::new()
        .features(&["eth1"])
        .packet_in(1, 1, PacketInReason::ExplicitSend, captured.clone())
        .run(capturing);

    let (session, _) = Script::new()
        .features(&["tapdevice"])
        .packet_in(3, 1, PacketInReason::NoMatch, arp_frame(1))
        .run(injecting);
    assert_injected(&replies(&session), 1, &captured);
    let _ = std::fs::remove_file(&path);
}
