use std::io::{Read, Write};

use log::{debug, error, info, trace, warn};

use crate::learning_switch::{decide, flood, install_flow, Forwarding, LearningTable};
use crate::ofp_header::{OfpHeader, Xid, OFP_HEADER_LENGTH, OPENFLOW_0_01_VERSION};
use crate::ofp_message::{OfpError, OfpMessage};
use crate::ofp_utils::{hex_dump, hex_dump_message};
use crate::openflow0x01::message::Message;
use crate::openflow0x01::{Action, PacketIn, PacketInReason, PacketOut, Payload, PseudoPort,
                          SwitchFeatures};
use crate::packet::{Flow, MacAddr};

/// Lifecycle of one switch connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingFeatures,
    Established,
    Terminated,
}

/// A frame a variant wants sent out of a switch port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub port: u16,
    pub frame: Vec<u8>,
}

/// Hooks through which a deployment shape extends the learning-switch session.
pub trait SessionVariant {
    /// Called with every features-reply, after it has been stored.
    fn on_features_known(&mut self, _feats: &SwitchFeatures) {}
    /// Called with the Ethernet frame of a packet-in the switch sent on purpose.
    fn on_capture(&mut self, _frame: &[u8]) {}
    /// Called after each packet-in has been handled. Must not block.
    fn on_inject_opportunity(&mut self) -> Option<Injection> {
        None
    }
}

/// One OpenFlow 1.0 switch connection, driven synchronously over `stream`.
pub struct ControllerSession<S, V> {
    stream: S,
    variant: V,
    version: u8,
    state: SessionState,
    features: Option<SwitchFeatures>,
    table: LearningTable,
}

impl<S: Read + Write, V: SessionVariant> ControllerSession<S, V> {
    pub fn new(stream: S, variant: V) -> ControllerSession<S, V> {
        ControllerSession {
            stream,
            variant,
            version: OPENFLOW_0_01_VERSION,
            state: SessionState::Connecting,
            features: None,
            table: LearningTable::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Protocol version stamped on outgoing messages.
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn features(&self) -> Option<&SwitchFeatures> {
        self.features.as_ref()
    }

    pub fn learning_table(&self) -> &LearningTable {
        &self.table
    }

    pub fn learning_table_mut(&mut self) -> &mut LearningTable {
        &mut self.table
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn variant_mut(&mut self) -> &mut V {
        &mut self.variant
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Send hello and features request, then wait for the features reply.
    pub fn handshake(&mut self) -> Result<(), OfpError> {
        self.send(0, &Message::Hello)?;
        self.send(0, &Message::FeaturesReq)?;
        self.state = SessionState::AwaitingFeatures;
        Ok(())
    }

    /// Handshake if needed, then handle messages until the session ends. Returns the
    /// error that terminated it.
    pub fn run(&mut self) -> Result<(), OfpError> {
        if self.state == SessionState::Connecting {
            if let Err(e) = self.handshake() {
                return Err(self.terminate(e));
            }
        }
        while self.state != SessionState::Terminated {
            match self.process_next() {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(self.terminate(e)),
                Err(e) => warn!("Dropping message: {}", e),
            }
        }
        Ok(())
    }

    fn terminate(&mut self, e: OfpError) -> OfpError {
        error!("Session terminated: {}", e);
        self.state = SessionState::Terminated;
        e
    }

    /// Read one message from the stream and handle it. A features reply is only
    /// accepted once `handshake` has sent the features request.
    pub fn process_next(&mut self) -> Result<(), OfpError> {
        let (header, body) = self.read_message()?;
        self.dispatch(&header, &body)
    }

    fn read_message(&mut self) -> Result<(OfpHeader, Vec<u8>), OfpError> {
        let mut buf = [0u8; OFP_HEADER_LENGTH];
        self.stream.read_exact(&mut buf).map_err(OfpError::transport)?;
        let header = OfpHeader::parse(&buf)?;
        debug!("Received header: version {} type {} length {} xid {}",
               header.version(),
               header.type_byte(),
               header.length(),
               header.xid());
        if header.length() < OFP_HEADER_LENGTH {
            return Err(OfpError::violation(format!("header length {} is shorter than the header",
                                                   header.length())));
        }
        let mut body = vec![0; header.body_length()];
        self.stream.read_exact(&mut body).map_err(OfpError::transport)?;
        trace!("Read:\n{}", hex_dump_message(&buf, &body));
        Ok((header, body))
    }

    /// Handle one decoded message.
    pub fn dispatch(&mut self, header: &OfpHeader, body: &[u8]) -> Result<(), OfpError> {
        let (xid, msg) = Message::parse(header, body)?;
        match msg {
            Message::Hello => {
                if header.version() < self.version {
                    info!("Switch speaks version {}, downgrading from {}",
                          header.version(),
                          self.version);
                    self.version = header.version();
                }
                Ok(())
            }
            Message::Error(err) => Err(OfpError::violation(format!("switch reported {}", err))),
            Message::EchoRequest(bytes) => self.send(xid, &Message::EchoReply(bytes)),
            Message::FeaturesReply(feats) => {
                if self.state == SessionState::Connecting {
                    warn!("Features reply before features request, dropped");
                    return Ok(());
                }
                self.features_known(feats);
                Ok(())
            }
            Message::PacketIn(pkt) => {
                if self.state != SessionState::Established {
                    warn!("Packet-in before features reply, dropped");
                    return Ok(());
                }
                self.packet_in(xid, pkt)
            }
            msg => {
                debug!("Ignoring {}", Message::msg_code_of_message(&msg));
                Ok(())
            }
        }
    }

    fn features_known(&mut self, feats: SwitchFeatures) {
        if self.state == SessionState::Established {
            info!("Replacing features of switch {:016x}", feats.datapath_id);
        }
        info!("Switch {:016x}: {} buffers, {} tables, capabilities {:?}, actions {:?}",
              feats.datapath_id,
              feats.num_buffers,
              feats.num_tables,
              feats.supported_capabilities,
              feats.supported_actions);
        for port in &feats.ports {
            info!("  port {} {} {} config {:?} state {:?}",
                  port.port_no,
                  port.name,
                  MacAddr(&port.hw_addr),
                  port.config,
                  port.state);
        }
        self.variant.on_features_known(&feats);
        self.features = Some(feats);
        self.state = SessionState::Established;
    }

    fn packet_in(&mut self, xid: Xid, pkt: PacketIn) -> Result<(), OfpError> {
        let flow = match Flow::from_packet_in(xid, &pkt) {
            Ok(flow) => Some(flow),
            Err(OfpError::UnknownEtherType { eth_type }) => {
                warn!("Unknown ethernet type 0x{:04x} on port {}", eth_type, pkt.port);
                None
            }
            Err(e) => return Err(e),
        };
        if let Some(ref flow) = flow {
            debug!("{}", flow);
            self.table.learn(&flow.dl_src, flow.in_port)?;
            debug!("{}", self.table);
        }
        if pkt.reason == PacketInReason::ExplicitSend {
            self.variant.on_capture(pkt.input_payload.data());
        }
        let decision = match flow {
            Some(ref flow) => decide(flow, &self.table)?,
            None => Forwarding::FloodUnknown,
        };
        match (decision, flow) {
            (Forwarding::Install(port), Some(ref flow)) => {
                self.send(xid, &Message::FlowMod(install_flow(flow, port)))?
            }
            (Forwarding::Flood, _) => self.send(xid, &Message::PacketOut(flood(&pkt)))?,
            (_, _) => {
                warn!("No policy for packet from port {}, flooding", pkt.port);
                self.send(xid, &Message::PacketOut(flood(&pkt)))?
            }
        }
        self.inject()
    }

    fn inject(&mut self) -> Result<(), OfpError> {
        if let Some(injection) = self.variant.on_inject_opportunity() {
            debug!("Injecting {} bytes out of port {}", injection.frame.len(), injection.port);
            let pkt = PacketOut {
                output_payload: Payload::NotBuffered(injection.frame),
                port_id: None,
                apply_actions: vec![Action::Output(PseudoPort::PhysicalPort(injection.port))],
            };
            self.send(0, &Message::PacketOut(pkt))?;
        }
        Ok(())
    }

    /// Marshal `msg` with the negotiated version and write it to the switch.
    pub fn send(&mut self, xid: Xid, msg: &Message) -> Result<(), OfpError> {
        let raw_msg = Message::marshal(self.version, xid, msg)?;
        trace!("Write {}:\n{}", Message::msg_code_of_message(msg), hex_dump(&raw_msg));
        self.stream.write_all(&raw_msg).map_err(OfpError::transport)?;
        self.stream.flush().map_err(OfpError::transport)
    }
}
