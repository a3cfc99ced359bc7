//! Session variants that carry frames captured on one switch to another switch.
//!
//! Both bridges inject into the port named after the tap device; the port is looked
//! up again on every features reply.

use std::fs;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};

use log::{debug, info, warn};

use crate::ofp_controller::{Injection, SessionVariant};
use crate::openflow0x01::SwitchFeatures;

pub const DEFAULT_TAP_NAME: &str = "tapdevice";
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const IPC_BUFFER_SIZE: usize = 65535;

#[derive(Debug, Clone)]
struct TapPort {
    name: String,
    port: Option<u16>,
}

impl TapPort {
    fn new(name: &str) -> TapPort {
        TapPort {
            name: name.to_string(),
            port: None,
        }
    }

    fn update(&mut self, feats: &SwitchFeatures) {
        self.port = feats.port_named(&self.name).map(|p| p.port_no);
        match self.port {
            Some(p) => info!("Tap device {} is port {}", self.name, p),
            None => warn!("Switch has no port named {}, nothing will be injected", self.name),
        }
    }
}

/// Bridges two sessions in one process through a bounded channel.
///
/// Captured frames are dropped when the channel is full, so neither session ever
/// blocks on the other.
pub struct QueueBridge {
    outbound: Option<SyncSender<Vec<u8>>>,
    inbound: Option<Receiver<Vec<u8>>>,
    tap: TapPort,
}

impl QueueBridge {
    pub fn new(outbound: Option<SyncSender<Vec<u8>>>,
               inbound: Option<Receiver<Vec<u8>>>,
               tap_name: &str)
               -> QueueBridge {
        QueueBridge {
            outbound,
            inbound,
            tap: TapPort::new(tap_name),
        }
    }

    /// A capturing bridge and the injecting bridge it feeds, sharing a channel of
    /// `capacity` frames.
    pub fn pair(capacity: usize, tap_name: &str) -> (QueueBridge, QueueBridge) {
        let (tx, rx) = sync_channel(capacity);
        (QueueBridge::new(Some(tx), None, tap_name), QueueBridge::new(None, Some(rx), tap_name))
    }

    pub fn tap_port(&self) -> Option<u16> {
        self.tap.port
    }
}

impl SessionVariant for QueueBridge {
    fn on_features_known(&mut self, feats: &SwitchFeatures) {
        if self.inbound.is_some() {
            self.tap.update(feats);
        }
    }

    fn on_capture(&mut self, frame: &[u8]) {
        let tx = match self.outbound {
            Some(ref tx) => tx,
            None => return,
        };
        match tx.try_send(frame.to_vec()) {
            Ok(()) => debug!("Queued {} byte frame", frame.len()),
            Err(TrySendError::Full(_)) => warn!("Bridge queue full, dropping {} byte frame", frame.len()),
            Err(TrySendError::Disconnected(_)) => warn!("Bridge peer is gone, dropping frame"),
        }
    }

    fn on_inject_opportunity(&mut self) -> Option<Injection> {
        let port = self.tap.port?;
        let rx = self.inbound.as_ref()?;
        match rx.try_recv() {
            Ok(frame) => Some(Injection { port, frame }),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                debug!("Bridge queue closed");
                None
            }
        }
    }
}

enum IpcRole {
    Capture(PathBuf),
    Inject,
}

/// Bridges sessions in two processes through a Unix datagram socket.
pub struct IpcBridge {
    socket: UnixDatagram,
    role: IpcRole,
    tap: TapPort,
    buf: Vec<u8>,
}

impl IpcBridge {
    /// Capturing side: sends every captured frame to the socket bound at `path`.
    /// Frames the peer has no room for are dropped.
    pub fn capture<P: AsRef<Path>>(path: P) -> io::Result<IpcBridge> {
        let socket = UnixDatagram::unbound()?;
        socket.set_nonblocking(true)?;
        Ok(IpcBridge {
            socket,
            role: IpcRole::Capture(path.as_ref().to_path_buf()),
            tap: TapPort::new(DEFAULT_TAP_NAME),
            buf: vec![],
        })
    }

    /// Injecting side: binds `path`, replacing a stale socket file.
    pub fn inject<P: AsRef<Path>>(path: P, tap_name: &str) -> io::Result<IpcBridge> {
        if let Err(e) = fs::remove_file(path.as_ref()) {
            if e.kind() != io::ErrorKind::NotFound {
                return Err(e);
            }
        }
        let socket = UnixDatagram::bind(path.as_ref())?;
        socket.set_nonblocking(true)?;
        Ok(IpcBridge {
            socket,
            role: IpcRole::Inject,
            tap: TapPort::new(tap_name),
            buf: vec![0; IPC_BUFFER_SIZE],
        })
    }

    pub fn tap_port(&self) -> Option<u16> {
        self.tap.port
    }
}

impl SessionVariant for IpcBridge {
    fn on_features_known(&mut self, feats: &SwitchFeatures) {
        if let IpcRole::Inject = self.role {
            self.tap.update(feats);
        }
    }

    fn on_capture(&mut self, frame: &[u8]) {
        if let IpcRole::Capture(ref path) = self.role {
            match self.socket.send_to(frame, path) {
                Ok(n) => debug!("Sent {} byte frame to {}", n, path.display()),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    warn!("Bridge socket {} full, dropping {} byte frame",
                          path.display(),
                          frame.len())
                }
                Err(e) => warn!("Could not send frame to {}: {}", path.display(), e),
            }
        }
    }

    fn on_inject_opportunity(&mut self) -> Option<Injection> {
        if let IpcRole::Capture(_) = self.role {
            return None;
        }
        let port = self.tap.port?;
        match self.socket.recv(&mut self.buf) {
            Ok(n) => {
                Some(Injection {
                    port,
                    frame: self.buf[..n].to_vec(),
                })
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                warn!("Could not read from bridge socket: {}", e);
                None
            }
        }
    }
}
