use std::io;

use thiserror::Error;

use crate::ofp_header::{OfpHeader, Xid};

/// Failures produced while decoding, encoding, or exchanging OpenFlow messages.
///
/// `ProtocolViolation` and `TransportFailure` end the session that produced
/// them. Everything else concerns a single message or packet, which is dropped.
#[derive(Debug, Error)]
pub enum OfpError {
    #[error("Truncated {what}: needed {needed} bytes, got {got}")]
    Truncated {
        what: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("Malformed {what}: {reason}")]
    Malformed {
        what: &'static str,
        reason: String,
    },
    #[error("Invalid match: expected 40 bytes, got {len}")]
    InvalidMatch { len: usize },
    #[error("Unknown ethernet type 0x{eth_type:04x}")]
    UnknownEtherType { eth_type: u16 },
    #[error("Invalid hardware address length {len}")]
    InvalidAddressLength { len: usize },
    #[error("Protocol violation: {reason}")]
    ProtocolViolation { reason: String },
    #[error("Transport failure: {error}")]
    TransportFailure {
        #[source]
        error: io::Error,
    },
}

impl OfpError {
    /// Whether this error terminates the owning session.
    pub fn is_fatal(&self) -> bool {
        match *self {
            OfpError::ProtocolViolation { .. } | OfpError::TransportFailure { .. } => true,
            _ => false,
        }
    }

    pub fn truncated(what: &'static str, needed: usize, got: usize) -> OfpError {
        OfpError::Truncated { what, needed, got }
    }

    pub fn malformed<S: Into<String>>(what: &'static str, reason: S) -> OfpError {
        OfpError::Malformed {
            what,
            reason: reason.into(),
        }
    }

    pub fn violation<S: Into<String>>(reason: S) -> OfpError {
        OfpError::ProtocolViolation {
            reason: reason.into(),
        }
    }

    pub fn transport(error: io::Error) -> OfpError {
        OfpError::TransportFailure { error }
    }
}

/// Reads from an in-memory buffer only fail by running off its end.
impl From<io::Error> for OfpError {
    fn from(error: io::Error) -> OfpError {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => OfpError::Truncated {
                what: "buffer",
                needed: 0,
                got: 0,
            },
            _ => OfpError::transport(error),
        }
    }
}

/// OpenFlow Message
///
/// Version-agnostic API for handling OpenFlow messages at the byte-buffer level.
pub trait OfpMessage: Sized {
    /// Return the byte-size of an `OfpMessage`, header included.
    fn size_of(msg: &Self) -> usize;
    /// Create an `OfpHeader` for the given protocol version, transaction id and message.
    fn header_of(version: u8, xid: Xid, msg: &Self) -> Result<OfpHeader, OfpError>;
    /// Return a marshaled buffer containing an OpenFlow header and the message `msg`.
    fn marshal(version: u8, xid: Xid, msg: &Self) -> Result<Vec<u8>, OfpError>;
    /// Returns a pair `(Xid, OfpMessage)` of the transaction id and OpenFlow message parsed from
    /// the given OpenFlow header `header`, and buffer `buf`.
    fn parse(header: &OfpHeader, buf: &[u8]) -> Result<(Xid, Self), OfpError>;
}
