use std::convert::TryFrom;
use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::ofp_message::OfpError;
use crate::openflow0x01::MsgCode;

pub const OFP_HEADER_LENGTH: usize = 8;

pub type Xid = u32;

pub const OPENFLOW_0_01_VERSION: u8 = 1; // 1.0

/// OpenFlow Header
///
/// The first fields of every OpenFlow message, no matter the protocol version.
/// This is parsed to determine version and length of the remaining message, so that
/// it can be properly handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfpHeader {
    version: u8,
    typ: u8,
    length: u16,
    xid: u32,
}

impl OfpHeader {
    /// Create an `OfpHeader` out of the arguments.
    pub fn new(version: u8, typ: u8, length: u16, xid: u32) -> OfpHeader {
        OfpHeader {
            version,
            typ,
            length,
            xid,
        }
    }

    /// Return the byte-size of an `OfpHeader`.
    pub fn size() -> usize {
        OFP_HEADER_LENGTH
    }

    /// Fills a message buffer with the header fields of an `OfpHeader`.
    pub fn marshal(bytes: &mut Vec<u8>, header: OfpHeader) -> Result<(), OfpError> {
        bytes.write_u8(header.version)?;
        bytes.write_u8(header.typ)?;
        bytes.write_u16::<BigEndian>(header.length)?;
        bytes.write_u32::<BigEndian>(header.xid)?;
        Ok(())
    }

    /// Takes a message buffer (at least `OFP_HEADER_LENGTH` long) and returns an `OfpHeader`.
    pub fn parse(buf: &[u8]) -> Result<Self, OfpError> {
        if buf.len() < OFP_HEADER_LENGTH {
            return Err(OfpError::truncated("header", OFP_HEADER_LENGTH, buf.len()));
        }
        let mut bytes = Cursor::new(buf);
        Ok(OfpHeader {
            version: bytes.read_u8()?,
            typ: bytes.read_u8()?,
            length: bytes.read_u16::<BigEndian>()?,
            xid: bytes.read_u32::<BigEndian>()?,
        })
    }

    /// Return the `version` field of a header.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Return the raw type byte of a header.
    pub fn type_byte(&self) -> u8 {
        self.typ
    }

    /// Return the OpenFlow message type code of a header. A type byte outside the
    /// OpenFlow 1.0 range is a protocol violation.
    pub fn type_code(&self) -> Result<MsgCode, OfpError> {
        MsgCode::try_from(self.typ)
    }

    /// Return the `length` field of a header. Includes the length of the header itself.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Return the number of body bytes following the header.
    pub fn body_length(&self) -> usize {
        self.length().saturating_sub(OFP_HEADER_LENGTH)
    }

    /// Return the `xid` field of a header, the transaction id associated with this packet.
    ///  Replies use the same id to facilitate pairing.
    pub fn xid(&self) -> u32 {
        self.xid
    }
}

/// Decode the fixed 8-byte header at the front of `buf`.
pub fn decode_header(buf: &[u8]) -> Result<OfpHeader, OfpError> {
    OfpHeader::parse(buf)
}
