use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Read};

use byteorder::WriteBytesExt;

use crate::ofp_message::OfpError;

pub fn write_padding_bytes(bytes: &mut Vec<u8>, count: usize) -> Result<(), OfpError> {
    for _ in 0..count {
        bytes.write_u8(0)?;
    }
    Ok(())
}

/// Read a `max_capacity`-byte field holding a NUL-terminated string. The field is
/// always consumed whole; bytes after the first NUL are ignored.
pub fn read_fixed_size_string(bytes: &mut Cursor<&[u8]>,
                              max_capacity: usize)
                              -> Result<String, OfpError> {
    let mut arr = vec![0; max_capacity];
    bytes.read_exact(&mut arr)?;
    let end = arr.iter().position(|&c| c == 0).unwrap_or(max_capacity);
    Ok(String::from_utf8_lossy(&arr[..end]).into_owned())
}

pub fn read_mac(bytes: &mut Cursor<&[u8]>) -> Result<[u8; 6], OfpError> {
    let mut arr = [0; 6];
    bytes.read_exact(&mut arr)?;
    Ok(arr)
}

fn dump_rows<'a, I>(bytes: I, len: usize) -> String
    where I: Iterator<Item = &'a u8>
{
    let mut out = String::with_capacity(len * 3);
    for (i, b) in bytes.enumerate() {
        let _ = write!(out, "{:02X} ", b);
        if i % 8 == 7 && i + 1 != len {
            out.push('\n');
        }
    }
    out
}

/// Render `buf` as rows of eight space-separated hex bytes.
pub fn hex_dump(buf: &[u8]) -> String {
    dump_rows(buf.iter(), buf.len())
}

/// Render a message read as separate header and body as one `hex_dump`.
pub fn hex_dump_message(header: &[u8], body: &[u8]) -> String {
    dump_rows(header.iter().chain(body), header.len() + body.len())
}
