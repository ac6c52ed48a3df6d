//! Unsigned LEB128 varints used by the directory encoding

use crate::directory::error::{DirectoryError, Result};

/// Longest valid encoding of a u64
const MAX_VARINT_LEN: usize = 10;

/// Read a varint from `data` at `offset`, advancing the offset
pub fn read_varint(data: &[u8], offset: &mut usize) -> Result<u64> {
    let start = *offset;
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = data.get(*offset) else {
            return Err(DirectoryError::TruncatedVarint(start));
        };
        *offset += 1;

        let value = u64::from(byte & 0x7F);
        if shift == 63 && value > 1 {
            return Err(DirectoryError::VarintOverflow(start));
        }
        result |= value << shift;

        if (byte & 0x80) == 0 {
            return Ok(result);
        }

        shift += 7;
        if *offset - start >= MAX_VARINT_LEN {
            return Err(DirectoryError::VarintOverflow(start));
        }
    }
}

/// Append a varint to `data`
pub fn write_varint(value: u64, data: &mut Vec<u8>) {
    let mut value = value;

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80;
        }

        data.push(byte);

        if value == 0 {
            break;
        }
    }
}
