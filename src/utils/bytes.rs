use crate::types::error::{DatabaseError, Result};

fn take<'a>(bytes: &'a [u8], offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    bytes
        .get(offset..offset + len)
        .ok_or_else(|| DatabaseError::SerializationError {
            details: format!("Insufficient bytes for {} at offset {}", what, offset),
        })
}

pub fn read_u16_le(bytes: &[u8], offset: usize, what: &str) -> Result<u16> {
    let raw = take(bytes, offset, 2, what)?;
    Ok(u16::from_le_bytes([raw[0], raw[1]]))
}

pub fn read_u32_le(bytes: &[u8], offset: usize, what: &str) -> Result<u32> {
    let raw = take(bytes, offset, 4, what)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

pub fn read_u64_le(bytes: &[u8], offset: usize, what: &str) -> Result<u64> {
    let raw = take(bytes, offset, 8, what)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(raw);
    Ok(u64::from_le_bytes(buf))
}

pub fn read_i64_le(bytes: &[u8], offset: usize, what: &str) -> Result<i64> {
    read_u64_le(bytes, offset, what).map(|v| v as i64)
}

pub fn read_slice<'a>(bytes: &'a [u8], offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    take(bytes, offset, len, what)
}
