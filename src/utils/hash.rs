use crc32fast::Hasher;

use crate::types::{CHECKSUM_SIZE, PAGE_SIZE};

/// Byte offset of the checksum field inside the page header.
pub const PAGE_CHECKSUM_OFFSET: usize = 21;

/// CRC32 over a serialized page, skipping the checksum field itself.
pub fn calculate_page_checksum(page_bytes: &[u8]) -> u32 {
    debug_assert_eq!(page_bytes.len(), PAGE_SIZE);
    let mut hasher = Hasher::new();
    hasher.update(&page_bytes[..PAGE_CHECKSUM_OFFSET]);
    hasher.update(&page_bytes[PAGE_CHECKSUM_OFFSET + CHECKSUM_SIZE..]);
    hasher.finalize()
}

pub fn verify_page_checksum(page_bytes: &[u8], expected_checksum: u32) -> bool {
    calculate_page_checksum(page_bytes) == expected_checksum
}

/// CRC32 over several byte ranges, in order.
pub fn checksum_of_parts(parts: &[&[u8]]) -> u32 {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}
