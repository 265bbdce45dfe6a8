use crate::{
    storage::{COFFER_MAGIC, FORMAT_VERSION},
    types::{
        HEADER_SIZE, PAGE_SIZE, PageId, Version,
        error::{DatabaseError, Result},
    },
    utils::hash::checksum_of_parts,
};

const HEADER_CHECKSUM_OFFSET: usize = HEADER_SIZE - 4;

/// File header stored in the first `HEADER_SIZE` bytes of the backing file.
/// Page id 0 means "none" in the pointer fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHeader {
    pub magic: [u8; 16],
    pub page_size: u16,
    pub file_format_write_version: u8,
    pub file_format_read_version: u8,
    pub commit_version: Version,
    pub page_count: u64,
    pub freelist_head: PageId,
    pub freelist_count: u64,
    pub catalog_root: PageId,
    pub type_count: u32,
}

impl Default for StoreHeader {
    fn default() -> Self {
        Self {
            magic: *COFFER_MAGIC,
            page_size: PAGE_SIZE as u16,
            file_format_write_version: FORMAT_VERSION,
            file_format_read_version: FORMAT_VERSION,
            commit_version: 0,
            page_count: 0,
            freelist_head: 0,
            freelist_count: 0,
            catalog_root: 0,
            type_count: 0,
        }
    }
}

impl StoreHeader {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE);

        buffer.extend_from_slice(&self.magic);
        buffer.extend_from_slice(&self.page_size.to_be_bytes());
        buffer.push(self.file_format_write_version);
        buffer.push(self.file_format_read_version);
        buffer.extend_from_slice(&self.commit_version.to_be_bytes());
        buffer.extend_from_slice(&self.page_count.to_be_bytes());
        buffer.extend_from_slice(&self.freelist_head.to_be_bytes());
        buffer.extend_from_slice(&self.freelist_count.to_be_bytes());
        buffer.extend_from_slice(&self.catalog_root.to_be_bytes());
        buffer.extend_from_slice(&self.type_count.to_be_bytes());

        buffer.resize(HEADER_SIZE, 0);
        let checksum = checksum_of_parts(&[&buffer[..HEADER_CHECKSUM_OFFSET]]);
        buffer[HEADER_CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_be_bytes());
        buffer
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DatabaseError::InvalidHeader {
                reason: "Header too short".to_string(),
            });
        }

        let mut magic = [0u8; 16];
        magic.copy_from_slice(&bytes[0..16]);
        if &magic != COFFER_MAGIC {
            return Err(DatabaseError::InvalidHeader {
                reason: "Invalid coffer magic number".to_string(),
            });
        }

        let stored = u32::from_be_bytes(be_array(bytes, HEADER_CHECKSUM_OFFSET));
        if checksum_of_parts(&[&bytes[..HEADER_CHECKSUM_OFFSET]]) != stored {
            return Err(DatabaseError::InvalidHeader {
                reason: "Header checksum mismatch".to_string(),
            });
        }

        let page_size = u16::from_be_bytes(be_array(bytes, 16));
        if page_size != PAGE_SIZE as u16 {
            return Err(DatabaseError::InvalidHeader {
                reason: format!("Unsupported page size: {}", page_size),
            });
        }

        let file_format_write_version = bytes[18];
        let file_format_read_version = bytes[19];
        if file_format_read_version > FORMAT_VERSION {
            return Err(DatabaseError::InvalidHeader {
                reason: format!("Unsupported file format version {}", file_format_read_version),
            });
        }

        Ok(Self {
            magic,
            page_size,
            file_format_write_version,
            file_format_read_version,
            commit_version: u64::from_be_bytes(be_array(bytes, 20)),
            page_count: u64::from_be_bytes(be_array(bytes, 28)),
            freelist_head: u64::from_be_bytes(be_array(bytes, 36)),
            freelist_count: u64::from_be_bytes(be_array(bytes, 44)),
            catalog_root: u64::from_be_bytes(be_array(bytes, 52)),
            type_count: u32::from_be_bytes(be_array(bytes, 60)),
        })
    }
}

fn be_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[offset..offset + N]);
    buf
}
