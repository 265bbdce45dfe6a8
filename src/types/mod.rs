pub mod entry;
pub mod error;
pub mod page;
pub mod record;
pub mod value;

// Common type aliases
pub type PageId = u64;
pub type SlotId = u16;
pub type Version = u64;

pub const PAGE_SIZE: usize = 4096;
pub const MAX_PAGE_COUNT: u64 = 1099511627775; // 2^40 - 1
pub const HEADER_SIZE: usize = 100; // Store header size
pub const PAGE_HEADER_SIZE: usize = 32; // Per-page header

pub const SLOT_DIRECTORY_ENTRY_SIZE: usize = 4; // offset (2 bytes) + length (2 bytes)
pub const CHECKSUM_SIZE: usize = 4; // CRC32 checksum size

/// Largest cell a single page can hold.
pub const MAX_CELL_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE - SLOT_DIRECTORY_ENTRY_SIZE;

/// Upper bound for an encoded text primary key.
pub const MAX_KEY_SIZE: usize = 512;
