pub mod catalog;
pub mod freelist;
pub mod header;
pub mod index;
pub mod pager;
pub mod schema;
pub mod table;
pub mod wal;

const COFFER_MAGIC: &[u8; 16] = b"COFFER STORE v1\0";
const FORMAT_VERSION: u8 = 1;
