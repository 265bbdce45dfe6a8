use std::{
    ffi::OsString,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    types::{
        HEADER_SIZE, PAGE_SIZE, PageId, Version,
        error::{DatabaseError, Result},
    },
    utils::{
        bytes::{read_u32_le, read_u64_le},
        hash::checksum_of_parts,
    },
};

pub const WAL_MAGIC: &[u8; 8] = b"CFRWAL01";
pub const WAL_HDR_SIZE: usize = 16; // magic8 + reserved u64

// Record header: type(1) | reserved(3) | version(8) | page_count(4) | payload_len(4) | crc32(4)
pub const WAL_REC_HDR_SIZE: usize = 24;
const WAL_REC_OFF_VERSION: usize = 4;
const WAL_REC_OFF_PAGE_COUNT: usize = 12;
const WAL_REC_OFF_LEN: usize = 16;
const WAL_REC_OFF_CRC32: usize = 20;

pub const WAL_REC_COMMIT: u8 = 1;

const WAL_PAGE_ENTRY_SIZE: usize = 8 + PAGE_SIZE;

/// The write-ahead log sits next to the backing file as `<file>-wal`.
pub fn wal_path(db_path: &Path) -> PathBuf {
    let mut name = OsString::from(db_path.as_os_str());
    name.push("-wal");
    PathBuf::from(name)
}

/// Everything one commit changes: the new header image and every page image.
#[derive(Debug, Clone, PartialEq)]
pub struct WalCommit {
    pub version: Version,
    pub header: Vec<u8>,
    pub pages: Vec<(PageId, Vec<u8>)>,
}

impl WalCommit {
    fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(HEADER_SIZE + self.pages.len() * WAL_PAGE_ENTRY_SIZE);
        payload.extend_from_slice(&self.header);
        for (page_id, image) in &self.pages {
            payload.extend_from_slice(&page_id.to_le_bytes());
            payload.extend_from_slice(image);
        }
        payload
    }

    fn encode(&self) -> Result<Vec<u8>> {
        if self.header.len() != HEADER_SIZE {
            return Err(DatabaseError::InvalidHeader {
                reason: format!("Header image of {} bytes", self.header.len()),
            });
        }
        if let Some((page_id, image)) = self.pages.iter().find(|(_, image)| image.len() != PAGE_SIZE) {
            return Err(DatabaseError::CorruptPage {
                page_id: *page_id,
                reason: format!("Page image of {} bytes", image.len()),
            });
        }

        let payload = self.payload();
        let mut record = vec![0u8; WAL_REC_HDR_SIZE];
        record[0] = WAL_REC_COMMIT;
        record[WAL_REC_OFF_VERSION..WAL_REC_OFF_VERSION + 8]
            .copy_from_slice(&self.version.to_le_bytes());
        record[WAL_REC_OFF_PAGE_COUNT..WAL_REC_OFF_PAGE_COUNT + 4]
            .copy_from_slice(&(self.pages.len() as u32).to_le_bytes());
        record[WAL_REC_OFF_LEN..WAL_REC_OFF_LEN + 4]
            .copy_from_slice(&(payload.len() as u32).to_le_bytes());
        let crc = checksum_of_parts(&[&record[..WAL_REC_OFF_CRC32], &payload]);
        record[WAL_REC_OFF_CRC32..].copy_from_slice(&crc.to_le_bytes());

        record.extend_from_slice(&payload);
        Ok(record)
    }

    /// None for anything short, torn or failing its CRC.
    fn decode(bytes: &[u8]) -> Result<Option<Self>> {
        if bytes.len() < WAL_REC_HDR_SIZE || bytes[0] != WAL_REC_COMMIT {
            return Ok(None);
        }

        let version = read_u64_le(bytes, WAL_REC_OFF_VERSION, "WAL version")?;
        let page_count = read_u32_le(bytes, WAL_REC_OFF_PAGE_COUNT, "WAL page count")? as usize;
        let payload_len = read_u32_le(bytes, WAL_REC_OFF_LEN, "WAL payload length")? as usize;
        let stored_crc = read_u32_le(bytes, WAL_REC_OFF_CRC32, "WAL crc")?;

        let Some(payload) = bytes.get(WAL_REC_HDR_SIZE..WAL_REC_HDR_SIZE + payload_len) else {
            return Ok(None);
        };
        if checksum_of_parts(&[&bytes[..WAL_REC_OFF_CRC32], payload]) != stored_crc {
            return Ok(None);
        }
        if payload_len != HEADER_SIZE + page_count * WAL_PAGE_ENTRY_SIZE {
            return Ok(None);
        }

        let header = payload[..HEADER_SIZE].to_vec();
        let mut pages = Vec::with_capacity(page_count);
        let mut offset = HEADER_SIZE;
        for _ in 0..page_count {
            let page_id = read_u64_le(payload, offset, "WAL page id")?;
            offset += 8;
            pages.push((page_id, payload[offset..offset + PAGE_SIZE].to_vec()));
            offset += PAGE_SIZE;
        }

        Ok(Some(Self {
            version,
            header,
            pages,
        }))
    }
}

/// Holds at most one commit record: it is appended before the backing file is
/// touched and cleared once the backing file holds the same state.
pub struct Wal {
    path: PathBuf,
    file: File,
}

impl Wal {
    pub fn open(db_path: &Path) -> Result<Self> {
        let path = wal_path(db_path);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let len = file.metadata()?.len();
        if len < WAL_HDR_SIZE as u64 {
            Self::write_file_header(&mut file)?;
        } else {
            let mut header = [0u8; WAL_HDR_SIZE];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut header)?;
            if &header[..8] != WAL_MAGIC {
                return Err(DatabaseError::InvalidHeader {
                    reason: format!("Bad WAL magic in {}", path.display()),
                });
            }
        }

        Ok(Self { path, file })
    }

    fn write_file_header(file: &mut File) -> Result<()> {
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(WAL_MAGIC)?;
        file.write_all(&0u64.to_le_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `commit` as the only record. Once this returns with `sync` set,
    /// the commit survives a crash.
    pub fn append_commit(&mut self, commit: &WalCommit, sync: bool) -> Result<()> {
        let record = commit.encode()?;
        self.file.set_len(WAL_HDR_SIZE as u64)?;
        self.file.seek(SeekFrom::Start(WAL_HDR_SIZE as u64))?;
        self.file.write_all(&record)?;
        if sync {
            self.file.sync_data()?;
        }
        debug!(
            "WAL commit record: version={} pages={} bytes={}",
            commit.version,
            commit.pages.len(),
            record.len()
        );
        Ok(())
    }

    /// The complete, CRC-valid commit record if there is one. A torn tail is
    /// reported as None.
    pub fn read_commit(&mut self) -> Result<Option<WalCommit>> {
        let len = self.file.metadata()?.len() as usize;
        if len <= WAL_HDR_SIZE {
            return Ok(None);
        }

        let mut bytes = vec![0u8; len - WAL_HDR_SIZE];
        self.file.seek(SeekFrom::Start(WAL_HDR_SIZE as u64))?;
        self.file.read_exact(&mut bytes)?;

        let commit = WalCommit::decode(&bytes)?;
        if commit.is_none() {
            warn!(
                "Ignoring incomplete WAL record ({} bytes) in {}",
                bytes.len(),
                self.path.display()
            );
        }
        Ok(commit)
    }

    pub fn reset(&mut self, sync: bool) -> Result<()> {
        self.file.set_len(WAL_HDR_SIZE as u64)?;
        if sync {
            self.file.sync_data()?;
        }
        Ok(())
    }
}
