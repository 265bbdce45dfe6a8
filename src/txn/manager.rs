use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, TryLockError},
};

use log::{debug, info, warn};

use crate::{
    config::{StoreConfig, WritePolicy},
    storage::{
        freelist::FreeList,
        header::StoreHeader,
        pager::Pager,
        wal::{Wal, WalCommit},
    },
    txn::{read::ReadTransaction, snapshot::Snapshot, transaction::WriteTransaction},
    types::{
        HEADER_SIZE, PAGE_SIZE, Version,
        error::{DatabaseError, Result},
    },
};

/// State only the single writer touches.
pub(crate) struct WriterState {
    pub(crate) pager: Pager,
    pub(crate) wal: Wal,
    pub(crate) freelist: FreeList,
    pub(crate) page_count: u64,
    /// Set when a commit failed after its WAL record became durable. The
    /// backing file may then lag the log, so writes stay refused until reopen.
    pub(crate) failure: Option<(io::ErrorKind, String)>,
}

impl WriterState {
    pub(crate) fn check_usable(&self) -> Result<()> {
        match &self.failure {
            Some((kind, message)) => Err(DatabaseError::Io(io::Error::new(*kind, message.clone()))),
            None => Ok(()),
        }
    }

    /// Applies a durable commit record to the backing file.
    pub(crate) fn apply(&mut self, commit: &WalCommit, sync: bool) -> Result<()> {
        for (page_id, image) in &commit.pages {
            self.pager.write_page_bytes(*page_id, image)?;
        }
        self.pager.write_header_bytes(&commit.header)?;
        if sync {
            self.pager.sync()?;
        }
        self.wal.reset(sync)
    }
}

struct SharedState {
    current: Arc<Snapshot>,
    /// Live readers per snapshot version.
    readers: BTreeMap<Version, usize>,
}

/// Coordinates the single writer and any number of snapshot readers.
pub struct TransactionManager {
    path: PathBuf,
    config: StoreConfig,
    writer: Mutex<WriterState>,
    shared: Mutex<SharedState>,
}

impl TransactionManager {
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        let existing = path.exists() && std::fs::metadata(path)?.len() > 0;
        let mut pager = if existing {
            info!("Opening store at {}", path.display());
            Pager::open(path)?
        } else {
            info!("Creating store at {}", path.display());
            Pager::create(path)?
        };

        let mut wal = Wal::open(path)?;
        if let Some(commit) = wal.read_commit()? {
            // Validate before touching the backing file
            StoreHeader::from_bytes(&commit.header)?;
            info!(
                "Replaying WAL commit version {} ({} pages)",
                commit.version,
                commit.pages.len()
            );
            for (page_id, image) in &commit.pages {
                pager.write_page_bytes(*page_id, image)?;
            }
            pager.write_header_bytes(&commit.header)?;
            pager.sync()?;
        }
        wal.reset(true)?;

        let header = pager.read_header()?;
        let expected_len = HEADER_SIZE as u64 + header.page_count * PAGE_SIZE as u64;
        let actual_len = pager.file_len()?;
        if actual_len < expected_len {
            return Err(DatabaseError::InvalidHeader {
                reason: format!(
                    "File holds {} bytes, header describes {} pages ({} bytes)",
                    actual_len, header.page_count, expected_len
                ),
            });
        }

        let freelist = FreeList::load(&mut pager, &header)?;
        let snapshot = Snapshot::load(&mut pager, &header)?;
        info!(
            "Store ready: version={} pages={} types={} ({})",
            header.commit_version, header.page_count, header.type_count, config
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            writer: Mutex::new(WriterState {
                pager,
                wal,
                freelist,
                page_count: header.page_count,
                failure: None,
            }),
            shared: Mutex::new(SharedState {
                current: Arc::new(snapshot),
                readers: BTreeMap::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn shared(&self) -> Result<MutexGuard<'_, SharedState>> {
        self.shared.lock().map_err(|_| DatabaseError::ConcurrencyError)
    }

    pub fn current_version(&self) -> Result<Version> {
        Ok(self.shared()?.current.version)
    }

    /// Pins the latest committed snapshot until the returned transaction drops.
    pub fn begin_read(&self) -> Result<ReadTransaction<'_>> {
        let snapshot = {
            let mut shared = self.shared()?;
            let snapshot = Arc::clone(&shared.current);
            *shared.readers.entry(snapshot.version).or_insert(0) += 1;
            snapshot
        };
        debug!("Read transaction opened at version {}", snapshot.version);
        Ok(ReadTransaction::new(self, snapshot))
    }

    pub(crate) fn release_reader(&self, version: Version) {
        match self.shared.lock() {
            Ok(mut shared) => {
                if let Some(count) = shared.readers.get_mut(&version) {
                    *count -= 1;
                    if *count == 0 {
                        shared.readers.remove(&version);
                    }
                }
            }
            Err(_) => warn!("Reader registry poisoned; reader at version {} not released", version),
        }
    }

    pub fn begin_write(&self) -> Result<WriteTransaction<'_>> {
        let mut writer = match self.config.write_policy {
            WritePolicy::Block => self.writer.lock().map_err(|_| DatabaseError::ConcurrencyError)?,
            WritePolicy::FailFast => match self.writer.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => return Err(DatabaseError::WriteConflict),
                Err(TryLockError::Poisoned(_)) => return Err(DatabaseError::ConcurrencyError),
            },
        };
        writer.check_usable()?;

        let (base, oldest_reader) = {
            let shared = self.shared()?;
            (
                Arc::clone(&shared.current),
                shared.readers.keys().next().copied(),
            )
        };
        writer.freelist.promote(oldest_reader);
        let allocator = writer
            .freelist
            .allocator(writer.page_count, self.config.max_pages);

        debug!("Write transaction opened on version {}", base.version);
        Ok(WriteTransaction::new(self, writer, base, allocator))
    }

    pub(crate) fn publish(&self, snapshot: Snapshot) -> Result<()> {
        let mut shared = self.shared()?;
        shared.current = Arc::new(snapshot);
        Ok(())
    }

    pub fn live_readers(&self) -> Result<usize> {
        Ok(self.shared()?.readers.values().sum())
    }

    /// Flushes the backing file and clears the WAL.
    pub fn close(self) -> Result<()> {
        let mut writer = self
            .writer
            .into_inner()
            .map_err(|_| DatabaseError::ConcurrencyError)?;
        writer.check_usable()?;
        writer.pager.sync()?;
        writer.wal.reset(true)?;
        info!("Closed store at {}", self.path.display());
        Ok(())
    }
}
