use log::debug;

use crate::{
    storage::{
        header::StoreHeader,
        pager::{PageSource, read_page_chain},
    },
    types::{
        MAX_CELL_SIZE, PageId, Version,
        error::{DatabaseError, Result},
        page::{Page, PageType},
    },
    utils::bytes::read_u64_le,
};

/// Page ids one trunk page can record.
pub const TRUNK_CAPACITY: usize = MAX_CELL_SIZE / 8;

/// Hands out page ids for one write transaction: reusable pages first
/// (lowest id first), then growth at the end of the file.
#[derive(Debug, Default, Clone)]
pub struct Allocator {
    reusable: Vec<PageId>,
    page_count: u64,
    max_pages: u64,
}

impl Allocator {
    pub fn new(mut reusable: Vec<PageId>, page_count: u64, max_pages: u64) -> Self {
        reusable.sort_unstable_by(|a, b| b.cmp(a));
        Self {
            reusable,
            page_count,
            max_pages,
        }
    }

    pub fn allocate(&mut self) -> Result<PageId> {
        if let Some(page_id) = self.reusable.pop() {
            return Ok(page_id);
        }
        if self.page_count >= self.max_pages {
            return Err(DatabaseError::StorageFull {
                max_pages: self.max_pages,
            });
        }
        self.page_count += 1;
        Ok(self.page_count)
    }

    pub fn release(&mut self, page_id: PageId) {
        let position = self
            .reusable
            .iter()
            .position(|&id| id < page_id)
            .unwrap_or(self.reusable.len());
        self.reusable.insert(position, page_id);
    }

    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    pub fn reusable(&self) -> &[PageId] {
        &self.reusable
    }
}

/// Freed pages, split into those safe to reuse and those a live snapshot may
/// still read. Persisted as a chain of trunk pages listing every free id.
#[derive(Debug, Default, Clone)]
pub struct FreeList {
    reusable: Vec<PageId>,
    pending: Vec<(Version, PageId)>,
    trunks: Vec<PageId>,
}

/// Trunk pages to write at commit, plus what the header should record.
#[derive(Debug)]
pub struct FreeListImage {
    pub pages: Vec<Page>,
    pub trunks: Vec<PageId>,
    pub free_count: u64,
}

impl FreeList {
    /// At open no snapshot exists, so every listed page is reusable.
    pub fn load(source: &mut dyn PageSource, header: &StoreHeader) -> Result<Self> {
        let head = (header.freelist_head != 0).then_some(header.freelist_head);
        let chain = read_page_chain(source, head, PageType::FreeList)?;

        let mut reusable = Vec::new();
        let mut trunks = Vec::with_capacity(chain.len());
        for page in &chain {
            trunks.push(page.page_id);
            for cell in page.cells() {
                if cell.len() % 8 != 0 {
                    return Err(DatabaseError::CorruptPage {
                        page_id: page.page_id,
                        reason: format!("Free list cell of {} bytes", cell.len()),
                    });
                }
                for offset in (0..cell.len()).step_by(8) {
                    reusable.push(read_u64_le(cell, offset, "free page id")?);
                }
            }
        }

        if reusable.len() as u64 != header.freelist_count {
            return Err(DatabaseError::CorruptPage {
                page_id: header.freelist_head,
                reason: format!(
                    "Free list holds {} pages, header records {}",
                    reusable.len(),
                    header.freelist_count
                ),
            });
        }

        Ok(Self {
            reusable,
            pending: Vec::new(),
            trunks,
        })
    }

    /// Moves pending pages to reusable once no reader older than their
    /// release version remains. `oldest_reader` is None when no reader is live.
    pub fn promote(&mut self, oldest_reader: Option<Version>) {
        let before = self.pending.len();
        let mut still_pending = Vec::with_capacity(before);
        for (version, page_id) in self.pending.drain(..) {
            match oldest_reader {
                Some(oldest) if oldest < version => still_pending.push((version, page_id)),
                _ => self.reusable.push(page_id),
            }
        }
        self.pending = still_pending;

        let promoted = before - self.pending.len();
        if promoted > 0 {
            debug!("Promoted {} freed pages to reusable", promoted);
        }
    }

    pub fn allocator(&self, page_count: u64, max_pages: u64) -> Allocator {
        Allocator::new(self.reusable.clone(), page_count, max_pages)
    }

    pub fn reusable_count(&self) -> usize {
        self.reusable.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Lays out trunk pages for the state after a commit. Trunks are taken from
    /// `allocator` when the list outgrows the existing ones; surplus trunks stay
    /// in the chain empty.
    pub fn build_image(&self, allocator: &mut Allocator, freed: &[PageId]) -> Result<FreeListImage> {
        let mut trunks = self.trunks.clone();
        loop {
            let count = allocator.reusable().len() + self.pending.len() + freed.len();
            let needed = count.div_ceil(TRUNK_CAPACITY);
            if trunks.len() >= needed {
                break;
            }
            trunks.push(allocator.allocate()?);
        }

        let entries: Vec<PageId> = allocator
            .reusable()
            .iter()
            .copied()
            .chain(self.pending.iter().map(|(_, page_id)| *page_id))
            .chain(freed.iter().copied())
            .collect();

        let mut pages = Vec::with_capacity(trunks.len());
        let mut chunks = entries.chunks(TRUNK_CAPACITY);
        for (i, &trunk_id) in trunks.iter().enumerate() {
            let mut page = Page::new(trunk_id, PageType::FreeList);
            page.next_page_id = trunks.get(i + 1).copied();

            let mut cell = Vec::new();
            if let Some(chunk) = chunks.next() {
                cell.reserve(chunk.len() * 8);
                for page_id in chunk {
                    cell.extend_from_slice(&page_id.to_le_bytes());
                }
            }
            page.insert_cell(&cell)?;
            pages.push(page);
        }

        Ok(FreeListImage {
            pages,
            trunks,
            free_count: entries.len() as u64,
        })
    }

    /// Installs the post-commit state once the commit is durable.
    pub fn apply_commit(
        &mut self,
        allocator: &Allocator,
        freed: &[PageId],
        version: Version,
        trunks: Vec<PageId>,
    ) {
        self.reusable = allocator.reusable().to_vec();
        self.pending
            .extend(freed.iter().map(|&page_id| (version, page_id)));
        self.trunks = trunks;
    }
}
