use std::{
    collections::{HashMap, HashSet},
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    storage::{freelist::Allocator, header::StoreHeader},
    types::{
        HEADER_SIZE, MAX_CELL_SIZE, PAGE_SIZE, PageId,
        error::{DatabaseError, Result},
        page::{Page, PageType},
    },
};

pub fn page_offset(page_id: PageId) -> u64 {
    HEADER_SIZE as u64 + (page_id - 1) * PAGE_SIZE as u64
}

/// Anything committed pages can be read from.
pub trait PageSource {
    fn read_page(&mut self, page_id: PageId) -> Result<Page>;
}

fn read_page_from(file: &mut File, page_id: PageId) -> Result<Page> {
    if page_id == 0 {
        return Err(DatabaseError::CorruptPage {
            page_id,
            reason: "Page id 0 is reserved".to_string(),
        });
    }

    let mut buffer = vec![0u8; PAGE_SIZE];
    file.seek(SeekFrom::Start(page_offset(page_id)))?;
    if let Err(e) = file.read_exact(&mut buffer) {
        if e.kind() == ErrorKind::UnexpectedEof {
            return Err(DatabaseError::CorruptPage {
                page_id,
                reason: "Page lies beyond the end of the file".to_string(),
            });
        }
        return Err(e.into());
    }

    let page = Page::from_bytes(&buffer)?;
    if page.page_id != page_id {
        return Err(DatabaseError::CorruptPage {
            page_id,
            reason: format!("Page claims id {}", page.page_id),
        });
    }
    Ok(page)
}

/// Read-only handle used by snapshot readers. Each reader opens its own.
pub struct PageReader {
    file: File,
}

impl PageReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self { file })
    }
}

impl PageSource for PageReader {
    fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        read_page_from(&mut self.file, page_id)
    }
}

/// The writer's handle on the backing file.
pub struct Pager {
    path: PathBuf,
    file: File,
}

impl Pager {
    /// Creates a fresh backing file holding only a default header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&StoreHeader::default().to_bytes())?;
        file.sync_all()?;
        debug!("Created backing file {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn read_header(&mut self) -> Result<StoreHeader> {
        let mut buffer = vec![0u8; HEADER_SIZE];
        self.file.seek(SeekFrom::Start(0))?;
        if let Err(e) = self.file.read_exact(&mut buffer) {
            if e.kind() == ErrorKind::UnexpectedEof {
                return Err(DatabaseError::InvalidHeader {
                    reason: "File is shorter than the store header".to_string(),
                });
            }
            return Err(e.into());
        }
        StoreHeader::from_bytes(&buffer)
    }

    pub fn write_header_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    pub fn write_page_bytes(&mut self, page_id: PageId, bytes: &[u8]) -> Result<()> {
        if bytes.len() != PAGE_SIZE {
            return Err(DatabaseError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }
        self.file.seek(SeekFrom::Start(page_offset(page_id)))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

impl PageSource for Pager {
    fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        read_page_from(&mut self.file, page_id)
    }
}

/// Pages a write transaction has allocated, written or released.
///
/// Committed pages are never modified in place: only pages allocated by this
/// transaction can be written, and they reach the file at commit.
#[derive(Debug, Default)]
pub struct StagedPages {
    allocator: Allocator,
    dirty: HashMap<PageId, Page>,
    fresh: HashSet<PageId>,
    freed: Vec<PageId>,
}

impl StagedPages {
    pub fn new(allocator: Allocator) -> Self {
        Self {
            allocator,
            dirty: HashMap::new(),
            fresh: HashSet::new(),
            freed: Vec::new(),
        }
    }

    /// Reserves a page id for this transaction without staging an image.
    pub fn allocate_id(&mut self) -> Result<PageId> {
        let page_id = self.allocator.allocate()?;
        self.fresh.insert(page_id);
        Ok(page_id)
    }

    pub fn allocate(&mut self, page_type: PageType) -> Result<PageId> {
        let page_id = self.allocate_id()?;
        self.dirty.insert(page_id, Page::new(page_id, page_type));
        Ok(page_id)
    }

    pub fn is_fresh(&self, page_id: PageId) -> bool {
        self.fresh.contains(&page_id)
    }

    /// Staged image if there is one, otherwise the committed page.
    pub fn read(&self, source: &mut dyn PageSource, page_id: PageId) -> Result<Page> {
        match self.dirty.get(&page_id) {
            Some(page) => Ok(page.clone()),
            None => source.read_page(page_id),
        }
    }

    pub fn page_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        self.dirty
            .get_mut(&page_id)
            .ok_or_else(|| DatabaseError::CorruptPage {
                page_id,
                reason: "Page is not staged in this transaction".to_string(),
            })
    }

    pub fn write(&mut self, page: Page) -> Result<()> {
        if !self.fresh.contains(&page.page_id) {
            return Err(DatabaseError::CorruptPage {
                page_id: page.page_id,
                reason: "Committed pages cannot be rewritten in place".to_string(),
            });
        }
        self.dirty.insert(page.page_id, page);
        Ok(())
    }

    /// Fresh pages go straight back to the allocator; committed ones are
    /// released when the transaction commits.
    pub fn free(&mut self, page_id: PageId) {
        if self.fresh.remove(&page_id) {
            self.dirty.remove(&page_id);
            self.allocator.release(page_id);
        } else if !self.freed.contains(&page_id) {
            self.freed.push(page_id);
        }
    }

    pub fn freed(&self) -> &[PageId] {
        &self.freed
    }

    pub fn into_parts(self) -> (Allocator, Vec<Page>, Vec<PageId>) {
        let mut pages: Vec<Page> = self.dirty.into_values().collect();
        pages.sort_by_key(|page| page.page_id);
        (self.allocator, pages, self.freed)
    }
}

/// Reads through a transaction's staged pages to the committed file.
pub struct StagedSource<'a> {
    pub staged: &'a StagedPages,
    pub source: &'a mut dyn PageSource,
}

impl PageSource for StagedSource<'_> {
    fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.staged.read(&mut *self.source, page_id)
    }
}

/// Packs cells into a linked chain of freshly allocated pages.
pub fn build_page_chain<I>(
    page_type: PageType,
    cells: I,
    allocate: &mut dyn FnMut() -> Result<PageId>,
) -> Result<Vec<Page>>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut chain: Vec<Page> = Vec::new();
    let mut current: Option<Page> = None;

    for cell in cells {
        if cell.len() > MAX_CELL_SIZE {
            return Err(DatabaseError::RecordTooLarge {
                size: cell.len(),
                max: MAX_CELL_SIZE,
            });
        }

        let needs_page = match &current {
            Some(page) => !page.can_fit(cell.len()),
            None => true,
        };
        if needs_page {
            let page_id = allocate()?;
            if let Some(mut previous) = current.take() {
                previous.next_page_id = Some(page_id);
                chain.push(previous);
            }
            current = Some(Page::new(page_id, page_type));
        }

        if let Some(page) = current.as_mut() {
            page.insert_cell(&cell)?;
        }
    }

    if let Some(page) = current {
        chain.push(page);
    }
    Ok(chain)
}

/// Follows a chain from `head`, checking page types and guarding against cycles.
pub fn read_page_chain(
    source: &mut dyn PageSource,
    head: Option<PageId>,
    page_type: PageType,
) -> Result<Vec<Page>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = head;

    while let Some(page_id) = next {
        if !seen.insert(page_id) {
            return Err(DatabaseError::CorruptPage {
                page_id,
                reason: "Page chain contains a cycle".to_string(),
            });
        }
        let page = source.read_page(page_id)?;
        if page.page_type != page_type {
            return Err(DatabaseError::CorruptPage {
                page_id,
                reason: format!("Expected {:?} page, found {:?}", page_type, page.page_type),
            });
        }
        next = page.next_page_id;
        chain.push(page);
    }

    Ok(chain)
}
