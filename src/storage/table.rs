use std::collections::BTreeSet;

use crate::{
    storage::{
        index::TableIndex,
        pager::{PageSource, StagedPages},
        schema::TableSchema,
    },
    types::{
        MAX_CELL_SIZE, PageId, SlotId,
        entry::{Location, PrimaryKey},
        error::{DatabaseError, Result},
        page::{Page, PageType},
        record::Record,
        value::DataType,
    },
};

/// Committed (or in-progress) state of one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    pub schema: TableSchema,
    pub index: TableIndex,
    /// Index chain as last committed; replaced when the type is committed again.
    pub index_pages: Vec<PageId>,
    pub data_pages: BTreeSet<PageId>,
    /// Data page new records go to first.
    pub insert_target: Option<PageId>,
}

impl TableState {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            index: TableIndex::new(),
            index_pages: Vec::new(),
            data_pages: BTreeSet::new(),
            insert_target: None,
        }
    }

    pub fn with_index(schema: TableSchema, index: TableIndex, index_pages: Vec<PageId>) -> Self {
        let data_pages = index.data_pages();
        let insert_target = data_pages.last().copied();
        Self {
            schema,
            index,
            index_pages,
            data_pages,
            insert_target,
        }
    }

    pub fn record_count(&self) -> usize {
        self.index.len()
    }

    /// One past the largest integer primary key, or 0 when the type is empty.
    pub fn next_primary_key(&self) -> Result<i64> {
        let column = self.schema.primary_key_column();
        if column.data_type != DataType::Integer {
            return Err(DatabaseError::SchemaViolation {
                details: format!(
                    "Primary key '{}' of '{}' is {}, not INTEGER",
                    column.name, self.schema.type_name, column.data_type
                ),
            });
        }

        match self.index.max_key() {
            None => Ok(0),
            Some(PrimaryKey::Integer(max)) => {
                max.checked_add(1)
                    .ok_or_else(|| DatabaseError::SchemaViolation {
                        details: format!("Primary keys of '{}' are exhausted", self.schema.type_name),
                    })
            }
            Some(PrimaryKey::Text(_)) => Err(DatabaseError::CorruptPage {
                page_id: self.index_pages.first().copied().unwrap_or(0),
                reason: "Text key in an INTEGER-keyed index".to_string(),
            }),
        }
    }

    pub fn read_record(
        &self,
        source: &mut dyn PageSource,
        key: &PrimaryKey,
    ) -> Result<Option<Record>> {
        let Some(location) = self.index.lookup(key) else {
            return Ok(None);
        };
        let page = source.read_page(location.page_id)?;
        decode_cell(&page, location, &self.schema, key).map(Some)
    }

    /// Fails with `RecordTooLarge` when `record` cannot fit in a single page.
    pub fn ensure_fits(&self, record: &Record) -> Result<()> {
        check_cell_size(record.size())
    }

    /// Stores a record whose key is not yet indexed.
    pub fn insert_record(
        &mut self,
        pages: &mut StagedPages,
        source: &mut dyn PageSource,
        record: &Record,
    ) -> Result<Location> {
        let bytes = record.to_bytes();
        check_cell_size(bytes.len())?;
        let key = self.schema.primary_key(record)?;

        let target = match self.insert_target {
            Some(page_id) => {
                let page = pages.read(source, page_id)?;
                page.can_fit(bytes.len()).then_some(page_id)
            }
            None => None,
        };

        let page_id = match target {
            Some(page_id) => self.writable_page(pages, source, page_id)?,
            None => {
                let page_id = pages.allocate(PageType::Data)?;
                self.data_pages.insert(page_id);
                page_id
            }
        };
        self.insert_target = Some(page_id);

        let slot = pages.page_mut(page_id)?.insert_cell(&bytes)?;
        let location = Location::new(page_id, slot as SlotId);
        self.index.upsert(key, location);
        Ok(location)
    }

    /// Removes the record stored under `key`. Returns false if there was none.
    pub fn remove_record(
        &mut self,
        pages: &mut StagedPages,
        source: &mut dyn PageSource,
        key: &PrimaryKey,
    ) -> Result<bool> {
        let Some(location) = self.index.lookup(key) else {
            return Ok(false);
        };

        // A committed page losing its last cell is released without a copy
        if !pages.is_fresh(location.page_id)
            && pages.read(source, location.page_id)?.cell_count == 1
        {
            self.index.remove(key);
            self.release_data_page(pages, location.page_id);
            return Ok(true);
        }

        let page_id = self.writable_page(pages, source, location.page_id)?;
        let location = self
            .index
            .lookup(key)
            .ok_or_else(|| DatabaseError::CorruptPage {
                page_id,
                reason: format!("Key {} vanished while its page was copied", key),
            })?;

        let now_empty = {
            let page = pages.page_mut(page_id)?;
            page.delete_cell(location.slot as usize)?;
            self.index.remove(key);
            if page.is_empty() {
                true
            } else {
                // Later slots shifted down by one
                self.rehome(page)?;
                false
            }
        };

        if now_empty {
            self.release_data_page(pages, page_id);
        }
        Ok(true)
    }

    fn release_data_page(&mut self, pages: &mut StagedPages, page_id: PageId) {
        pages.free(page_id);
        self.data_pages.remove(&page_id);
        if self.insert_target == Some(page_id) {
            self.insert_target = self.data_pages.last().copied();
        }
    }

    /// Drops every record of this type, returning how many there were.
    pub fn clear(&mut self, pages: &mut StagedPages) -> usize {
        let removed = self.index.len();
        for &page_id in &self.data_pages {
            pages.free(page_id);
        }
        self.data_pages.clear();
        self.index.clear();
        self.insert_target = None;
        removed
    }

    /// Id of a page this transaction may modify holding the same cells as
    /// `page_id`. Committed pages are copied to a new id and the old id freed.
    fn writable_page(
        &mut self,
        pages: &mut StagedPages,
        source: &mut dyn PageSource,
        page_id: PageId,
    ) -> Result<PageId> {
        if pages.is_fresh(page_id) {
            return Ok(page_id);
        }

        let original = pages.read(source, page_id)?;
        if original.page_type != PageType::Data {
            return Err(DatabaseError::CorruptPage {
                page_id,
                reason: format!("Expected data page, found {:?}", original.page_type),
            });
        }

        let new_id = pages.allocate_id()?;
        let copy = original.relocate(new_id);
        self.rehome(&copy)?;
        pages.write(copy)?;
        pages.free(page_id);

        self.data_pages.remove(&page_id);
        self.data_pages.insert(new_id);
        if self.insert_target == Some(page_id) {
            self.insert_target = Some(new_id);
        }
        Ok(new_id)
    }

    /// Points the index at every cell of `page`.
    fn rehome(&mut self, page: &Page) -> Result<()> {
        for (slot, cell) in page.cells().enumerate() {
            let record = Record::from_bytes(cell)?;
            let key = self.schema.primary_key(&record)?;
            self.index
                .upsert(key, Location::new(page.page_id, slot as SlotId));
        }
        Ok(())
    }
}

fn check_cell_size(size: usize) -> Result<()> {
    if size > MAX_CELL_SIZE {
        return Err(DatabaseError::RecordTooLarge {
            size,
            max: MAX_CELL_SIZE,
        });
    }
    Ok(())
}

/// Decodes the record at `location`, checking it carries the expected key.
pub fn decode_cell(
    page: &Page,
    location: Location,
    schema: &TableSchema,
    key: &PrimaryKey,
) -> Result<Record> {
    let cell = page
        .get_cell(location.slot as usize)
        .ok_or_else(|| DatabaseError::CorruptPage {
            page_id: page.page_id,
            reason: format!("Index points at missing slot {}", location.slot),
        })?;
    let record = Record::from_bytes(cell)?;
    if schema.primary_key(&record)? != *key {
        return Err(DatabaseError::CorruptPage {
            page_id: page.page_id,
            reason: format!("Slot {} does not hold key {}", location.slot, key),
        });
    }
    Ok(record)
}
