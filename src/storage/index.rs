use std::collections::{BTreeMap, BTreeSet};

use crate::{
    storage::pager::{PageSource, build_page_chain, read_page_chain},
    types::{
        PageId,
        entry::{IndexEntry, Location, PrimaryKey},
        error::{DatabaseError, Result},
        page::{Page, PageType},
    },
};

/// Ordered map from primary key to record location for one record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableIndex {
    entries: BTreeMap<PrimaryKey, Location>,
}

impl TableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &PrimaryKey) -> Option<Location> {
        self.entries.get(key).copied()
    }

    /// Returns the previous location when the key was already present.
    pub fn upsert(&mut self, key: PrimaryKey, location: Location) -> Option<Location> {
        self.entries.insert(key, location)
    }

    pub fn remove(&mut self, key: &PrimaryKey) -> Option<Location> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_key(&self) -> Option<&PrimaryKey> {
        self.entries.keys().next_back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&PrimaryKey, &Location)> + '_ {
        self.entries.iter()
    }

    /// Entries in key order, or reverse key order when `ascending` is false.
    pub fn range(
        &self,
        ascending: bool,
    ) -> Box<dyn Iterator<Item = (&PrimaryKey, &Location)> + '_> {
        if ascending {
            Box::new(self.entries.iter())
        } else {
            Box::new(self.entries.iter().rev())
        }
    }

    pub fn data_pages(&self) -> BTreeSet<PageId> {
        self.entries.values().map(|location| location.page_id).collect()
    }

    pub fn to_pages(&self, allocate: &mut dyn FnMut() -> Result<PageId>) -> Result<Vec<Page>> {
        let cells = self
            .entries
            .iter()
            .map(|(key, location)| IndexEntry::new(key.clone(), *location).to_bytes());
        build_page_chain(PageType::Index, cells, allocate)
    }

    /// Loads the chain starting at `root`, returning the index and its page ids.
    pub fn load(source: &mut dyn PageSource, root: Option<PageId>) -> Result<(Self, Vec<PageId>)> {
        let chain = read_page_chain(source, root, PageType::Index)?;
        let mut index = TableIndex::new();
        let mut page_ids = Vec::with_capacity(chain.len());

        for page in &chain {
            page_ids.push(page.page_id);
            for cell in page.cells() {
                let (entry, consumed) = IndexEntry::from_bytes(cell)?;
                if consumed != cell.len() {
                    return Err(DatabaseError::CorruptPage {
                        page_id: page.page_id,
                        reason: "Trailing bytes after index entry".to_string(),
                    });
                }
                if index.upsert(entry.key.clone(), entry.location).is_some() {
                    return Err(DatabaseError::CorruptPage {
                        page_id: page.page_id,
                        reason: format!("Duplicate index key {}", entry.key),
                    });
                }
            }
        }

        Ok((index, page_ids))
    }
}
