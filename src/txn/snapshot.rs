use std::{collections::BTreeMap, sync::Arc};

use crate::{
    storage::{
        catalog::load_catalog,
        header::StoreHeader,
        index::TableIndex,
        pager::PageSource,
        table::TableState,
    },
    types::{
        PageId, Version,
        error::{DatabaseError, Result},
    },
};

/// Immutable view of the store as of one committed version.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub version: Version,
    pub tables: BTreeMap<String, Arc<TableState>>,
    pub catalog_pages: Vec<PageId>,
}

impl Snapshot {
    /// Rebuilds the committed state described by `header`.
    pub fn load(source: &mut dyn PageSource, header: &StoreHeader) -> Result<Self> {
        let root = (header.catalog_root != 0).then_some(header.catalog_root);
        let (entries, catalog_pages) = load_catalog(source, root)?;

        if entries.len() != header.type_count as usize {
            return Err(DatabaseError::CorruptPage {
                page_id: header.catalog_root,
                reason: format!(
                    "Catalog lists {} record types, header records {}",
                    entries.len(),
                    header.type_count
                ),
            });
        }

        let mut tables = BTreeMap::new();
        for entry in entries {
            let (index, index_pages) = TableIndex::load(source, entry.index_root)?;
            if index.len() as u64 != entry.record_count {
                return Err(DatabaseError::CorruptPage {
                    page_id: entry.index_root.unwrap_or(0),
                    reason: format!(
                        "Index of '{}' holds {} keys, catalog records {}",
                        entry.schema.type_name,
                        index.len(),
                        entry.record_count
                    ),
                });
            }
            let name = entry.schema.type_name.clone();
            let table = TableState::with_index(entry.schema, index, index_pages);
            tables.insert(name, Arc::new(table));
        }

        Ok(Self {
            version: header.commit_version,
            tables,
            catalog_pages,
        })
    }

    pub fn table(&self, type_name: &str) -> Result<&Arc<TableState>> {
        self.tables
            .get(type_name)
            .ok_or_else(|| DatabaseError::TypeNotFound {
                name: type_name.to_string(),
            })
    }

    pub fn type_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}
