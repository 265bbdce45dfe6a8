use serde::{Deserialize, Serialize};

use crate::{
    storage::{
        pager::{PageSource, build_page_chain, read_page_chain},
        schema::TableSchema,
    },
    types::{
        PageId,
        error::Result,
        page::{Page, PageType},
    },
};

/// One catalog cell: a record type's schema plus where its index chain starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub schema: TableSchema,
    pub index_root: Option<PageId>,
    pub record_count: u64,
}

impl CatalogEntry {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(self, bincode::config::standard())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (entry, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(entry)
    }
}

pub fn write_catalog(
    entries: &[CatalogEntry],
    allocate: &mut dyn FnMut() -> Result<PageId>,
) -> Result<Vec<Page>> {
    let cells = entries
        .iter()
        .map(CatalogEntry::to_bytes)
        .collect::<Result<Vec<_>>>()?;
    build_page_chain(PageType::Catalog, cells, allocate)
}

pub fn load_catalog(
    source: &mut dyn PageSource,
    root: Option<PageId>,
) -> Result<(Vec<CatalogEntry>, Vec<PageId>)> {
    let chain = read_page_chain(source, root, PageType::Catalog)?;
    let mut entries = Vec::new();
    let mut page_ids = Vec::with_capacity(chain.len());

    for page in &chain {
        page_ids.push(page.page_id);
        for cell in page.cells() {
            entries.push(CatalogEntry::from_bytes(cell)?);
        }
    }

    Ok((entries, page_ids))
}
