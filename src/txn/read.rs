use std::sync::Arc;

use log::debug;

use crate::{
    executor::{
        fetch::{Fetch, SortOrder, fetch, fetch_sorted},
        filter::RecordFilter,
    },
    storage::{
        pager::PageReader,
        schema::TableSchema,
    },
    txn::{manager::TransactionManager, snapshot::Snapshot},
    types::{Version, entry::PrimaryKey, error::Result, record::Record},
};

/// A consistent view of the store as of one committed version. Pages it can
/// reach are not reused until it is dropped.
pub struct ReadTransaction<'m> {
    manager: &'m TransactionManager,
    snapshot: Arc<Snapshot>,
}

impl<'m> ReadTransaction<'m> {
    pub(crate) fn new(manager: &'m TransactionManager, snapshot: Arc<Snapshot>) -> Self {
        Self { manager, snapshot }
    }

    pub fn version(&self) -> Version {
        self.snapshot.version
    }

    pub fn type_names(&self) -> Vec<String> {
        self.snapshot.type_names()
    }

    pub fn schema(&self, type_name: &str) -> Result<&TableSchema> {
        Ok(&self.snapshot.table(type_name)?.schema)
    }

    pub fn count(&self, type_name: &str) -> Result<usize> {
        Ok(self.snapshot.table(type_name)?.record_count())
    }

    pub fn get(&self, type_name: &str, key: &PrimaryKey) -> Result<Option<Record>> {
        let table = self.snapshot.table(type_name)?;
        let mut reader = PageReader::open(self.manager.path())?;
        table.read_record(&mut reader, key)
    }

    /// Matching records in primary key order, read lazily.
    pub fn fetch<'a>(
        &'a self,
        type_name: &str,
        filter: Option<&'a dyn RecordFilter>,
    ) -> Result<Fetch<'a>> {
        let table = self.snapshot.table(type_name)?;
        fetch(self.manager.path(), table, filter)
    }

    pub fn fetch_sorted<'a>(
        &'a self,
        type_name: &str,
        filter: Option<&'a dyn RecordFilter>,
        sort_field: &str,
        order: SortOrder,
    ) -> Result<Fetch<'a>> {
        let table = self.snapshot.table(type_name)?;
        fetch_sorted(self.manager.path(), table, filter, sort_field, order)
    }

    /// Undefined types have no keys yet, so they start at 0 as well.
    pub fn next_primary_key(&self, type_name: &str) -> Result<i64> {
        match self.snapshot.tables.get(type_name) {
            Some(table) => table.next_primary_key(),
            None => Ok(0),
        }
    }
}

impl Drop for ReadTransaction<'_> {
    fn drop(&mut self) {
        debug!("Read transaction at version {} closed", self.snapshot.version);
        self.manager.release_reader(self.snapshot.version);
    }
}
