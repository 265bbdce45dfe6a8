use std::path::Path;

use log::debug;

use crate::{
    config::StoreConfig,
    executor::{fetch::SortOrder, filter::RecordFilter},
    storage::schema::TableSchema,
    txn::{manager::TransactionManager, read::ReadTransaction, transaction::WriteTransaction},
    types::{
        Version,
        entry::PrimaryKey,
        error::Result,
        record::Record,
        value::Value,
    },
};

/// Handle on one store file. Every method below runs in its own transaction;
/// use `begin_write` / `write_batch` to group several writes into one commit.
pub struct Store {
    manager: TransactionManager,
}

impl Store {
    /// Opens the store at `path`, creating it when missing. Settings come from
    /// the environment (see `StoreConfig::from_env`).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::from_env())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let manager = TransactionManager::open(path, config)?;
        Ok(Self { manager })
    }

    pub fn path(&self) -> &Path {
        self.manager.path()
    }

    pub fn config(&self) -> &StoreConfig {
        self.manager.config()
    }

    pub fn version(&self) -> Result<Version> {
        self.manager.current_version()
    }

    /// Number of open read transactions.
    pub fn live_readers(&self) -> Result<usize> {
        self.manager.live_readers()
    }

    pub fn begin_read(&self) -> Result<ReadTransaction<'_>> {
        self.manager.begin_read()
    }

    pub fn begin_write(&self) -> Result<WriteTransaction<'_>> {
        self.manager.begin_write()
    }

    /// Runs `f` in one write transaction, committing when it returns Ok and
    /// rolling back otherwise.
    pub fn write_batch<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> Result<T>,
    {
        let mut txn = self.begin_write()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                debug!("Write batch rolled back: {}", e);
                txn.abort();
                Err(e)
            }
        }
    }

    pub fn define_type(&self, schema: TableSchema) -> Result<bool> {
        self.write_batch(|txn| txn.define_type(schema))
    }

    pub fn write(&self, type_name: &str, record: Record, upsert: bool) -> Result<()> {
        self.write_batch(|txn| txn.write(type_name, record, upsert))
    }

    pub fn update_fields(
        &self,
        type_name: &str,
        key: &PrimaryKey,
        fields: &[(&str, Value)],
        upsert: bool,
    ) -> Result<Record> {
        self.write_batch(|txn| txn.update_fields(type_name, key, fields, upsert))
    }

    pub fn delete(&self, type_name: &str, record: &Record) -> Result<bool> {
        self.write_batch(|txn| txn.delete(type_name, record))
    }

    pub fn delete_by_key(&self, type_name: &str, key: &PrimaryKey) -> Result<bool> {
        self.write_batch(|txn| txn.delete_by_key(type_name, key))
    }

    pub fn delete_all(&self, type_name: Option<&str>) -> Result<usize> {
        self.write_batch(|txn| txn.delete_all(type_name))
    }

    pub fn get(&self, type_name: &str, key: &PrimaryKey) -> Result<Option<Record>> {
        self.begin_read()?.get(type_name, key)
    }

    /// All matching records in primary key order.
    pub fn fetch(&self, type_name: &str, filter: Option<&dyn RecordFilter>) -> Result<Vec<Record>> {
        let txn = self.begin_read()?;
        txn.fetch(type_name, filter)?.collect()
    }

    pub fn fetch_sorted(
        &self,
        type_name: &str,
        filter: Option<&dyn RecordFilter>,
        sort_field: &str,
        order: SortOrder,
    ) -> Result<Vec<Record>> {
        let txn = self.begin_read()?;
        txn.fetch_sorted(type_name, filter, sort_field, order)?
            .collect()
    }

    pub fn next_primary_key(&self, type_name: &str) -> Result<i64> {
        self.begin_read()?.next_primary_key(type_name)
    }

    pub fn count(&self, type_name: &str) -> Result<usize> {
        self.begin_read()?.count(type_name)
    }

    pub fn type_names(&self) -> Result<Vec<String>> {
        Ok(self.begin_read()?.type_names())
    }

    pub fn schema(&self, type_name: &str) -> Result<TableSchema> {
        self.begin_read()?.schema(type_name).cloned()
    }

    pub fn close(self) -> Result<()> {
        self.manager.close()
    }
}
