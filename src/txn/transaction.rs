use std::{collections::BTreeMap, sync::Arc, sync::MutexGuard};

use log::{debug, warn};

use crate::{
    storage::{
        catalog::{CatalogEntry, write_catalog},
        freelist::Allocator,
        header::StoreHeader,
        pager::{StagedPages, StagedSource},
        schema::TableSchema,
        table::TableState,
        wal::WalCommit,
    },
    txn::{
        manager::{TransactionManager, WriterState},
        snapshot::Snapshot,
    },
    types::{
        PageId, Version,
        entry::PrimaryKey,
        error::{DatabaseError, Result},
        record::Record,
        value::Value,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Active,
    Committing,
    Committed,
    Aborted,
}

/// The single write transaction. Holds the write lock until it commits,
/// aborts or is dropped; dropping without commit discards every staged change.
pub struct WriteTransaction<'m> {
    manager: &'m TransactionManager,
    writer: MutexGuard<'m, WriterState>,
    base: Arc<Snapshot>,
    /// Working copies of the record types this transaction touched.
    tables: BTreeMap<String, TableState>,
    pages: StagedPages,
    state: TxnState,
}

impl<'m> WriteTransaction<'m> {
    pub(crate) fn new(
        manager: &'m TransactionManager,
        writer: MutexGuard<'m, WriterState>,
        base: Arc<Snapshot>,
        allocator: Allocator,
    ) -> Self {
        Self {
            manager,
            writer,
            base,
            tables: BTreeMap::new(),
            pages: StagedPages::new(allocator),
            state: TxnState::Active,
        }
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    /// Version this transaction started from.
    pub fn base_version(&self) -> Version {
        self.base.version
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            TxnState::Active => Ok(()),
            other => Err(DatabaseError::TransactionAborted {
                reason: format!("transaction is {:?}", other),
            }),
        }
    }

    /// Marks the transaction aborted when `result` carries an error that may
    /// have left staged state half-applied.
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.aborts_transaction() {
                warn!("Write transaction aborted: {}", e);
                self.state = TxnState::Aborted;
            }
        }
        result
    }

    fn table(&self, type_name: &str) -> Result<&TableState> {
        match self.tables.get(type_name) {
            Some(table) => Ok(table),
            None => self.base.table(type_name).map(|table| table.as_ref()),
        }
    }

    fn parts(
        &mut self,
        type_name: &str,
    ) -> Result<(&mut TableState, &mut StagedPages, &mut WriterState)> {
        self.ensure_active()?;
        if !self.tables.contains_key(type_name) {
            let committed = self.base.table(type_name)?;
            self.tables
                .insert(type_name.to_string(), committed.as_ref().clone());
        }
        let table = self
            .tables
            .get_mut(type_name)
            .ok_or_else(|| DatabaseError::TypeNotFound {
                name: type_name.to_string(),
            })?;
        Ok((table, &mut self.pages, &mut *self.writer))
    }

    /// Registers a record type. Returns false when an identical schema exists.
    pub fn define_type(&mut self, schema: TableSchema) -> Result<bool> {
        self.ensure_active()?;
        if let Ok(existing) = self.table(&schema.type_name) {
            if existing.schema == schema {
                return Ok(false);
            }
            return Err(DatabaseError::SchemaViolation {
                details: format!(
                    "Record type '{}' already exists with a different schema",
                    schema.type_name
                ),
            });
        }

        debug!("Defining record type '{}'", schema.type_name);
        self.tables
            .insert(schema.type_name.clone(), TableState::new(schema));
        Ok(true)
    }

    pub fn schema(&self, type_name: &str) -> Result<&TableSchema> {
        Ok(&self.table(type_name)?.schema)
    }

    pub fn count(&self, type_name: &str) -> Result<usize> {
        Ok(self.table(type_name)?.record_count())
    }

    pub fn next_primary_key(&self, type_name: &str) -> Result<i64> {
        match self.table(type_name) {
            Ok(table) => table.next_primary_key(),
            Err(DatabaseError::TypeNotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Reads a record as this transaction currently sees it.
    pub fn get(&mut self, type_name: &str, key: &PrimaryKey) -> Result<Option<Record>> {
        self.ensure_active()?;
        let result = match self.tables.get(type_name) {
            Some(table) => table.read_record(
                &mut StagedSource {
                    staged: &self.pages,
                    source: &mut self.writer.pager,
                },
                key,
            ),
            None => {
                let table = Arc::clone(self.base.table(type_name)?);
                table.read_record(&mut self.writer.pager, key)
            }
        };
        self.track(result)
    }

    /// Inserts `record`; an existing key is replaced when `upsert` is set and
    /// rejected with `UniquenessViolation` otherwise.
    pub fn write(&mut self, type_name: &str, mut record: Record, upsert: bool) -> Result<()> {
        let (table, pages, writer) = self.parts(type_name)?;
        table.schema.apply_defaults(&mut record);
        table.schema.validate_record(&record)?;
        let key = table.schema.primary_key(&record)?;
        table.ensure_fits(&record)?;

        let exists = table.index.lookup(&key).is_some();
        if exists && !upsert {
            return Err(DatabaseError::UniquenessViolation {
                type_name: type_name.to_string(),
                key: key.to_string(),
            });
        }

        let result = (|| -> Result<()> {
            if exists {
                table.remove_record(pages, &mut writer.pager, &key)?;
            }
            table.insert_record(pages, &mut writer.pager, &record)?;
            Ok(())
        })();
        self.track(result)
    }

    /// Sets the named fields of the record stored under `key`, leaving the
    /// rest untouched. With `upsert` a missing record is created from the
    /// schema defaults first. Returns the record as written.
    pub fn update_fields(
        &mut self,
        type_name: &str,
        key: &PrimaryKey,
        fields: &[(&str, Value)],
        upsert: bool,
    ) -> Result<Record> {
        let (table, pages, writer) = self.parts(type_name)?;

        let mut assignments = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let column = table
                .schema
                .get_column(name)
                .ok_or_else(|| DatabaseError::SchemaViolation {
                    details: format!("Record type '{}' has no field '{}'", type_name, name),
                })?;
            table.schema.validate_value(column, value)?;
            if column.position == table.schema.primary_key_index()
                && PrimaryKey::from_value(value)? != *key
            {
                return Err(DatabaseError::SchemaViolation {
                    details: format!("Primary key of {} cannot be changed", key),
                });
            }
            assignments.push((column.position, value.clone()));
        }

        let result = (|| -> Result<Record> {
            let existing = table.read_record(
                &mut StagedSource {
                    staged: pages,
                    source: &mut writer.pager,
                },
                key,
            )?;
            let exists = existing.is_some();
            let mut record = match existing {
                Some(record) => record,
                None if upsert => table.schema.default_record(key),
                None => {
                    return Err(DatabaseError::RecordNotFound {
                        type_name: type_name.to_string(),
                        key: key.to_string(),
                    });
                }
            };

            for (position, value) in assignments {
                record.set_value(position, value)?;
            }
            table.schema.validate_record(&record)?;
            table.ensure_fits(&record)?;

            if exists {
                table.remove_record(pages, &mut writer.pager, key)?;
            }
            table.insert_record(pages, &mut writer.pager, &record)?;
            Ok(record)
        })();
        self.track(result)
    }

    pub fn delete(&mut self, type_name: &str, record: &Record) -> Result<bool> {
        let key = self.schema(type_name)?.primary_key(record)?;
        self.delete_by_key(type_name, &key)
    }

    pub fn delete_by_key(&mut self, type_name: &str, key: &PrimaryKey) -> Result<bool> {
        let (table, pages, writer) = self.parts(type_name)?;
        let result = table.remove_record(pages, &mut writer.pager, key);
        self.track(result)
    }

    /// Removes every record of `type_name`, or of every type when None.
    /// Schemas stay defined. Returns how many records were removed.
    pub fn delete_all(&mut self, type_name: Option<&str>) -> Result<usize> {
        let names = match type_name {
            Some(name) => {
                self.table(name)?;
                vec![name.to_string()]
            }
            None => {
                let mut names = self.base.type_names();
                names.extend(self.tables.keys().cloned());
                names.sort();
                names.dedup();
                names
            }
        };

        let mut removed = 0;
        for name in names {
            let (table, pages, _) = self.parts(&name)?;
            removed += table.clear(pages);
        }
        Ok(removed)
    }

    pub fn abort(mut self) {
        self.state = TxnState::Aborted;
        debug!("Write transaction on version {} aborted", self.base.version);
    }

    /// Makes every staged change durable and visible to new readers.
    /// Returns the new version, or the base version when nothing changed.
    pub fn commit(mut self) -> Result<Version> {
        self.ensure_active()?;
        if self.tables.is_empty() {
            self.state = TxnState::Committed;
            return Ok(self.base.version);
        }

        self.state = TxnState::Committing;
        match self.commit_inner() {
            Ok(version) => {
                self.state = TxnState::Committed;
                debug!("Committed version {}", version);
                Ok(version)
            }
            Err(e) => {
                self.state = TxnState::Aborted;
                warn!("Commit on version {} failed: {}", self.base.version, e);
                Err(e)
            }
        }
    }

    fn commit_inner(&mut self) -> Result<Version> {
        let version = self.base.version + 1;
        let sync = self.manager.config().sync_on_commit;

        // Index chains of touched types are rebuilt from scratch
        let pages = &mut self.pages;
        for table in self.tables.values_mut() {
            for page_id in table.index_pages.drain(..) {
                pages.free(page_id);
            }
            let chain = table.index.to_pages(&mut || pages.allocate_id())?;
            table.index_pages = chain.iter().map(|page| page.page_id).collect();
            for page in chain {
                pages.write(page)?;
            }
        }

        let mut all_tables: BTreeMap<String, Arc<TableState>> = self.base.tables.clone();
        for (name, table) in &self.tables {
            all_tables.insert(name.clone(), Arc::new(table.clone()));
        }

        for &page_id in &self.base.catalog_pages {
            pages.free(page_id);
        }
        let entries: Vec<CatalogEntry> = all_tables
            .values()
            .map(|table| CatalogEntry {
                schema: table.schema.clone(),
                index_root: table.index_pages.first().copied(),
                record_count: table.record_count() as u64,
            })
            .collect();
        let catalog = write_catalog(&entries, &mut || pages.allocate_id())?;
        let catalog_pages: Vec<PageId> = catalog.iter().map(|page| page.page_id).collect();
        for page in catalog {
            pages.write(page)?;
        }

        let staged = std::mem::take(&mut self.pages);
        let (mut allocator, dirty, freed) = staged.into_parts();
        let writer = &mut *self.writer;
        let freelist = writer.freelist.build_image(&mut allocator, &freed)?;

        let header = StoreHeader {
            commit_version: version,
            page_count: allocator.page_count(),
            freelist_head: freelist.trunks.first().copied().unwrap_or(0),
            freelist_count: freelist.free_count,
            catalog_root: catalog_pages.first().copied().unwrap_or(0),
            type_count: entries.len() as u32,
            ..StoreHeader::default()
        };

        let commit = WalCommit {
            version,
            header: header.to_bytes(),
            pages: dirty
                .iter()
                .chain(freelist.pages.iter())
                .map(|page| (page.page_id, page.to_bytes()))
                .collect(),
        };

        if let Err(e) = writer.wal.append_commit(&commit, sync) {
            // A record that reached the log but was reported as failed must not be replayed
            if let Err(DatabaseError::Io(io)) = writer.wal.reset(sync) {
                writer.failure = Some((io.kind(), io.to_string()));
            }
            return Err(e);
        }
        if let Err(e) = writer.apply(&commit, sync) {
            if let DatabaseError::Io(io) = &e {
                writer.failure = Some((io.kind(), io.to_string()));
            }
            return Err(e);
        }

        writer
            .freelist
            .apply_commit(&allocator, &freed, version, freelist.trunks);
        writer.page_count = allocator.page_count();

        self.manager.publish(Snapshot {
            version,
            tables: all_tables,
            catalog_pages,
        })?;
        Ok(version)
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if self.state == TxnState::Active {
            debug!(
                "Write transaction on version {} dropped without commit; rolling back",
                self.base.version
            );
            self.state = TxnState::Aborted;
        }
    }
}
