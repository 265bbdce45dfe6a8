use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{
    config::StoreConfig,
    storage::{
        schema::{ColumnSchema, TableSchema},
        wal::wal_path,
    },
    store::Store,
    types::{
        error::Result,
        record::Record,
        value::{DataType, Value},
    },
};

/// Scratch location for a store file, removed with everything next to it on drop.
pub struct TempStore {
    dir: TempDir,
    path: PathBuf,
}

impl TempStore {
    pub fn new() -> std::io::Result<Self> {
        Self::with_prefix("coffer_test")
    }

    pub fn with_prefix(prefix: &str) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        let path = dir.path().join("store.db");
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn wal_path(&self) -> PathBuf {
        wal_path(&self.path)
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Opens the store without fsync so tests stay fast.
    pub fn open(&self) -> Result<Store> {
        self.open_with(StoreConfig::default().with_sync_on_commit(false))
    }

    pub fn open_with(&self, config: StoreConfig) -> Result<Store> {
        Store::open_with_config(&self.path, config)
    }

    pub fn file_size(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

/// `Dog { id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER, good BOOLEAN DEFAULT true }`
pub fn dog_schema() -> Result<TableSchema> {
    TableSchema::new(
        "Dog",
        vec![
            ColumnSchema::new("id", DataType::Integer, 0).primary_key(),
            ColumnSchema::new("name", DataType::Text, 1).not_null(),
            ColumnSchema::new("age", DataType::Integer, 2),
            ColumnSchema::new("good", DataType::Boolean, 3).with_default(Value::Boolean(true)),
        ],
    )
}

pub fn dog(id: i64, name: &str, age: i64) -> Record {
    Record::new(vec![
        Value::Integer(id),
        Value::Text(name.to_string()),
        Value::Integer(age),
        Value::Boolean(true),
    ])
}
