pub mod config;
pub mod executor;
pub mod storage;
pub mod store;
pub mod txn;
pub mod types;
pub mod utils;

pub use config::{StoreConfig, WritePolicy};
pub use executor::{
    fetch::SortOrder,
    filter::{RecordFilter, RecordView, filter_fn},
    predicate::{Predicate, PredicateBuilder},
};
pub use storage::schema::{ColumnSchema, TableSchema};
pub use store::Store;
pub use types::{
    entry::PrimaryKey,
    error::{DatabaseError, Result},
    record::Record,
    value::{DataType, Value},
};
