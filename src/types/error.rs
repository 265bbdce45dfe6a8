use thiserror::Error;

use crate::types::PageId;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage full: cannot grow beyond {max_pages} pages")]
    StorageFull { max_pages: u64 },

    #[error("Page is full (page_id: {page_id})")]
    PageFull { page_id: PageId },

    #[error("Invalid slot index {index} (max: {max})")]
    InvalidSlotIndex { index: usize, max: usize },

    #[error("Corrupted page: page_id={page_id}, reason={reason}")]
    CorruptPage { page_id: PageId, reason: String },

    #[error("Invalid page type: {0}")]
    InvalidPageType(u8),

    #[error("Invalid page size: {expected} bytes, got {actual} bytes")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("Invalid store header: {reason}")]
    InvalidHeader { reason: String },

    #[error("Serialization/deserialization error: {details}")]
    SerializationError { details: String },

    #[error("Record type '{name}' not found")]
    TypeNotFound { name: String },

    #[error("Column '{name}' not found in record type '{type_name}'")]
    ColumnNotFound { name: String, type_name: String },

    #[error("Schema violation: {details}")]
    SchemaViolation { details: String },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Primary key {key} already exists in '{type_name}'")]
    UniquenessViolation { type_name: String, key: String },

    #[error("No record with primary key {key} in '{type_name}'")]
    RecordNotFound { type_name: String, key: String },

    #[error("Record of {size} bytes exceeds the {max} byte limit")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Another write transaction is active")]
    WriteConflict,

    #[error("Concurrent access violation")]
    ConcurrencyError,

    #[error("Transaction aborted: {reason}")]
    TransactionAborted { reason: String },
}

impl DatabaseError {
    /// Errors the caller can retry or report without treating the store as broken.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DatabaseError::UniquenessViolation { .. } | DatabaseError::WriteConflict
        )
    }

    /// Errors that leave a write transaction's staged state unusable.
    pub fn aborts_transaction(&self) -> bool {
        matches!(
            self,
            DatabaseError::Io(_)
                | DatabaseError::StorageFull { .. }
                | DatabaseError::CorruptPage { .. }
                | DatabaseError::PageFull { .. }
                | DatabaseError::InvalidSlotIndex { .. }
                | DatabaseError::SerializationError { .. }
                | DatabaseError::ConcurrencyError
        )
    }
}

impl From<bincode::error::EncodeError> for DatabaseError {
    fn from(err: bincode::error::EncodeError) -> Self {
        DatabaseError::SerializationError {
            details: err.to_string(),
        }
    }
}

impl From<bincode::error::DecodeError> for DatabaseError {
    fn from(err: bincode::error::DecodeError) -> Self {
        DatabaseError::SerializationError {
            details: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
