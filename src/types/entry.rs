use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    types::{
        MAX_KEY_SIZE, PageId, SlotId,
        error::{DatabaseError, Result},
        value::Value,
    },
    utils::bytes::{read_i64_le, read_slice, read_u16_le, read_u32_le, read_u64_le},
};

const KEY_INTEGER: u8 = 1;
const KEY_TEXT: u8 = 2;

/// Primary key of a record. Ordered the same way the index and key-sorted queries are.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimaryKey {
    Integer(i64),
    Text(String),
}

impl PrimaryKey {
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(PrimaryKey::Integer(*i)),
            Value::Text(s) => {
                if s.len() > MAX_KEY_SIZE {
                    return Err(DatabaseError::RecordTooLarge {
                        size: s.len(),
                        max: MAX_KEY_SIZE,
                    });
                }
                Ok(PrimaryKey::Text(s.clone()))
            }
            other => Err(DatabaseError::SchemaViolation {
                details: format!("{} cannot be used as a primary key", other),
            }),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PrimaryKey::Integer(i) => Value::Integer(*i),
            PrimaryKey::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Integer(i) => write!(f, "{}", i),
            PrimaryKey::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(v: i64) -> Self {
        PrimaryKey::Integer(v)
    }
}

impl From<&str> for PrimaryKey {
    fn from(v: &str) -> Self {
        PrimaryKey::Text(v.to_string())
    }
}

/// Where a record cell lives: data page plus slot in that page's directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub page_id: PageId,
    pub slot: SlotId,
}

impl Location {
    pub fn new(page_id: PageId, slot: SlotId) -> Self {
        Self { page_id, slot }
    }
}

/// One cell of an index page.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub key: PrimaryKey,
    pub location: Location,
}

impl IndexEntry {
    pub fn new(key: PrimaryKey, location: Location) -> Self {
        Self { key, location }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        match &self.key {
            PrimaryKey::Integer(i) => {
                bytes.push(KEY_INTEGER);
                bytes.extend_from_slice(&i.to_le_bytes());
            }
            PrimaryKey::Text(s) => {
                bytes.push(KEY_TEXT);
                bytes.extend_from_slice(&(s.len() as u32).to_le_bytes());
                bytes.extend_from_slice(s.as_bytes());
            }
        }

        bytes.extend_from_slice(&self.location.page_id.to_le_bytes());
        bytes.extend_from_slice(&self.location.slot.to_le_bytes());

        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize)> {
        let type_marker = *bytes.first().ok_or_else(|| DatabaseError::SerializationError {
            details: "Empty bytes for IndexEntry".to_string(),
        })?;
        let mut offset = 1;

        let key = match type_marker {
            KEY_INTEGER => {
                let value = read_i64_le(bytes, offset, "Integer key")?;
                offset += 8;
                PrimaryKey::Integer(value)
            }
            KEY_TEXT => {
                let len = read_u32_le(bytes, offset, "Text key length")? as usize;
                offset += 4;
                let raw = read_slice(bytes, offset, len, "Text key data")?;
                let text = String::from_utf8(raw.to_vec()).map_err(|_| {
                    DatabaseError::SerializationError {
                        details: "Invalid UTF-8 in Text key".to_string(),
                    }
                })?;
                offset += len;
                PrimaryKey::Text(text)
            }
            other => {
                return Err(DatabaseError::SerializationError {
                    details: format!("Unknown key type marker {}", other),
                });
            }
        };

        let page_id = read_u64_le(bytes, offset, "page_id")?;
        offset += 8;
        let slot = read_u16_le(bytes, offset, "slot")?;
        offset += 2;

        Ok((Self::new(key, Location::new(page_id, slot)), offset))
    }
}
