use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    types::error::{DatabaseError, Result},
    utils::bytes::{read_i64_le, read_slice, read_u32_le},
};

const TAG_NULL: u8 = 0;
const TAG_INTEGER: u8 = 1;
const TAG_REAL: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_BLOB: u8 = 4;
const TAG_BOOLEAN: u8 = 5;
const TAG_TIMESTAMP: u8 = 6;

/// Declared kind of a field. `Null` is a value, never a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
    Timestamp,
}

impl DataType {
    pub fn from_string(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => Ok(DataType::Integer),
            "REAL" | "FLOAT" | "DOUBLE" => Ok(DataType::Real),
            "TEXT" | "STRING" => Ok(DataType::Text),
            "BLOB" | "BYTES" => Ok(DataType::Blob),
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            "TIMESTAMP" | "DATE" => Ok(DataType::Timestamp),
            other => Err(DatabaseError::SchemaViolation {
                details: format!("Unknown data type '{}'", other),
            }),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Real => "REAL",
            DataType::Text => "TEXT",
            DataType::Blob => "BLOB",
            DataType::Boolean => "BOOLEAN",
            DataType::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(DataType::Integer),
            Value::Real(_) => Some(DataType::Real),
            Value::Text(_) => Some(DataType::Text),
            Value::Blob(_) => Some(DataType::Blob),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Timestamp(_) => Some(DataType::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null fits every column type; nullability is checked by the schema.
    pub fn is_compatible_with_type(&self, data_type: &DataType) -> bool {
        match self.data_type() {
            None => true,
            Some(own) => own == *data_type,
        }
    }

    pub fn coerce_to_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn serialized_size(&self) -> usize {
        1 + match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Real(_) | Value::Timestamp(_) => 8,
            Value::Text(s) => 4 + s.len(),
            Value::Blob(b) => 4 + b.len(),
            Value::Boolean(_) => 1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.serialized_size());
        self.write_to(&mut buffer);
        buffer
    }

    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        match self {
            Value::Null => buffer.push(TAG_NULL),
            Value::Integer(i) => {
                buffer.push(TAG_INTEGER);
                buffer.extend_from_slice(&i.to_le_bytes());
            }
            Value::Real(r) => {
                buffer.push(TAG_REAL);
                buffer.extend_from_slice(&r.to_le_bytes());
            }
            Value::Text(s) => {
                buffer.push(TAG_TEXT);
                buffer.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buffer.extend_from_slice(s.as_bytes());
            }
            Value::Blob(b) => {
                buffer.push(TAG_BLOB);
                buffer.extend_from_slice(&(b.len() as u32).to_le_bytes());
                buffer.extend_from_slice(b);
            }
            Value::Boolean(b) => {
                buffer.push(TAG_BOOLEAN);
                buffer.push(u8::from(*b));
            }
            Value::Timestamp(ts) => {
                buffer.push(TAG_TIMESTAMP);
                buffer.extend_from_slice(&ts.timestamp_micros().to_le_bytes());
            }
        }
    }

    /// Decode one value from the front of `bytes`, returning it with the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        let tag = *bytes.first().ok_or_else(|| DatabaseError::SerializationError {
            details: "Empty value bytes".to_string(),
        })?;

        match tag {
            TAG_NULL => Ok((Value::Null, 1)),
            TAG_INTEGER => Ok((Value::Integer(read_i64_le(bytes, 1, "Integer")?), 9)),
            TAG_REAL => {
                let bits = read_i64_le(bytes, 1, "Real")? as u64;
                Ok((Value::Real(f64::from_bits(bits)), 9))
            }
            TAG_TEXT => {
                let len = read_u32_le(bytes, 1, "Text length")? as usize;
                let raw = read_slice(bytes, 5, len, "Text data")?;
                let text = String::from_utf8(raw.to_vec()).map_err(|_| {
                    DatabaseError::SerializationError {
                        details: "Invalid UTF-8 in Text value".to_string(),
                    }
                })?;
                Ok((Value::Text(text), 5 + len))
            }
            TAG_BLOB => {
                let len = read_u32_le(bytes, 1, "Blob length")? as usize;
                let raw = read_slice(bytes, 5, len, "Blob data")?;
                Ok((Value::Blob(raw.to_vec()), 5 + len))
            }
            TAG_BOOLEAN => {
                let raw = read_slice(bytes, 1, 1, "Boolean")?;
                Ok((Value::Boolean(raw[0] != 0), 2))
            }
            TAG_TIMESTAMP => {
                let micros = read_i64_le(bytes, 1, "Timestamp")?;
                let ts = DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
                    DatabaseError::SerializationError {
                        details: format!("Timestamp out of range: {}", micros),
                    }
                })?;
                Ok((Value::Timestamp(ts), 9))
            }
            other => Err(DatabaseError::SerializationError {
                details: format!("Unknown type discriminant: {}", other),
            }),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(bytes).map(|(value, _)| value)
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Real(_) => 2,
            Value::Text(_) => 3,
            Value::Blob(_) => 4,
            Value::Timestamp(_) => 5,
        }
    }

    /// Total order used for sorting: nulls first, then by kind, numbers compared numerically.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Real(b)) => (*a as f64).total_cmp(b),
            (Value::Real(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Real(a), Value::Real(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Real(b)) => (*a as f64).partial_cmp(b),
            (Value::Real(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.partial_cmp(b),
            _ => None, // Mixed types
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}
