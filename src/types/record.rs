use serde::{Deserialize, Serialize};

use crate::{
    types::{
        error::{DatabaseError, Result},
        value::Value,
    },
    utils::bytes::read_u32_le,
};

/// A typed tuple of field values, ordered by the owning schema's column positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get_value(&self, column_index: usize) -> Option<&Value> {
        self.values.get(column_index)
    }

    pub fn set_value(&mut self, column_index: usize, value: Value) -> Result<()> {
        let slot = self.values.get_mut(column_index).ok_or_else(|| {
            DatabaseError::SchemaViolation {
                details: format!("Column index {} out of bounds", column_index),
            }
        })?;
        *slot = value;
        Ok(())
    }

    pub fn size(&self) -> usize {
        4 + self.values.iter().map(Value::serialized_size).sum::<usize>()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.size());

        // Value count
        buffer.extend_from_slice(&(self.values.len() as u32).to_le_bytes());

        for value in &self.values {
            value.write_to(&mut buffer);
        }

        buffer
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value_count = read_u32_le(bytes, 0, "value count")? as usize;
        let mut cursor = 4;

        let mut values = Vec::with_capacity(value_count.min(bytes.len()));
        for _ in 0..value_count {
            let (value, consumed) = Value::decode(&bytes[cursor..])?;
            values.push(value);
            cursor += consumed;
        }

        if cursor != bytes.len() {
            return Err(DatabaseError::SerializationError {
                details: format!(
                    "Record has {} trailing bytes",
                    bytes.len() - cursor
                ),
            });
        }

        Ok(Record { values })
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Record::new(values)
    }
}
