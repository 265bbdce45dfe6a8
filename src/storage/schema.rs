use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{
    entry::PrimaryKey,
    error::{DatabaseError, Result},
    record::Record,
    value::{DataType, Value},
};

/// Represents a field definition in a record type schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: DataType,
    pub position: usize,
    pub nullable: bool,
    pub default_value: Option<Value>,
    pub primary_key: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: DataType, position: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            position,
            nullable: true,
            default_value: None,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default_value: Value) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false; // Primary keys are always NOT NULL
        self
    }
}

/// Schema shared by every record of one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub type_name: String,
    pub columns: Vec<ColumnSchema>,
    primary_key_index: usize,
}

impl TableSchema {
    pub fn new(type_name: impl Into<String>, mut columns: Vec<ColumnSchema>) -> Result<Self> {
        let type_name = type_name.into();
        if type_name.is_empty() {
            return Err(DatabaseError::SchemaViolation {
                details: "Record type name must not be empty".to_string(),
            });
        }

        if columns.is_empty() {
            return Err(DatabaseError::SchemaViolation {
                details: format!("Record type '{}' must have at least one field", type_name),
            });
        }

        let mut column_names = HashSet::new();
        for column in &columns {
            if !column_names.insert(column.name.as_str()) {
                return Err(DatabaseError::SchemaViolation {
                    details: format!("Duplicate field name: {}", column.name),
                });
            }
        }

        // Positions must be exactly 0, 1, 2, ...
        columns.sort_by_key(|col| col.position);
        for (i, column) in columns.iter().enumerate() {
            if column.position != i {
                return Err(DatabaseError::SchemaViolation {
                    details: format!(
                        "Field positions must be sequential starting from 0, found {} at index {}",
                        column.position, i
                    ),
                });
            }
        }

        let primary_keys: Vec<usize> = columns
            .iter()
            .filter(|col| col.primary_key)
            .map(|col| col.position)
            .collect();
        let primary_key_index = match primary_keys.as_slice() {
            [index] => *index,
            [] => {
                return Err(DatabaseError::SchemaViolation {
                    details: format!("Record type '{}' declares no primary key", type_name),
                });
            }
            _ => {
                return Err(DatabaseError::SchemaViolation {
                    details: format!(
                        "Record type '{}' declares {} primary keys, expected one",
                        type_name,
                        primary_keys.len()
                    ),
                });
            }
        };

        let pk_type = columns[primary_key_index].data_type;
        if !matches!(pk_type, DataType::Integer | DataType::Text) {
            return Err(DatabaseError::SchemaViolation {
                details: format!("Primary key must be INTEGER or TEXT, got {}", pk_type),
            });
        }

        for column in &columns {
            if let Some(default) = &column.default_value {
                if !default.is_compatible_with_type(&column.data_type) {
                    return Err(DatabaseError::TypeMismatch {
                        expected: column.data_type.to_string(),
                        actual: default.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            type_name,
            columns,
            primary_key_index,
        })
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Get column index by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }

    pub fn primary_key_index(&self) -> usize {
        self.primary_key_index
    }

    pub fn primary_key_column(&self) -> &ColumnSchema {
        &self.columns[self.primary_key_index]
    }

    pub fn primary_key(&self, record: &Record) -> Result<PrimaryKey> {
        let value = record
            .get_value(self.primary_key_index)
            .ok_or_else(|| DatabaseError::SchemaViolation {
                details: format!("Record is missing primary key '{}'", self.primary_key_column().name),
            })?;
        PrimaryKey::from_value(value)
    }

    /// Validate a record against this schema
    pub fn validate_record(&self, record: &Record) -> Result<()> {
        if record.values.len() != self.columns.len() {
            return Err(DatabaseError::SchemaViolation {
                details: format!(
                    "Record has {} values but '{}' expects {} fields",
                    record.values.len(),
                    self.type_name,
                    self.columns.len()
                ),
            });
        }

        for (column, value) in self.columns.iter().zip(record.values.iter()) {
            self.validate_value(column, value)?;
        }

        Ok(())
    }

    pub fn validate_value(&self, column: &ColumnSchema, value: &Value) -> Result<()> {
        if !column.nullable && value.is_null() {
            return Err(DatabaseError::SchemaViolation {
                details: format!("Field '{}' cannot be NULL", column.name),
            });
        }

        if !value.is_compatible_with_type(&column.data_type) {
            return Err(DatabaseError::TypeMismatch {
                expected: format!("{} for field '{}'", column.data_type, column.name),
                actual: value.to_string(),
            });
        }

        Ok(())
    }

    /// A record holding only defaults (or NULL) plus the given primary key.
    pub fn default_record(&self, key: &PrimaryKey) -> Record {
        let values = self
            .columns
            .iter()
            .map(|column| {
                if column.position == self.primary_key_index {
                    key.to_value()
                } else {
                    column.default_value.clone().unwrap_or(Value::Null)
                }
            })
            .collect();
        Record::new(values)
    }

    /// Fill NULL fields that declare a default value
    pub fn apply_defaults(&self, record: &mut Record) {
        while record.values.len() < self.columns.len() {
            record.values.push(Value::Null);
        }

        for column in &self.columns {
            if let Some(default_value) = &column.default_value {
                if record.values[column.position].is_null() {
                    record.values[column.position] = default_value.clone();
                }
            }
        }
    }
}
