use crate::{
    executor::predicate::Predicate,
    storage::schema::TableSchema,
    types::{error::Result, record::Record, value::Value},
};

/// A record together with its schema, so fields can be read by name.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    pub record: &'a Record,
    pub schema: &'a TableSchema,
}

impl<'a> RecordView<'a> {
    pub fn new(record: &'a Record, schema: &'a TableSchema) -> Self {
        Self { record, schema }
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        let index = self.schema.get_column_index(field)?;
        self.record.get_value(index)
    }

    pub fn get_integer(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_real(&self, field: &str) -> Option<f64> {
        self.get(field)?.coerce_to_number()
    }

    pub fn get_text(&self, field: &str) -> Option<&'a str> {
        match self.get(field)? {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Decides which records a fetch returns.
pub trait RecordFilter {
    /// Checked once before any record is read.
    fn validate(&self, _schema: &TableSchema) -> Result<()> {
        Ok(())
    }

    fn matches(&self, view: &RecordView<'_>) -> Result<bool>;
}

impl RecordFilter for Predicate {
    fn validate(&self, schema: &TableSchema) -> Result<()> {
        self.validate_against_schema(schema)
    }

    fn matches(&self, view: &RecordView<'_>) -> Result<bool> {
        self.evaluate(view.record, view.schema)
    }
}

/// Filter backed by a plain closure.
pub struct FnFilter<F> {
    f: F,
}

pub fn filter_fn<F>(f: F) -> FnFilter<F>
where
    F: Fn(&RecordView<'_>) -> bool,
{
    FnFilter { f }
}

impl<F> RecordFilter for FnFilter<F>
where
    F: Fn(&RecordView<'_>) -> bool,
{
    fn matches(&self, view: &RecordView<'_>) -> Result<bool> {
        Ok((self.f)(view))
    }
}
