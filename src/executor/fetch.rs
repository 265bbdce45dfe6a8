use std::path::Path;

use crate::{
    executor::{
        filter::RecordFilter,
        index_scan::IndexScanner,
        scan::ScanIterator,
    },
    storage::table::TableState,
    types::{
        error::{DatabaseError, Result},
        record::Record,
        value::Value,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Records produced by a fetch. Key-ordered fetches stream lazily from the
/// snapshot; fetches sorted on another field are materialized first.
pub enum Fetch<'a> {
    Streaming(ScanIterator<IndexScanner<'a>>),
    Sorted(std::vec::IntoIter<Record>),
}

impl Iterator for Fetch<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Fetch::Streaming(iter) => iter.next(),
            Fetch::Sorted(iter) => iter.next().map(Ok),
        }
    }
}

pub fn fetch<'a>(
    path: &Path,
    table: &'a TableState,
    filter: Option<&'a dyn RecordFilter>,
) -> Result<Fetch<'a>> {
    let scanner = IndexScanner::new(path, table, true, filter)?;
    Ok(Fetch::Streaming(ScanIterator::new(scanner)))
}

/// Records ordered by `sort_field`. Records with equal sort values keep
/// primary key order.
pub fn fetch_sorted<'a>(
    path: &Path,
    table: &'a TableState,
    filter: Option<&'a dyn RecordFilter>,
    sort_field: &str,
    order: SortOrder,
) -> Result<Fetch<'a>> {
    let column = table
        .schema
        .get_column_index(sort_field)
        .ok_or_else(|| DatabaseError::ColumnNotFound {
            name: sort_field.to_string(),
            type_name: table.schema.type_name.clone(),
        })?;

    if column == table.schema.primary_key_index() {
        let scanner = IndexScanner::new(path, table, order == SortOrder::Ascending, filter)?;
        return Ok(Fetch::Streaming(ScanIterator::new(scanner)));
    }

    let scanner = IndexScanner::new(path, table, true, filter)?;
    let mut records = ScanIterator::new(scanner).collect::<Result<Vec<Record>>>()?;
    records.sort_by(|a, b| {
        let left = a.get_value(column).unwrap_or(&Value::Null);
        let right = b.get_value(column).unwrap_or(&Value::Null);
        match order {
            SortOrder::Ascending => left.sort_cmp(right),
            SortOrder::Descending => right.sort_cmp(left),
        }
    });
    Ok(Fetch::Sorted(records.into_iter()))
}
