use std::path::Path;

use log::debug;

use crate::{
    executor::{
        filter::{RecordFilter, RecordView},
        scan::Scanner,
    },
    storage::{
        pager::{PageReader, PageSource},
        table::{TableState, decode_cell},
    },
    types::{
        entry::{Location, PrimaryKey},
        error::{DatabaseError, Result},
        page::Page,
        record::Record,
    },
};

type IndexCursor<'a> = Box<dyn Iterator<Item = (&'a PrimaryKey, &'a Location)> + 'a>;

/// Walks one record type in primary key order, reading records from a
/// snapshot's data pages through its own file handle.
pub struct IndexScanner<'a> {
    table: &'a TableState,
    reader: PageReader,
    ascending: bool,
    filter: Option<&'a dyn RecordFilter>,
    cursor: IndexCursor<'a>,
    current_page: Option<Page>,
    is_exhausted: bool,
}

impl<'a> IndexScanner<'a> {
    pub fn new(
        path: &Path,
        table: &'a TableState,
        ascending: bool,
        filter: Option<&'a dyn RecordFilter>,
    ) -> Result<Self> {
        if let Some(filter) = filter {
            filter.validate(&table.schema)?;
        }
        let reader = PageReader::open(path)?;
        debug!(
            "Index scan over '{}' ({} records, ascending={})",
            table.schema.type_name,
            table.record_count(),
            ascending
        );
        Ok(Self {
            table,
            reader,
            ascending,
            filter,
            cursor: table.index.range(ascending),
            current_page: None,
            is_exhausted: false,
        })
    }

    fn load_record(&mut self, key: &PrimaryKey, location: Location) -> Result<Record> {
        let cached = self
            .current_page
            .as_ref()
            .is_some_and(|page| page.page_id == location.page_id);
        if !cached {
            self.current_page = Some(self.reader.read_page(location.page_id)?);
        }

        match &self.current_page {
            Some(page) => decode_cell(page, location, &self.table.schema, key),
            None => Err(DatabaseError::CorruptPage {
                page_id: location.page_id,
                reason: "Page cache empty after load".to_string(),
            }),
        }
    }

    fn next_match(&mut self) -> Result<Option<Record>> {
        while let Some((key, location)) = self.cursor.next() {
            let record = self.load_record(key, *location)?;
            let keep = match self.filter {
                Some(filter) => filter.matches(&RecordView::new(&record, &self.table.schema))?,
                None => true,
            };
            if keep {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

impl Scanner for IndexScanner<'_> {
    fn scan(&mut self) -> Result<Option<Record>> {
        if self.is_exhausted {
            return Ok(None);
        }
        match self.next_match() {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                self.is_exhausted = true;
                Ok(None)
            }
            Err(e) => {
                self.is_exhausted = true;
                Err(e)
            }
        }
    }

    fn scan_batch(&mut self, batch_size: usize) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match self.scan()? {
                Some(record) => records.push(record),
                None => break,
            }
        }
        Ok(records)
    }

    fn reset(&mut self) -> Result<()> {
        self.cursor = self.table.index.range(self.ascending);
        self.current_page = None;
        self.is_exhausted = false;
        Ok(())
    }
}
