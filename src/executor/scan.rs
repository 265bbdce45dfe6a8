use crate::types::{error::Result, record::Record};

pub trait Scanner {
    fn scan(&mut self) -> Result<Option<Record>>;
    fn scan_batch(&mut self, batch_size: usize) -> Result<Vec<Record>>;
    fn reset(&mut self) -> Result<()>;
}

pub struct ScanIterator<S: Scanner> {
    scanner: S,
}

impl<S: Scanner> ScanIterator<S> {
    pub fn new(scanner: S) -> Self {
        Self { scanner }
    }

    /// Restarts the underlying scan from its first record.
    pub fn rewind(&mut self) -> Result<()> {
        self.scanner.reset()
    }

    pub fn next_batch(&mut self, batch_size: usize) -> Result<Vec<Record>> {
        self.scanner.scan_batch(batch_size)
    }
}

impl<S: Scanner> Iterator for ScanIterator<S> {
    type Item = Result<Record>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.scanner.scan() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
