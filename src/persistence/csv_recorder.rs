use std::fs::File;
use std::path::{Path, PathBuf};

use super::TradeRecorder;
use crate::error::PersistenceError;
use crate::models::TradeRecord;

/// Writes trade records to a CSV file, flushing after every row
///
/// The header row is written with the first record. Records are also kept in
/// memory so the chart can be redrawn without re-reading the file.
pub struct CsvTradeRecorder {
    writer: csv::Writer<File>,
    path: PathBuf,
    records: Vec<TradeRecord>,
}

impl CsvTradeRecorder {
    /// Create (or truncate) the CSV file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_path(&path)?;

        tracing::info!(path = %path.display(), "Recording trades");

        Ok(Self {
            writer,
            path,
            records: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record in a trade log
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<TradeRecord>, PersistenceError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

impl TradeRecorder for CsvTradeRecorder {
    fn append(&mut self, record: &TradeRecord) -> Result<(), PersistenceError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        self.records.push(record.clone());
        Ok(())
    }

    fn append_batch(&mut self, records: &[TradeRecord]) -> Result<(), PersistenceError> {
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        self.records.extend_from_slice(records);

        tracing::debug!(rows = records.len(), path = %self.path.display(), "Appended batch");
        Ok(())
    }

    fn records(&self) -> &[TradeRecord] {
        &self.records
    }
}
