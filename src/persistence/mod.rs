//! Trade history persistence
//!
//! Every run gets its own numbered folder holding the CSV trade log, the
//! chart and a backup of the effective configuration.

mod csv_recorder;
mod run_dir;

pub use csv_recorder::CsvTradeRecorder;
pub use run_dir::{RunDirectory, CHART_FILE, CONFIG_BACKUP_FILE, TRADE_LOG_FILE};

use crate::error::PersistenceError;
use crate::models::TradeRecord;

/// Append-only sink for per-cycle trade records
pub trait TradeRecorder: Send {
    fn append(&mut self, record: &TradeRecord) -> Result<(), PersistenceError>;

    fn append_batch(&mut self, records: &[TradeRecord]) -> Result<(), PersistenceError> {
        for record in records {
            self.append(record)?;
        }
        Ok(())
    }

    /// Everything appended so far, in order
    fn records(&self) -> &[TradeRecord];
}

/// Recorder that only keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Vec<TradeRecord>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TradeRecorder for MemoryRecorder {
    fn append(&mut self, record: &TradeRecord) -> Result<(), PersistenceError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn records(&self) -> &[TradeRecord] {
        &self.records
    }
}

impl<T: TradeRecorder + ?Sized> TradeRecorder for Box<T> {
    fn append(&mut self, record: &TradeRecord) -> Result<(), PersistenceError> {
        (**self).append(record)
    }

    fn append_batch(&mut self, records: &[TradeRecord]) -> Result<(), PersistenceError> {
        (**self).append_batch(records)
    }

    fn records(&self) -> &[TradeRecord] {
        (**self).records()
    }
}
