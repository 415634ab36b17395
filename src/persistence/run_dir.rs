use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;

pub const TRADE_LOG_FILE: &str = "data_trade.csv";
pub const CHART_FILE: &str = "plot.svg";
pub const CONFIG_BACKUP_FILE: &str = "config_backup.json";

const RUN_PREFIX: &str = "run";

/// Output folder of a single bot run (`<runs_dir>/runN`)
#[derive(Debug, Clone)]
pub struct RunDirectory {
    path: PathBuf,
    number: u32,
}

impl RunDirectory {
    /// Create the next free `runN` folder under `runs_dir`
    pub fn create_next(runs_dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let runs_dir = runs_dir.as_ref();
        fs::create_dir_all(runs_dir)?;

        let number = next_run_number(runs_dir)?;
        let path = runs_dir.join(format!("{}{}", RUN_PREFIX, number));
        fs::create_dir(&path)?;

        tracing::info!(path = %path.display(), "Created run folder");

        Ok(Self { path, number })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn trade_log_path(&self) -> PathBuf {
        self.path.join(TRADE_LOG_FILE)
    }

    pub fn chart_path(&self) -> PathBuf {
        self.path.join(CHART_FILE)
    }

    pub fn config_backup_path(&self) -> PathBuf {
        self.path.join(CONFIG_BACKUP_FILE)
    }

    /// Write `value` as pretty JSON into the config backup file
    pub fn write_config_backup<T: Serialize>(&self, value: &T) -> Result<PathBuf, PersistenceError> {
        let path = self.config_backup_path();
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, value)?;
        Ok(path)
    }
}

/// One past the highest existing `runN`, starting at 1
fn next_run_number(runs_dir: &Path) -> Result<u32, PersistenceError> {
    let mut highest = 0;
    for entry in fs::read_dir(runs_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let number = name
            .to_str()
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(n) = number {
            highest = highest.max(n);
        }
    }
    Ok(highest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("emabot-{}-{}", name, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_first_run_is_run1() {
        let root = scratch_dir("runs");
        let run = RunDirectory::create_next(root.join("live_runs")).unwrap();

        assert_eq!(run.number(), 1);
        assert!(run.path().ends_with("run1"));
        assert!(run.path().is_dir());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_numbers_continue_after_existing_runs() {
        let root = scratch_dir("runs");
        fs::create_dir(root.join("run1")).unwrap();
        fs::create_dir(root.join("run4")).unwrap();
        fs::create_dir(root.join("notes")).unwrap();
        fs::write(root.join("run9"), b"a file, not a run").unwrap();

        let run = RunDirectory::create_next(&root).unwrap();
        assert_eq!(run.number(), 5);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_config_backup_is_json() {
        let root = scratch_dir("runs");
        let run = RunDirectory::create_next(&root).unwrap();

        let path = run
            .write_config_backup(&serde_json::json!({ "symbol": "BTCUSD_PERP" }))
            .unwrap();
        let text = fs::read_to_string(path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["symbol"], "BTCUSD_PERP");
        fs::remove_dir_all(root).unwrap();
    }
}
