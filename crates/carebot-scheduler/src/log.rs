//! Append-only record of dispatch attempts.
//!
//! The file format is JSON Lines, one [`DispatchOutcome`] per line:
//!
//! ```text
//! {"job_id":"weekly_call","scheduled_for":"2026-03-01T18:00:00Z","fired_at":"2026-03-01T18:00:00.120Z","delivered":true,"error":null}
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, SchedulerError};
use crate::types::DispatchOutcome;

/// Sink for dispatch outcomes. Written once per firing, never rewritten.
pub trait ActivityLog: Send + Sync {
    fn append(&self, outcome: &DispatchOutcome) -> Result<()>;
}

/// JSON Lines file log.
pub struct JsonlActivityLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonlActivityLog {
    /// The file and its parent directory are created on the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in `path`. A missing file reads as empty.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<DispatchOutcome>> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(log_err(path, e)),
        };
        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| log_err(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                SchedulerError::ActivityLog(format!("{}:{}: {e}", path.display(), n + 1))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| log_err(parent, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| log_err(&self.path, e))
    }
}

impl ActivityLog for JsonlActivityLog {
    fn append(&self, outcome: &DispatchOutcome) -> Result<()> {
        let mut line = serde_json::to_string(outcome)
            .map_err(|e| SchedulerError::ActivityLog(e.to_string()))?;
        line.push('\n');

        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        let Some(file) = guard.as_mut() else {
            return Err(SchedulerError::ActivityLog("log file not open".to_string()));
        };
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        if let Err(e) = written {
            // Reopen on the next append.
            *guard = None;
            return Err(log_err(&self.path, e));
        }
        Ok(())
    }
}

/// In-process log, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    records: Mutex<Vec<DispatchOutcome>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DispatchOutcome> {
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn append(&self, outcome: &DispatchOutcome) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(outcome.clone());
        Ok(())
    }
}

fn log_err(path: &Path, e: std::io::Error) -> SchedulerError {
    SchedulerError::ActivityLog(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobId;
    use chrono::{TimeZone, Utc};

    fn outcome(job: &str, delivered: bool, error: Option<&str>) -> DispatchOutcome {
        let t = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        DispatchOutcome {
            job_id: JobId::from(job),
            scheduled_for: t,
            fired_at: t,
            delivered,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn appends_one_line_per_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("activity.jsonl");
        let log = JsonlActivityLog::new(&path);

        log.append(&outcome("monthly_support", true, None)).unwrap();
        log.append(&outcome("weekly_call", false, Some("Delivery failed: 502")))
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.lines().all(|l| l.starts_with("{\"job_id\":")));

        let records = JsonlActivityLog::read_all(&path).unwrap();
        assert_eq!(records[0], outcome("monthly_support", true, None));
        assert!(!records[1].delivered);
        assert_eq!(records[1].error.as_deref(), Some("Delivery failed: 502"));
    }

    #[test]
    fn existing_records_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        JsonlActivityLog::new(&path)
            .append(&outcome("a", true, None))
            .unwrap();
        JsonlActivityLog::new(&path)
            .append(&outcome("b", true, None))
            .unwrap();

        let ids: Vec<_> = JsonlActivityLog::read_all(&path)
            .unwrap()
            .into_iter()
            .map(|r| r.job_id.0)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlActivityLog::read_all(dir.path().join("none.jsonl"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn corrupt_line_is_reported_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        fs::write(&path, "not json\n").unwrap();
        let err = JsonlActivityLog::read_all(&path).unwrap_err();
        assert!(err.to_string().contains(":1:"));
    }
}
