//! Installation history.
//!
//! Every install attempt the engine finishes is appended to a JSON-lines file,
//! one [`InstallRecord`] per line. Appending never rewrites earlier lines, so
//! an interrupted run still leaves a readable history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, WinPersonaError};
use crate::types::InstallStatus;

/// One finished install attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    pub app: String,
    pub package_id: String,
    pub status: InstallStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Aggregate view of the history file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub last_run: Option<DateTime<Utc>>,
}

/// JSON-lines history file.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub fn append(&self, record: &InstallRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                WinPersonaError::history(format!("Cannot open {}: {}", self.path.display(), e))
            })?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// All records, oldest first. Malformed lines are skipped with a warning.
    pub fn load(&self) -> Result<Vec<InstallRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<InstallRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(line = lineno + 1, "Skipping malformed history line: {}", e),
            }
        }
        Ok(records)
    }

    /// The `n` most recent records, newest first.
    pub fn recent(&self, n: usize) -> Result<Vec<InstallRecord>> {
        let mut records = self.load()?;
        records.reverse();
        records.truncate(n);
        Ok(records)
    }

    /// Records for one application (case-insensitive), newest first.
    pub fn for_app(&self, app: &str) -> Result<Vec<InstallRecord>> {
        let mut records: Vec<InstallRecord> = self
            .load()?
            .into_iter()
            .filter(|r| r.app.eq_ignore_ascii_case(app))
            .collect();
        records.reverse();
        Ok(records)
    }

    pub fn summary(&self) -> Result<HistorySummary> {
        let records = self.load()?;
        let mut summary = HistorySummary {
            total: records.len(),
            ..Default::default()
        };
        for record in &records {
            *summary.by_status.entry(record.status.to_string()).or_insert(0) += 1;
            if summary.last_run.is_none_or(|t| record.timestamp > t) {
                summary.last_run = Some(record.timestamp);
            }
        }
        Ok(summary)
    }

    /// Delete the history file.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            tracing::info!(path = %self.path.display(), "History cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(app: &str, status: InstallStatus, minute: u32) -> InstallRecord {
        InstallRecord {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap(),
            persona: Some("Developer".into()),
            app: app.into(),
            package_id: format!("Test.{}", app),
            status,
            attempts: 1,
            duration_ms: 1500,
            message: None,
        }
    }

    #[test]
    fn test_append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("logs").join("history.jsonl"));
        assert!(history.load().unwrap().is_empty());

        history.append(&record("Git", InstallStatus::Installed, 0)).unwrap();
        history.append(&record("VLC", InstallStatus::Failed, 1)).unwrap();

        let records = history.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].app, "Git");
        assert_eq!(records[1].status, InstallStatus::Failed);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        history.append(&record("Git", InstallStatus::Installed, 0)).unwrap();
        let mut file = OpenOptions::new().append(true).open(history.path()).unwrap();
        writeln!(file, "{{truncated").unwrap();
        history.append(&record("VLC", InstallStatus::Installed, 1)).unwrap();

        assert_eq!(history.load().unwrap().len(), 2);
    }

    #[test]
    fn test_recent_and_for_app() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        for (i, app) in ["Git", "VLC", "git", "Steam"].iter().enumerate() {
            history.append(&record(app, InstallStatus::Installed, i as u32)).unwrap();
        }

        let recent = history.recent(2).unwrap();
        assert_eq!(recent.iter().map(|r| r.app.as_str()).collect::<Vec<_>>(), vec!["Steam", "git"]);

        let git = history.for_app("GIT").unwrap();
        assert_eq!(git.len(), 2);
        assert_eq!(git[0].app, "git");
    }

    #[test]
    fn test_summary() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        history.append(&record("Git", InstallStatus::Installed, 5)).unwrap();
        history.append(&record("VLC", InstallStatus::Failed, 9)).unwrap();
        history.append(&record("Steam", InstallStatus::Installed, 7)).unwrap();

        let summary = history.summary().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_status.get("installed"), Some(&2));
        assert_eq!(summary.by_status.get("failed"), Some(&1));
        assert_eq!(summary.last_run, Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 9, 0).unwrap()));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        history.append(&record("Git", InstallStatus::Installed, 0)).unwrap();
        history.clear().unwrap();
        assert!(history.load().unwrap().is_empty());
        history.clear().unwrap();
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record("Git", InstallStatus::AlreadyInstalled, 0)).unwrap();
        assert_eq!(json["packageId"], "Test.Git");
        assert_eq!(json["status"], "already-installed");
        assert_eq!(json["durationMs"], 1500);
        assert!(json.get("message").is_none());
    }
}
