//! Human-readable record of a run: one timestamped line per mutation and per error.

use crate::error::Error;
use crate::models::{Failure, Summary};
use chrono::{DateTime, Local};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Info => "INFO",
            Level::Error => "ERROR",
        };
        write!(
            f,
            "{} - {} - {}",
            self.at.format("%Y-%m-%d %H:%M:%S,%3f"),
            level,
            self.message
        )
    }
}

#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mutation(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(Level::Info, message);
    }

    /// Logs the error and records it as a failure on the pass summary.
    pub fn failure(&mut self, summary: &mut Summary, err: &Error) {
        warn!("{}", err);
        self.push(Level::Error, err.to_string());
        summary.failures.push(Failure::from(err));
    }

    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(Level::Info, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Overwrites `path` with the full log.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let mut file = fs::File::create(path)?;
        for entry in &self.entries {
            writeln!(file, "{}", entry)?;
        }
        Ok(())
    }

    fn push(&mut self, level: Level, message: String) {
        self.entries.push(LogEntry {
            at: Local::now(),
            level,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn failures_land_in_log_and_summary() {
        let mut log = RunLog::new();
        let mut summary = Summary::default();
        log.mutation("Deleted file: a.png");
        log.failure(
            &mut summary,
            &Error::Denied {
                path: PathBuf::from("/protected/x"),
            },
        );
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[1].level, Level::Error);
        assert_eq!(summary.failures.len(), 1);
        let line = log.entries()[0].to_string();
        assert!(line.ends_with(" - INFO - Deleted file: a.png"), "{line}");
    }

    #[test]
    fn write_to_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run_log.txt");
        std::fs::write(&target, "stale\nstale\nstale\n").unwrap();
        let mut log = RunLog::new();
        log.note("Total pages deleted from PDFs: 0");
        log.write_to(&target).unwrap();
        let written = std::fs::read_to_string(&target).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(!written.contains("stale"));
    }
}
