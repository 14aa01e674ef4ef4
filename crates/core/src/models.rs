use crate::error::{Error, FailureKind};
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

/// One walked filesystem entry. Stale as soon as a mutation touches its path.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    pub modified: SystemTime,
}

impl FileEntry {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub path: Option<PathBuf>,
    pub kind: FailureKind,
    pub message: String,
}

impl From<&Error> for Failure {
    fn from(err: &Error) -> Self {
        Failure {
            path: err.path().map(|p| p.to_path_buf()),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Totals returned by each pass. Callers merge them; nothing is global.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub files_or_folders_modified: u64,
    /// Signed: truncating a PDF can grow it.
    pub bytes_reclaimed: i64,
    pub pages_truncated: u64,
    pub failures: Vec<Failure>,
}

impl Summary {
    pub fn merge(&mut self, other: Summary) {
        self.files_or_folders_modified += other.files_or_folders_modified;
        self.bytes_reclaimed += other.bytes_reclaimed;
        self.pages_truncated += other.pages_truncated;
        self.failures.extend(other.failures);
    }

    pub fn megabytes_reclaimed(&self) -> f64 {
        self.bytes_reclaimed as f64 / (1024.0 * 1024.0)
    }
}
