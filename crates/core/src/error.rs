use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-entry failures. None of these stop a pass; they are recorded and the
/// pass moves on to the next entry.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("cannot move {} to {}: target already exists", path.display(), target.display())]
    Collision { path: PathBuf, target: PathBuf },
    #[error("{} vanished before it could be acted on", path.display())]
    Race { path: PathBuf },
    #[error("{} is outside the allowed paths", path.display())]
    Denied { path: PathBuf },
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Io,
    Parse,
    Collision,
    Race,
    Denied,
    Config,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Io { .. } => FailureKind::Io,
            Error::Parse { .. } => FailureKind::Parse,
            Error::Collision { .. } => FailureKind::Collision,
            Error::Race { .. } => FailureKind::Race,
            Error::Denied { .. } => FailureKind::Denied,
            Error::Config(_) => FailureKind::Config,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Io { path, .. }
            | Error::Parse { path, .. }
            | Error::Collision { path, .. }
            | Error::Race { path }
            | Error::Denied { path } => Some(path),
            Error::Config(_) => None,
        }
    }
}
