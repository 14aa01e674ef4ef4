use crate::config::SafetyConfig;
use crate::error::{Error, Result};
use crate::paths;
use crate::scanner;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    RemoveFile { path: PathBuf },
    RemoveDir { path: PathBuf },
    Rename { from: PathBuf, to: PathBuf },
}

impl Mutation {
    pub fn path(&self) -> &Path {
        match self {
            Mutation::RemoveFile { path } | Mutation::RemoveDir { path } => path,
            Mutation::Rename { from, .. } => from,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Mutation::RemoveFile { path } => format!("Deleted file: {}", path.display()),
            Mutation::RemoveDir { path } => format!("Deleted folder: {}", path.display()),
            Mutation::Rename { from, to } => {
                format!("Renamed {} to {}", from.display(), to.display())
            }
        }
    }
}

/// What applying one mutation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub bytes_reclaimed: u64,
    /// False when running dry.
    pub executed: bool,
}

/// Applies one mutation. Renames never overwrite: an existing target is a
/// collision. In dry-run mode nothing on disk changes, but sizes are still
/// measured so the summary reflects what would be reclaimed.
pub fn apply(mutation: &Mutation, safety: &SafetyConfig) -> Result<Applied> {
    let path = mutation.path();
    if !paths::is_mutable(path, safety) {
        return Err(Error::Denied {
            path: path.to_path_buf(),
        });
    }
    if let Mutation::Rename { to, .. } = mutation {
        if !paths::is_mutable(to, safety) {
            return Err(Error::Denied { path: to.clone() });
        }
    }
    if fs::symlink_metadata(path).is_err() {
        return Err(Error::Race {
            path: path.to_path_buf(),
        });
    }

    match mutation {
        Mutation::RemoveFile { path } => {
            let size = fs::metadata(path).map_err(|e| Error::io(path, e))?.len();
            if !safety.dry_run {
                fs::remove_file(path).map_err(|e| Error::io(path, e))?;
            }
            Ok(Applied {
                bytes_reclaimed: size,
                executed: !safety.dry_run,
            })
        }
        Mutation::RemoveDir { path } => {
            let size = scanner::dir_size(path);
            if !safety.dry_run {
                fs::remove_dir_all(path).map_err(|e| Error::io(path, e))?;
            }
            Ok(Applied {
                bytes_reclaimed: size,
                executed: !safety.dry_run,
            })
        }
        Mutation::Rename { from, to } => {
            if fs::symlink_metadata(to).is_ok() {
                return Err(Error::Collision {
                    path: from.clone(),
                    target: to.clone(),
                });
            }
            if !safety.dry_run {
                fs::rename(from, to).map_err(|e| Error::io(from, e))?;
            }
            Ok(Applied {
                bytes_reclaimed: 0,
                executed: !safety.dry_run,
            })
        }
    }
}
