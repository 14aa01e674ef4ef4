//! Walks a case-file tree and yields one `FileEntry` per file and directory.

use crate::config::ScanConfig;
use crate::models::FileEntry;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub excludes: GlobSet,
    pub follow_links: bool,
    /// Drop dot-files and Office lock files (`~$...`).
    pub skip_hidden: bool,
    /// Yield a directory after everything below it.
    pub contents_first: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            excludes: GlobSet::empty(),
            follow_links: false,
            skip_hidden: false,
            contents_first: false,
        }
    }
}

impl WalkOptions {
    pub fn from_config(cfg: &ScanConfig) -> anyhow::Result<Self> {
        Ok(Self {
            excludes: build_globset(&cfg.exclude)?,
            follow_links: cfg.follow_links,
            ..Self::default()
        })
    }

    pub fn skip_hidden(mut self, yes: bool) -> Self {
        self.skip_hidden = yes;
        self
    }

    pub fn contents_first(mut self, yes: bool) -> Self {
        self.contents_first = yes;
        self
    }
}

/// Lazy depth-first walk below `root` (the root itself is not yielded).
/// Entries that cannot be read, or vanish mid-walk, are skipped.
pub fn walk<'a>(root: &Path, opts: &'a WalkOptions) -> impl Iterator<Item = FileEntry> + 'a {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(opts.follow_links)
        .contents_first(opts.contents_first)
        .into_iter()
        .filter_entry(move |e| should_descend(e.path(), opts))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                debug!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter_map(|entry| {
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    debug!("skipping {:?}: {}", entry.path(), err);
                    return None;
                }
            };
            Some(FileEntry {
                path: entry.into_path(),
                is_dir: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            })
        })
}

/// Materialized walk, for callers that mutate the tree afterwards.
pub fn snapshot(root: &Path, opts: &WalkOptions) -> Vec<FileEntry> {
    walk(root, opts).collect()
}

/// Total size of the files beneath `path` (or of `path` itself for a file).
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

pub fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn should_descend(path: &Path, opts: &WalkOptions) -> bool {
    if is_excluded(path, &opts.excludes) {
        return false;
    }
    if opts.skip_hidden && is_hidden(path) {
        return false;
    }
    true
}

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.') || s.starts_with("~$"))
        .unwrap_or(false)
}

fn is_excluded(path: &Path, excludes: &GlobSet) -> bool {
    excludes.is_match(path)
}
