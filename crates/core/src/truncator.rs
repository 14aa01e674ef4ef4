//! Cuts oversized "Policy" PDFs down to their first pages.

use crate::config::{PdfConfig, SafetyConfig};
use crate::error::{Error, Result};
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub original: PathBuf,
    pub truncated: PathBuf,
    pub pages_before: u32,
    pub pages_removed: u32,
    /// Original size minus truncated size; negative when the rewrite grew.
    pub bytes_reclaimed: i64,
}

pub fn is_candidate(file_name: &str, cfg: &PdfConfig) -> bool {
    file_name.ends_with(".pdf")
        && file_name.contains(&cfg.name_token)
        && !file_name.starts_with(&cfg.output_prefix)
}

/// Truncates `path` when it has more than `page_threshold` pages. Returns
/// `Ok(None)` when the file is short enough and was left untouched.
pub fn truncate(path: &Path, cfg: &PdfConfig, safety: &SafetyConfig) -> Result<Option<Truncation>> {
    let mut doc = PdfDocument::open(path)?;
    let pages = doc.page_count();
    if pages <= cfg.page_threshold {
        return Ok(None);
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::parse(path, "file name is not valid UTF-8"))?;
    let target = path.with_file_name(format!("{}{}", cfg.output_prefix, file_name));
    if !paths::is_mutable(path, safety) {
        return Err(Error::Denied {
            path: path.to_path_buf(),
        });
    }
    if target.exists() {
        return Err(Error::Collision {
            path: path.to_path_buf(),
            target,
        });
    }
    let keep = cfg.keep_pages.min(pages);
    let mut result = Truncation {
        original: path.to_path_buf(),
        truncated: target.clone(),
        pages_before: pages,
        pages_removed: pages - keep,
        bytes_reclaimed: 0,
    };
    if safety.dry_run {
        return Ok(Some(result));
    }

    let original_size = fs::metadata(path).map_err(|e| Error::io(path, e))?.len();
    doc.keep_first(keep);
    doc.save(&target)?;
    let truncated_size = match fs::metadata(&target) {
        Ok(m) => m.len(),
        Err(e) => return Err(Error::io(&target, e)),
    };
    if let Err(e) = fs::remove_file(path) {
        // only one copy may survive
        if let Err(cleanup) = fs::remove_file(&target) {
            warn!(
                "could not remove {} after failing to remove {}: {}",
                target.display(),
                path.display(),
                cleanup
            );
        }
        return Err(Error::io(path, e));
    }
    result.bytes_reclaimed = original_size as i64 - truncated_size as i64;
    Ok(Some(result))
}

pub fn page_count(path: &Path) -> Result<u32> {
    Ok(PdfDocument::open(path)?.page_count())
}

#[cfg(feature = "pdf")]
struct PdfDocument(lopdf::Document);

#[cfg(feature = "pdf")]
impl PdfDocument {
    fn open(path: &Path) -> Result<Self> {
        let doc = lopdf::Document::load(path).map_err(|e| Error::parse(path, e))?;
        if doc.is_encrypted() {
            return Err(Error::parse(path, "document is encrypted"));
        }
        Ok(Self(doc))
    }

    fn page_count(&self) -> u32 {
        self.0.get_pages().len() as u32
    }

    fn keep_first(&mut self, keep: u32) {
        let drop: Vec<u32> = self
            .0
            .get_pages()
            .keys()
            .copied()
            .filter(|n| *n > keep)
            .collect();
        self.0.delete_pages(&drop);
        self.0.prune_objects();
        self.0.renumber_objects();
        self.0.compress();
    }

    fn save(&mut self, dest: &Path) -> Result<()> {
        self.0.save(dest).map_err(|e| Error::io(dest, e))?;
        Ok(())
    }
}

#[cfg(not(feature = "pdf"))]
struct PdfDocument;

#[cfg(not(feature = "pdf"))]
impl PdfDocument {
    fn open(path: &Path) -> Result<Self> {
        Err(Error::parse(path, "built without PDF support"))
    }

    fn page_count(&self) -> u32 {
        0
    }

    fn keep_first(&mut self, _keep: u32) {}

    fn save(&mut self, dest: &Path) -> Result<()> {
        Err(Error::parse(dest, "built without PDF support"))
    }
}
