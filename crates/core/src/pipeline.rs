use crate::config::AppConfig;
use crate::error::Error;
use crate::extractor::{self, DocumentKind};
use crate::indexer::{LshParams, SimilarityIndex};
use crate::models::Summary;
use crate::resolver::{self, Confirmer, DuplicateDecision};
use crate::runlog::RunLog;
use crate::scanner::{self, WalkOptions};
use crate::shingle::{DocumentRecord, Fingerprinter};
use crate::triage::Triage;
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    Triage,
    Dedupe,
    All,
}

#[derive(Debug, Default, Serialize)]
pub struct PipelineSummary {
    pub summary: Summary,
    pub documents_indexed: usize,
    pub documents_without_text: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lsh: Option<LshParams>,
    pub decisions: Vec<DuplicateDecision>,
}

/// Runs the triage pass on the blocking pool.
pub async fn run_triage(
    config: &AppConfig,
    root: &Path,
    log: &mut RunLog,
) -> anyhow::Result<Summary> {
    let triage = Triage::from_config(config)?;
    let root = root.to_path_buf();
    let mut owned_log = std::mem::take(log);
    let (summary, owned_log) = tokio::task::spawn_blocking(move || {
        let summary = triage.run(&root, &mut owned_log);
        (summary, owned_log)
    })
    .await
    .context("triage task")?;
    *log = owned_log;
    Ok(summary)
}

#[derive(Debug, Default)]
pub struct Fingerprints {
    /// Sorted by path.
    pub records: Vec<DocumentRecord>,
    pub without_text: usize,
    pub failures: Vec<Error>,
}

/// Extracts and fingerprints every PDF and DOCX under `root`, at most
/// `similarity.workers` files at a time.
pub async fn fingerprint_tree(config: &AppConfig, root: &Path) -> anyhow::Result<Fingerprints> {
    let fingerprinter = Arc::new(Fingerprinter::from_config(&config.similarity)?);
    let opts = WalkOptions::from_config(&config.scan)?.skip_hidden(true);
    let walk_root = root.to_path_buf();
    let documents: Vec<(PathBuf, std::time::SystemTime)> =
        tokio::task::spawn_blocking(move || {
            scanner::walk(&walk_root, &opts)
                .filter(|e| !e.is_dir && DocumentKind::from_path(&e.path).is_some())
                .map(|e| (e.path, e.modified))
                .collect()
        })
        .await
        .context("document walk")?;
    info!("Fingerprinting {} documents", documents.len());

    let permits = Arc::new(Semaphore::new(config.similarity.workers.max(1)));
    let mut tasks = JoinSet::new();
    for (path, modified) in documents {
        let permit = permits.clone().acquire_owned().await?;
        let fingerprinter = fingerprinter.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let text = match extractor::extract_text(&path) {
                Ok(Some(text)) => text,
                Ok(None) => return Ok(None),
                Err(err) => return Err(err),
            };
            Ok(fingerprinter.fingerprint(path, modified, text))
        });
    }

    let mut out = Fingerprints::default();
    while let Some(joined) = tasks.join_next().await {
        match joined.context("fingerprint task")? {
            Ok(Some(record)) => out.records.push(record),
            Ok(None) => out.without_text += 1,
            Err(err) => out.failures.push(err),
        }
    }
    out.records.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

/// Index keyed by position in `records`.
pub fn build_index(records: &[DocumentRecord], config: &AppConfig) -> SimilarityIndex<usize> {
    let params = LshParams::from_config(&config.similarity);
    debug!("LSH with {} bands of {} rows", params.bands, params.rows);
    let mut index = SimilarityIndex::new(config.similarity.signature_width, params);
    for (i, record) in records.iter().enumerate() {
        if let Err(err) = index.insert(i, record.signature.clone()) {
            warn!("not indexing {:?}: {}", record.path, err);
        }
    }
    index
}

/// Everything up to, but not including, confirmation.
pub async fn plan_resolution(
    config: &AppConfig,
    root: &Path,
    log: &mut RunLog,
) -> anyhow::Result<PipelineSummary> {
    let fingerprints = fingerprint_tree(config, root).await?;
    let mut out = PipelineSummary::default();
    for err in &fingerprints.failures {
        log.failure(&mut out.summary, err);
    }
    let index = build_index(&fingerprints.records, config);
    let pairs = resolver::candidate_pairs(&fingerprints.records, &index);
    out.decisions = resolver::plan_decisions(
        &fingerprints.records,
        &pairs,
        config.similarity.filename_threshold,
    );
    info!(
        "{} documents indexed, {} candidate pairs, {} proposed deletions",
        fingerprints.records.len(),
        pairs.len(),
        out.decisions.len()
    );
    out.documents_indexed = fingerprints.records.len();
    out.documents_without_text = fingerprints.without_text;
    out.lsh = Some(index.params());
    Ok(out)
}

pub async fn run_resolution(
    config: &AppConfig,
    root: &Path,
    confirmer: &mut dyn Confirmer,
    log: &mut RunLog,
) -> anyhow::Result<PipelineSummary> {
    let mut planned = plan_resolution(config, root, log).await?;
    let decisions = std::mem::take(&mut planned.decisions);
    let report = resolver::resolve(decisions, confirmer, &config.safety, log).await;
    planned.decisions = report.decisions;
    planned.summary.merge(report.summary);
    Ok(planned)
}

pub async fn run_with_mode_summary(
    config: &AppConfig,
    root: &Path,
    mode: PipelineMode,
    confirmer: &mut dyn Confirmer,
    log: &mut RunLog,
) -> anyhow::Result<PipelineSummary> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }
    let mut out = PipelineSummary::default();

    if matches!(mode, PipelineMode::Triage | PipelineMode::All) {
        info!("Starting triage of {}", root.display());
        out.summary = run_triage(config, root, log).await?;
        info!("Triage complete.");
    }

    if matches!(mode, PipelineMode::Dedupe | PipelineMode::All) {
        info!("Starting duplicate resolution...");
        let resolved = run_resolution(config, root, confirmer, log).await?;
        out.summary.merge(resolved.summary);
        out.documents_indexed = resolved.documents_indexed;
        out.documents_without_text = resolved.documents_without_text;
        out.lsh = resolved.lsh;
        out.decisions = resolved.decisions;
        info!("Duplicate resolution complete.");
    }

    Ok(out)
}
