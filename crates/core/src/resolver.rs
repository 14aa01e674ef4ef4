//! Turns index candidates into delete-the-older-copy decisions and carries
//! them out once confirmed.

use crate::config::SafetyConfig;
use crate::error::Error;
use crate::fs_apply::{self, Mutation};
use crate::indexer::SimilarityIndex;
use crate::models::Summary;
use crate::runlog::RunLog;
use crate::shingle::DocumentRecord;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `2 * LCS / (|a| + |b|)` over characters; two empty names are identical.
///
/// Never lower than difflib's `SequenceMatcher.ratio()`, which only counts
/// contiguous matching blocks, so it is slightly more lenient near the
/// threshold.
pub fn filename_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    2.0 * lcs_len(&a, &b) as f64 / (a.len() + b.len()) as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidatePair {
    pub path_a: PathBuf,
    pub path_b: PathBuf,
    pub content_similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Pending,
    ConfirmedDelete,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateDecision {
    pub older_path: PathBuf,
    pub newer_path: PathBuf,
    pub filename_similarity: f64,
    pub content_similarity: f64,
    pub action: DecisionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DuplicateDecision {
    fn settle(&mut self, action: DecisionAction, note: Option<String>) {
        self.action = action;
        self.note = note;
    }
}

/// Unordered candidate pairs, each reported once with the lower index first.
/// `index` is keyed by position in `records`.
pub fn candidate_pairs(
    records: &[DocumentRecord],
    index: &SimilarityIndex<usize>,
) -> Vec<CandidatePair> {
    let mut pairs = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let mut others: Vec<usize> = index.candidates(&i).into_iter().filter(|j| *j > i).collect();
        others.sort_unstable();
        for j in others {
            let Some(other) = records.get(j) else {
                continue;
            };
            pairs.push(CandidatePair {
                path_a: record.path.clone(),
                path_b: other.path.clone(),
                content_similarity: record.signature.jaccard(&other.signature),
            });
        }
    }
    pairs
}

/// Keeps pairs whose base names are close enough and orders each one
/// older-first. On equal modification times `path_a` counts as older.
pub fn plan_decisions(
    records: &[DocumentRecord],
    pairs: &[CandidatePair],
    filename_threshold: f64,
) -> Vec<DuplicateDecision> {
    let modified = |path: &Path| {
        records
            .iter()
            .find(|r| r.path == path)
            .map(|r| r.modified)
    };
    let mut decisions = Vec::new();
    for pair in pairs {
        let name_sim = filename_similarity(&basename(&pair.path_a), &basename(&pair.path_b));
        if name_sim < filename_threshold {
            debug!(
                "names too different ({:.2}): {:?} / {:?}",
                name_sim, pair.path_a, pair.path_b
            );
            continue;
        }
        let (Some(ma), Some(mb)) = (modified(&pair.path_a), modified(&pair.path_b)) else {
            continue;
        };
        let (older, newer) = if mb < ma {
            (&pair.path_b, &pair.path_a)
        } else {
            (&pair.path_a, &pair.path_b)
        };
        decisions.push(DuplicateDecision {
            older_path: older.clone(),
            newer_path: newer.clone(),
            filename_similarity: name_sim,
            content_similarity: pair.content_similarity,
            action: DecisionAction::Pending,
            note: None,
        });
    }
    decisions
}

/// Asked once per pending decision: may `older` be deleted in favour of `newer`?
#[async_trait::async_trait]
pub trait Confirmer: Send {
    async fn confirm(&mut self, older: &Path, newer: &Path) -> anyhow::Result<bool>;
}

#[derive(Debug, Default)]
pub struct AssumeYes;

#[async_trait::async_trait]
impl Confirmer for AssumeYes {
    async fn confirm(&mut self, _older: &Path, _newer: &Path) -> anyhow::Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct AssumeNo;

#[async_trait::async_trait]
impl Confirmer for AssumeNo {
    async fn confirm(&mut self, _older: &Path, _newer: &Path) -> anyhow::Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ResolutionReport {
    pub decisions: Vec<DuplicateDecision>,
    pub summary: Summary,
}

/// Presents each pending decision in order and settles it. Every decision
/// leaves this function in a terminal state.
///
/// A dry run settles confirmed decisions as `Skipped` with a "dry run" note
/// and treats their older files as gone for the rest of the run, so totals
/// match what a real run would report.
pub async fn resolve(
    mut decisions: Vec<DuplicateDecision>,
    confirmer: &mut dyn Confirmer,
    safety: &SafetyConfig,
    log: &mut RunLog,
) -> ResolutionReport {
    let mut summary = Summary::default();
    let mut would_delete: HashSet<PathBuf> = HashSet::new();
    for decision in decisions.iter_mut() {
        if decision.action != DecisionAction::Pending {
            continue;
        }
        let missing = [&decision.older_path, &decision.newer_path]
            .into_iter()
            .find(|p| would_delete.contains(*p) || !p.exists())
            .cloned();
        if let Some(gone) = missing {
            log.note(format!("Skipped pair, {} no longer exists", gone.display()));
            decision.settle(
                DecisionAction::Skipped,
                Some(format!("{} no longer exists", gone.display())),
            );
            continue;
        }

        let answer = confirmer
            .confirm(&decision.older_path, &decision.newer_path)
            .await;
        match answer {
            Ok(true) => {}
            Ok(false) => {
                decision.settle(DecisionAction::Skipped, None);
                continue;
            }
            Err(err) => {
                log.note(format!(
                    "No answer for {}: {err:#}",
                    decision.older_path.display()
                ));
                decision.settle(DecisionAction::Skipped, Some(format!("no answer: {err:#}")));
                continue;
            }
        }

        let mutation = Mutation::RemoveFile {
            path: decision.older_path.clone(),
        };
        match fs_apply::apply(&mutation, safety) {
            Ok(applied) => {
                summary.files_or_folders_modified += 1;
                summary.bytes_reclaimed += applied.bytes_reclaimed as i64;
                if applied.executed {
                    log.mutation(format!(
                        "Deleted duplicate: {} (kept {})",
                        decision.older_path.display(),
                        decision.newer_path.display()
                    ));
                    decision.settle(DecisionAction::ConfirmedDelete, None);
                } else {
                    log.mutation(format!(
                        "Would delete duplicate: {}",
                        decision.older_path.display()
                    ));
                    would_delete.insert(decision.older_path.clone());
                    decision.settle(DecisionAction::Skipped, Some("dry run".into()));
                }
            }
            Err(err) => {
                log.failure(&mut summary, &err);
                let note = match &err {
                    Error::Race { .. } => "vanished after confirmation".to_string(),
                    other => other.to_string(),
                };
                decision.settle(DecisionAction::Failed, Some(note));
            }
        }
    }
    ResolutionReport { decisions, summary }
}
