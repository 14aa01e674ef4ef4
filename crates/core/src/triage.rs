//! Rule-based clean-up of a case-file tree.
//!
//! Three phases, each a separate walk of the tree as it stands:
//! 1. deletions and police-report renames, planned first and then applied;
//! 2. closed-case folder renames, deepest folders first;
//! 3. truncation of oversized policy PDFs.

use crate::config::{AppConfig, PdfConfig, SafetyConfig};
use crate::error::Error;
use crate::fs_apply::{self, Mutation};
use crate::models::Summary;
use crate::rules::{CanonicalRenameRule, ClosedCaseRule, RuleSet};
use crate::runlog::RunLog;
use crate::scanner::{self, WalkOptions};
use crate::truncator;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Mutations decided by phase 1, plus the renames refused up front.
#[derive(Debug, Default)]
pub struct TriagePlan {
    pub deletions: Vec<Mutation>,
    pub renames: Vec<Mutation>,
    pub collisions: Vec<Error>,
}

pub struct Triage {
    rules: RuleSet,
    closed_case: ClosedCaseRule,
    police_report: CanonicalRenameRule,
    pdf: PdfConfig,
    safety: SafetyConfig,
    walk: WalkOptions,
}

impl Triage {
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            rules: RuleSet::from_config(&cfg.triage)?,
            closed_case: ClosedCaseRule::from_config(&cfg.triage)?,
            police_report: CanonicalRenameRule::from_config(&cfg.triage),
            pdf: cfg.pdf.clone(),
            safety: cfg.safety.clone(),
            walk: WalkOptions::from_config(&cfg.scan)?,
        })
    }

    /// All three phases in order.
    pub fn run(&self, root: &Path, log: &mut RunLog) -> Summary {
        let mut summary = Summary::default();
        let plan = self.plan(root);
        summary.merge(self.apply_plan(plan, log));
        summary.merge(self.close_cases(root, log));
        summary.merge(self.truncate_policies(root, log));
        log.note(format!(
            "Total files or folders modified: {}",
            summary.files_or_folders_modified
        ));
        log.note(format!(
            "Total space saved: {:.2} MB",
            summary.megabytes_reclaimed()
        ));
        summary
    }

    /// Phase 1 decisions. Nothing below a doomed folder is looked at, and a
    /// file that is deleted is never renamed.
    pub fn plan(&self, root: &Path) -> TriagePlan {
        let mut plan = TriagePlan::default();
        let mut doomed_dir: Option<PathBuf> = None;
        let mut renames: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

        for entry in scanner::walk(root, &self.walk) {
            if let Some(dir) = &doomed_dir {
                if entry.path.starts_with(dir) {
                    continue;
                }
                doomed_dir = None;
            }
            if let Some(rule) = self.rules.first_match(&entry) {
                debug!("{:?} matches {}", entry.path, rule.describe());
                if entry.is_dir {
                    doomed_dir = Some(entry.path.clone());
                    plan.deletions.push(Mutation::RemoveDir { path: entry.path });
                } else {
                    plan.deletions.push(Mutation::RemoveFile { path: entry.path });
                }
                continue;
            }
            if entry.is_dir {
                continue;
            }
            if let Some(name) = self.police_report.target_name(entry.file_name()) {
                let target = entry.path.with_file_name(name);
                if target != entry.path {
                    renames.entry(target).or_default().push(entry.path);
                }
            }
        }

        for (target, sources) in renames {
            if sources.len() == 1 && !target.exists() {
                for from in sources {
                    plan.renames.push(Mutation::Rename {
                        from,
                        to: target.clone(),
                    });
                }
            } else {
                for path in sources {
                    plan.collisions.push(Error::Collision {
                        path,
                        target: target.clone(),
                    });
                }
            }
        }
        plan
    }

    pub fn apply_plan(&self, plan: TriagePlan, log: &mut RunLog) -> Summary {
        let mut summary = Summary::default();
        for err in &plan.collisions {
            log.failure(&mut summary, err);
        }
        for mutation in plan.deletions.iter().chain(&plan.renames) {
            self.apply_one(mutation, &mut summary, log);
        }
        summary
    }

    /// Phase 2: prefix case folders that hold a closing letter.
    pub fn close_cases(&self, root: &Path, log: &mut RunLog) -> Summary {
        let mut summary = Summary::default();
        let deepest_first = self.walk.clone().contents_first(true);
        for entry in scanner::snapshot(root, &deepest_first) {
            if !entry.is_dir || !self.closed_case.is_candidate_folder(entry.file_name()) {
                continue;
            }
            if !self.has_closing_letter(&entry.path) {
                continue;
            }
            let to = entry
                .path
                .with_file_name(self.closed_case.renamed(entry.file_name()));
            let mutation = Mutation::Rename {
                from: entry.path,
                to,
            };
            self.apply_one(&mutation, &mut summary, log);
        }
        summary
    }

    fn has_closing_letter(&self, dir: &Path) -> bool {
        scanner::walk(dir, &self.walk)
            .any(|e| !e.is_dir && self.closed_case.is_closing_letter(e.file_name()))
    }

    /// Phase 3: keep only the first pages of long policy PDFs.
    pub fn truncate_policies(&self, root: &Path, log: &mut RunLog) -> Summary {
        let mut summary = Summary::default();
        let candidates: Vec<PathBuf> = scanner::walk(root, &self.walk)
            .filter(|e| !e.is_dir && truncator::is_candidate(e.file_name(), &self.pdf))
            .map(|e| e.path)
            .collect();
        for path in candidates {
            match truncator::truncate(&path, &self.pdf, &self.safety) {
                Ok(Some(t)) => {
                    summary.files_or_folders_modified += 1;
                    summary.pages_truncated += u64::from(t.pages_removed);
                    summary.bytes_reclaimed += t.bytes_reclaimed;
                    log.mutation(format!(
                        "{}Truncated {} ({} pages, {} removed) to {}",
                        self.dry_run_marker(),
                        t.original.display(),
                        t.pages_before,
                        t.pages_removed,
                        t.truncated.display()
                    ));
                }
                Ok(None) => debug!("{:?} is short enough", path),
                Err(err) => log.failure(&mut summary, &err),
            }
        }
        log.note(format!(
            "Total pages deleted from PDFs: {}",
            summary.pages_truncated
        ));
        summary
    }

    fn apply_one(&self, mutation: &Mutation, summary: &mut Summary, log: &mut RunLog) {
        match fs_apply::apply(mutation, &self.safety) {
            Ok(applied) => {
                summary.files_or_folders_modified += 1;
                summary.bytes_reclaimed += applied.bytes_reclaimed as i64;
                log.mutation(format!("{}{}", self.dry_run_marker(), mutation.describe()));
            }
            Err(err) => log.failure(summary, &err),
        }
    }

    fn dry_run_marker(&self) -> &'static str {
        if self.safety.dry_run {
            "[dry run] "
        } else {
            ""
        }
    }
}
