use casefile_core::pipeline::{PipelineMode, PipelineSummary};
use casefile_core::resolver::{DecisionAction, DuplicateDecision};
use serde_json::{json, Value};
use std::fmt::Write;

pub fn mode_label(mode: PipelineMode) -> &'static str {
    match mode {
        PipelineMode::Triage => "triage",
        PipelineMode::Dedupe => "dedupe",
        PipelineMode::All => "run",
    }
}

pub fn render_json(mode: PipelineMode, out: &PipelineSummary) -> serde_json::Result<Value> {
    let status = if out.summary.failures.is_empty() {
        "ok"
    } else {
        "partial"
    };
    Ok(json!({
        "status": status,
        "mode": mode_label(mode),
        "result": serde_json::to_value(out)?,
    }))
}

pub fn render_text(mode: PipelineMode, out: &PipelineSummary) -> String {
    let s = &out.summary;
    let mut text = String::new();
    let _ = writeln!(
        text,
        "{}: modified {}, reclaimed {:.2} MB, truncated {} pages, {} failures",
        mode_label(mode),
        s.files_or_folders_modified,
        s.megabytes_reclaimed(),
        s.pages_truncated,
        s.failures.len()
    );
    if !matches!(mode, PipelineMode::Triage) {
        let _ = writeln!(
            text,
            "documents indexed {}, without usable text {}",
            out.documents_indexed, out.documents_without_text
        );
        text.push_str(&render_decisions(&out.decisions));
    }
    for failure in &s.failures {
        let _ = writeln!(text, "  failed: {}", failure.message);
    }
    text
}

pub fn render_decisions(decisions: &[DuplicateDecision]) -> String {
    let mut text = String::new();
    for d in decisions {
        let action = match d.action {
            DecisionAction::Pending => "pending",
            DecisionAction::ConfirmedDelete => "deleted",
            DecisionAction::Skipped => "skipped",
            DecisionAction::Failed => "failed",
        };
        let _ = write!(
            text,
            "  [{action}] {} (older) ~ {} (names {:.2}, content {:.2})",
            d.older_path.display(),
            d.newer_path.display(),
            d.filename_similarity,
            d.content_similarity
        );
        if let Some(note) = &d.note {
            let _ = write!(text, ": {note}");
        }
        text.push('\n');
    }
    text
}
