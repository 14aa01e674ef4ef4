mod common;

use casefile_core::config::AppConfig;
use casefile_core::runlog::RunLog;
use casefile_core::triage::Triage;
use casefile_core::truncator;
use common::{make_numbered_pdf, touch, tree_contents};
use std::fs;
use std::path::Path;

/// A small office share with one closable case, one open case and some
/// clutter that the deletion rules should sweep.
fn case_tree(root: &Path) {
    make_numbered_pdf(&root.join("CaseFiles/123456/Policy.pdf"), 12);
    touch(&root.join("CaseFiles/123456/Closing Letter.pdf"), b"letter");
    touch(&root.join("CaseFiles/123456/Invoices/Jan.pdf"), &[0u8; 100]);
    touch(&root.join("CaseFiles/123456/Invoices/2020/Feb.pdf"), &[0u8; 50]);
    touch(&root.join("CaseFiles/123456/scene.png"), &[0u8; 25]);
    touch(&root.join("CaseFiles/123456/Police Report.pdf"), b"report");
    make_numbered_pdf(&root.join("CaseFiles/654321/Auto Policy.pdf"), 4);
    touch(&root.join("CaseFiles/654321/Intake Forms/form.docx"), b"form");
    touch(&root.join("CaseFiles/654321/Medical LOR.docx"), b"lor");
    touch(&root.join("CaseFiles/654321/Notes.docx"), b"keep me");
    touch(&root.join("CaseFiles/Azure 777777/Closing Letter.pdf"), b"x");
}

#[test]
fn triage_cleans_closes_and_truncates() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    case_tree(root);
    let short_policy = fs::read(root.join("CaseFiles/654321/Auto Policy.pdf")).unwrap();

    let triage = Triage::from_config(&AppConfig::default()).unwrap();
    let mut log = RunLog::new();
    let summary = triage.run(root, &mut log);
    assert!(summary.failures.is_empty(), "{:?}", summary.failures);

    let closed = root.join("CaseFiles/Closed_123456");
    assert!(closed.is_dir());
    assert!(!root.join("CaseFiles/123456").exists());
    let truncated = closed.join("truncated_Policy.pdf");
    assert_eq!(truncator::page_count(&truncated).unwrap(), 10);
    assert!(!closed.join("Policy.pdf").exists());
    assert!(!closed.join("Invoices").exists());
    assert!(!closed.join("scene.png").exists());
    assert!(closed.join("TAR file.pdf").exists());
    assert!(closed.join("Closing Letter.pdf").exists());

    let open = root.join("CaseFiles/654321");
    assert_eq!(fs::read(open.join("Auto Policy.pdf")).unwrap(), short_policy);
    assert!(!open.join("Intake Forms").exists());
    assert!(!open.join("Medical LOR.docx").exists());
    assert_eq!(fs::read(open.join("Notes.docx")).unwrap(), b"keep me");
    assert!(root.join("CaseFiles/Azure 777777").is_dir());

    // Invoices, scene.png, Intake Forms, Medical LOR, police report rename,
    // Closed_ rename, truncation
    assert_eq!(summary.files_or_folders_modified, 7);
    assert_eq!(summary.pages_truncated, 2);
    assert!(summary.bytes_reclaimed > 0);
    assert!(log
        .entries()
        .iter()
        .any(|e| e.message.starts_with("Deleted folder:") && e.message.contains("Invoices")));
}

#[test]
fn second_run_changes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    case_tree(root);
    let triage = Triage::from_config(&AppConfig::default()).unwrap();
    triage.run(root, &mut RunLog::new());
    let before = tree_contents(root);

    let again = triage.run(root, &mut RunLog::new());
    assert_eq!(again.files_or_folders_modified, 0);
    assert_eq!(again.pages_truncated, 0);
    assert!(again.failures.is_empty());
    assert_eq!(tree_contents(root), before);
}

#[test]
fn dry_run_leaves_tree_untouched() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    case_tree(root);
    let before = tree_contents(root);

    let mut cfg = AppConfig::default();
    cfg.safety.dry_run = true;
    let triage = Triage::from_config(&cfg).unwrap();
    let mut log = RunLog::new();
    let summary = triage.run(root, &mut log);

    assert_eq!(tree_contents(root), before);
    assert!(summary.files_or_folders_modified > 0);
    assert_eq!(summary.pages_truncated, 2);
    assert!(log.entries().iter().any(|e| e.message.starts_with("[dry run]")));
}

#[test]
fn denied_paths_are_reported_and_kept() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    touch(&root.join("held/photo.png"), b"img");
    touch(&root.join("open/photo.png"), b"img");

    let mut cfg = AppConfig::default();
    cfg.safety.deny_paths = vec![root.join("held").to_string_lossy().into_owned()];
    let triage = Triage::from_config(&cfg).unwrap();
    let summary = triage.run(root, &mut RunLog::new());

    assert!(root.join("held/photo.png").exists());
    assert!(!root.join("open/photo.png").exists());
    assert_eq!(summary.files_or_folders_modified, 1);
    assert_eq!(summary.failures.len(), 1);
}

#[test]
fn extra_rule_files_extend_the_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("share");
    let rules = temp.path().join("rules");
    touch(&root.join("case/old Subpoena.pdf"), b"x");
    touch(
        &rules.join("local.toml"),
        br#"
[[rules]]
type = "filename_keyword"
value = "subpoena"
case = "insensitive"
"#,
    );

    let mut cfg = AppConfig::default();
    cfg.triage.rules_path = Some(rules.to_string_lossy().into_owned());
    let triage = Triage::from_config(&cfg).unwrap();
    triage.run(&root, &mut RunLog::new());
    assert!(!root.join("case/old Subpoena.pdf").exists());
}
