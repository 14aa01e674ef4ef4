use crate::config::TriageConfig;
use crate::error::Error;
use crate::models::FileEntry;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Casing {
    #[default]
    Sensitive,
    Insensitive,
}

/// A literal plus the casing it is compared with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternSpec {
    pub value: String,
    #[serde(default)]
    pub case: Casing,
}

impl PatternSpec {
    pub fn new(value: &str, case: Casing) -> Self {
        Self {
            value: value.to_string(),
            case,
        }
    }

    fn normalize<'a>(&self, s: &'a str) -> std::borrow::Cow<'a, str> {
        match self.case {
            Casing::Sensitive => s.into(),
            Casing::Insensitive => s.to_lowercase().into(),
        }
    }

    fn needle(&self) -> std::borrow::Cow<'_, str> {
        self.normalize(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeletionRule {
    ExactFolderName(PatternSpec),
    FolderNamePrefix(PatternSpec),
    FilenameKeyword(PatternSpec),
    /// Plain suffix match on the file name, so `zip` also catches `foo.7zip`.
    FilenameExtension(PatternSpec),
}

impl DeletionRule {
    pub fn matches(&self, entry: &FileEntry) -> bool {
        let name = entry.file_name();
        match self {
            DeletionRule::ExactFolderName(p) => entry.is_dir && p.normalize(name) == p.needle(),
            DeletionRule::FolderNamePrefix(p) => {
                entry.is_dir && p.normalize(name).starts_with(p.needle().as_ref())
            }
            DeletionRule::FilenameKeyword(p) => {
                !entry.is_dir && p.normalize(name).contains(p.needle().as_ref())
            }
            DeletionRule::FilenameExtension(p) => {
                !entry.is_dir && p.normalize(name).ends_with(p.needle().as_ref())
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DeletionRule::ExactFolderName(p) => format!("folder name == {:?}", p.value),
            DeletionRule::FolderNamePrefix(p) => format!("folder name starts with {:?}", p.value),
            DeletionRule::FilenameKeyword(p) => format!("file name contains {:?}", p.value),
            DeletionRule::FilenameExtension(p) => format!("file name ends with {:?}", p.value),
        }
    }
}

/// Deletion rules combined by OR.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<DeletionRule>,
}

impl RuleSet {
    pub fn from_config(cfg: &TriageConfig) -> anyhow::Result<Self> {
        let mut rules: Vec<DeletionRule> = Vec::new();
        rules.extend(cfg.folder_names.iter().cloned().map(DeletionRule::ExactFolderName));
        rules.extend(cfg.folder_prefixes.iter().cloned().map(DeletionRule::FolderNamePrefix));
        rules.extend(cfg.keywords.iter().cloned().map(DeletionRule::FilenameKeyword));
        rules.extend(cfg.extensions.iter().cloned().map(DeletionRule::FilenameExtension));
        if let Some(dir) = &cfg.rules_path {
            rules.extend(load_rules_from_dir(&PathBuf::from(dir))?);
        }
        Ok(Self { rules })
    }

    pub fn new(rules: Vec<DeletionRule>) -> Self {
        Self { rules }
    }

    pub fn first_match(&self, entry: &FileEntry) -> Option<&DeletionRule> {
        self.rules.iter().find(|r| r.matches(entry))
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<DeletionRule>,
}

pub fn load_rules_from_dir(dir: &Path) -> anyhow::Result<Vec<DeletionRule>> {
    let mut rules = Vec::new();
    if !dir.exists() {
        return Ok(rules);
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("toml"))
        .collect();
    paths.sort();
    for path in paths {
        let content = fs::read_to_string(&path)?;
        let file: RuleFile = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        rules.extend(file.rules);
    }
    Ok(rules)
}

/// Folders holding a case id get `Closed_` once a closing letter shows up
/// anywhere beneath them.
#[derive(Debug, Clone)]
pub struct ClosedCaseRule {
    case_id: Regex,
    closing_letter: Regex,
    protected: String,
    prefix: String,
}

impl ClosedCaseRule {
    pub fn from_config(cfg: &TriageConfig) -> Result<Self, Error> {
        let case_id = Regex::new(&cfg.case_id_pattern)
            .map_err(|e| Error::Config(format!("triage.case_id_pattern: {e}")))?;
        let closing_letter = RegexBuilder::new(&cfg.closing_letter_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("triage.closing_letter_pattern: {e}")))?;
        Ok(Self {
            case_id,
            closing_letter,
            protected: cfg.protected_substring.clone(),
            prefix: cfg.closed_prefix.clone(),
        })
    }

    pub fn is_candidate_folder(&self, name: &str) -> bool {
        self.case_id.is_match(name)
            && (self.protected.is_empty() || !name.contains(&self.protected))
            && !name.starts_with(&self.prefix)
    }

    pub fn is_closing_letter(&self, file_name: &str) -> bool {
        self.closing_letter.is_match(file_name)
    }

    pub fn renamed(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

/// Files mentioning a police report are renamed to one canonical stem,
/// keeping their extension.
#[derive(Debug, Clone)]
pub struct CanonicalRenameRule {
    keyword: String,
    canonical: String,
}

impl CanonicalRenameRule {
    pub fn from_config(cfg: &TriageConfig) -> Self {
        Self {
            keyword: cfg.police_report_keyword.to_lowercase(),
            canonical: cfg.canonical_name.clone(),
        }
    }

    /// The new file name, or `None` when the rule does not apply.
    pub fn target_name(&self, file_name: &str) -> Option<String> {
        if self.keyword.is_empty() || !file_name.to_lowercase().contains(&self.keyword) {
            return None;
        }
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        Some(format!("{}{}", self.canonical, ext))
    }
}
