use crate::error::Error;
use crate::rules::{Casing, PatternSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub triage: TriageConfig,
    pub pdf: PdfConfig,
    pub similarity: SimilarityConfig,
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub exclude: Vec<String>,
    pub follow_links: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub folder_names: Vec<PatternSpec>,
    pub folder_prefixes: Vec<PatternSpec>,
    pub keywords: Vec<PatternSpec>,
    pub extensions: Vec<PatternSpec>,
    pub rules_path: Option<String>,
    pub case_id_pattern: String,
    pub protected_substring: String,
    pub closing_letter_pattern: String,
    pub closed_prefix: String,
    pub police_report_keyword: String,
    pub canonical_name: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        let sensitive = |values: &[&str]| -> Vec<PatternSpec> {
            values
                .iter()
                .map(|v| PatternSpec::new(v, Casing::Sensitive))
                .collect()
        };
        let mut keywords = sensitive(&[
            "LOR",
            "UM Policy",
            "DRAFT",
            "request",
            "Reqs",
            "harmless",
            "Draft",
            "Reconciliation",
            "Reconcile",
            "Billing",
            "billing",
            "QBooks",
            "Req",
            "Check",
            "Pictures",
            "Policy Documents",
            "Investigation Report",
            "Rqst",
            "UIM Ltr of Rep",
        ]);
        keywords.push(PatternSpec::new("request", Casing::Insensitive));
        Self {
            folder_names: sensitive(&[
                "Liens", "Costs", "Photos", "Requests", "Invoices", "Request",
            ]),
            folder_prefixes: sensitive(&["Intake"]),
            keywords,
            extensions: sensitive(&[
                ".jpeg", ".mp4", ".mp3", ".png", ".jpg", "zip", "JPG", ".msg", ".xlsx",
            ]),
            rules_path: None,
            case_id_pattern: r"\d{6}".to_string(),
            protected_substring: "Azure".to_string(),
            closing_letter_pattern: r"closing\s*letter".to_string(),
            closed_prefix: "Closed_".to_string(),
            police_report_keyword: "police report".to_string(),
            canonical_name: "TAR file".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub name_token: String,
    pub page_threshold: u32,
    pub keep_pages: u32,
    pub output_prefix: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            name_token: "Policy".to_string(),
            page_threshold: 10,
            keep_pages: 10,
            output_prefix: "truncated_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub shingle_size: usize,
    pub signature_width: usize,
    pub content_threshold: f64,
    pub target_recall: f64,
    pub bands: Option<usize>,
    pub rows: Option<usize>,
    pub filename_threshold: f64,
    pub seed: u64,
    pub workers: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            shingle_size: 5,
            signature_width: 128,
            content_threshold: 0.95,
            target_recall: 0.999,
            bands: None,
            rows: None,
            filename_threshold: 0.85,
            seed: 1,
            workers: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub dry_run: bool,
    pub allow_paths: Vec<String>,
    pub deny_paths: Vec<String>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let sim = &self.similarity;
        if sim.shingle_size == 0 {
            return Err(Error::Config("similarity.shingle_size must be at least 1".into()));
        }
        if sim.signature_width == 0 {
            return Err(Error::Config(
                "similarity.signature_width must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("similarity.content_threshold", sim.content_threshold),
            ("similarity.target_recall", sim.target_recall),
            ("similarity.filename_threshold", sim.filename_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        match (sim.bands, sim.rows) {
            (Some(b), Some(r)) if b == 0 || r == 0 || b * r > sim.signature_width => {
                return Err(Error::Config(format!(
                    "similarity.bands x rows ({b} x {r}) must be non-zero and fit in {} permutations",
                    sim.signature_width
                )));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::Config(
                    "similarity.bands and similarity.rows must be set together".into(),
                ));
            }
            _ => {}
        }
        if self.pdf.keep_pages == 0 || self.pdf.keep_pages > self.pdf.page_threshold {
            return Err(Error::Config(format!(
                "pdf.keep_pages ({}) must be between 1 and pdf.page_threshold ({})",
                self.pdf.keep_pages, self.pdf.page_threshold
            )));
        }
        if self.triage.closed_prefix.is_empty() {
            return Err(Error::Config("triage.closed_prefix must not be empty".into()));
        }
        Ok(())
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("CASEFILE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );
    let cfg: AppConfig = settings.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
