use anyhow::{Context, Result};
use casefile_cli::confirm::PromptConfirmer;
use casefile_cli::report;
use casefile_core::config::{self, AppConfig};
use casefile_core::pipeline::{self, PipelineMode};
use casefile_core::resolver::{AssumeNo, AssumeYes, Confirmer};
use casefile_core::runlog::RunLog;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "casefile", version, about = "Tidy case-file shares")]
struct Cli {
    /// Path to config TOML
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output JSON summary
    #[arg(long, global = true)]
    json: bool,

    /// Log every change without touching the disk
    #[arg(long, global = true)]
    dry_run: bool,

    /// Write the run log to this file (overwritten each run)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Answers {
    /// Delete every proposed duplicate without asking
    #[arg(long, conflicts_with = "no")]
    yes: bool,
    /// Decline every proposed duplicate without asking
    #[arg(long)]
    no: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete clutter, rename police reports and closed cases, truncate policies
    Triage { root: PathBuf },
    /// Find near-duplicate documents and delete the older copy on confirmation
    Dedupe {
        root: PathBuf,
        /// Print proposed deletions without asking or deleting
        #[arg(long)]
        list: bool,
        #[command(flatten)]
        answers: Answers,
    },
    /// Triage, then deduplicate
    Run {
        root: PathBuf,
        #[command(flatten)]
        answers: Answers,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref())?;
    if cli.dry_run {
        cfg.safety.dry_run = true;
    }

    let mut log = RunLog::new();
    let result = match cli.command {
        Commands::Triage { root } => {
            run(&cfg, root, PipelineMode::Triage, None, cli.json, &mut log).await
        }
        Commands::Dedupe {
            root,
            list: true,
            ..
        } => list_duplicates(&cfg, root, cli.json, &mut log).await,
        Commands::Dedupe { root, answers, .. } => {
            run(&cfg, root, PipelineMode::Dedupe, Some(answers), cli.json, &mut log).await
        }
        Commands::Run { root, answers } => {
            run(&cfg, root, PipelineMode::All, Some(answers), cli.json, &mut log).await
        }
    };

    if let Some(path) = &cli.log_file {
        log.write_to(path)
            .with_context(|| format!("writing run log to {}", path.display()))?;
        info!("Run log written to {}", path.display());
    }
    result
}

fn confirmer(answers: Option<Answers>) -> Box<dyn Confirmer> {
    match answers {
        Some(Answers { yes: true, .. }) => Box::new(AssumeYes),
        Some(Answers { no: true, .. }) => Box::new(AssumeNo),
        _ => Box::new(PromptConfirmer::stdin()),
    }
}

async fn run(
    cfg: &AppConfig,
    root: PathBuf,
    mode: PipelineMode,
    answers: Option<Answers>,
    json: bool,
    log: &mut RunLog,
) -> Result<()> {
    let mut confirmer = confirmer(answers);
    let out =
        pipeline::run_with_mode_summary(cfg, &root, mode, confirmer.as_mut(), log).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report::render_json(mode, &out)?)?
        );
    } else {
        print!("{}", report::render_text(mode, &out));
    }
    Ok(())
}

async fn list_duplicates(cfg: &AppConfig, root: PathBuf, json: bool, log: &mut RunLog) -> Result<()> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }
    let planned = pipeline::plan_resolution(cfg, &root, log).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&planned.decisions)?);
    } else {
        println!(
            "{} documents indexed, {} proposed deletions",
            planned.documents_indexed,
            planned.decisions.len()
        );
        print!("{}", report::render_decisions(&planned.decisions));
    }
    Ok(())
}
