//! logfold - learn and compress behavior models from program logs
//!
//! ```bash
//! logfold --type=accuracy --corpus traces/ --config logfold.toml
//! logfold --type=runtime --workers 4
//! logfold --type=random --report out/eval/random.csv
//! ```
//!
//! A missing or unknown `--type` prints usage and exits successfully.

mod experiment;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use logfold_core::config::Config;
use logfold_core::corpus::TraceCorpus;
use logfold_core::logging::init_logging;
use logfold_core::report::ReportWriter;
use logfold_core::template_tree::TemplateTree;

use crate::experiment::{Experiment, ExperimentType};

const DEFAULT_CONFIG: &str = "logfold.toml";

/// Learn and compress probabilistic models of program log behavior
#[derive(Parser, Debug)]
#[command(name = "logfold", version, about)]
struct Cli {
    /// Type of evaluation to perform
    #[arg(long = "type", value_enum)]
    experiment: ExperimentType,

    /// Configuration file (defaults apply when logfold.toml is absent)
    #[arg(long, env = "LOGFOLD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of trace files, one trace per file
    #[arg(long, default_value = "traces")]
    corpus: PathBuf,

    /// Worker threads (overrides training.workers; 0 = all cores)
    #[arg(long)]
    workers: Option<usize>,

    /// CSV report file (overrides evaluation.report_file)
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
            } else {
                println!("{}", Cli::command().render_long_help());
            }
            return ExitCode::SUCCESS;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(remediation) = err
                .downcast_ref::<logfold_core::Error>()
                .and_then(logfold_core::Error::remediation)
            {
                eprintln!();
                eprintln!("{}", remediation.render_plain());
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => Ok(Config::load_from(path)?),
        None if Path::new(DEFAULT_CONFIG).exists() => Ok(Config::load_from(Path::new(DEFAULT_CONFIG))?),
        None => Ok(Config::default()),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.log_config()).context("failed to initialize logging")?;

    let classifier = TemplateTree::load(&config.templates.path).with_context(|| {
        format!(
            "failed to load template tree {}",
            config.templates.path.display()
        )
    })?;
    let corpus = TraceCorpus::open(&cli.corpus)
        .with_context(|| format!("failed to open corpus {}", cli.corpus.display()))?;

    let report_path = cli
        .report
        .clone()
        .or_else(|| config.evaluation.report_file.clone())
        .unwrap_or_else(|| cli.experiment.default_report());
    let report = ReportWriter::create(&report_path)?;
    let workers = cli.workers.unwrap_or(config.training.workers);

    Experiment::new(&config, &classifier, corpus, report, workers).run(cli.experiment)?;
    Ok(())
}
