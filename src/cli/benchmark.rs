use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::benchmark::{BenchmarkHarness, BenchmarkOptions, BenchmarkReport, RefusalClassifier};
use crate::cli::{emit, resolve_document, Workspace};
use crate::config::Config;
use crate::export::{benchmark_report, ReportFormat};
use crate::llm::{create_client, GenerationClient};

#[derive(Args, Debug, Clone, Default)]
pub struct BenchmarkArgs {
    /// Template to use as system prompt, as provider/model
    pub identity: Option<String>,

    /// Read the template from a file instead of the corpus
    #[arg(long)]
    pub file: Option<String>,

    /// Test phrase (repeatable; defaults to the configured phrases)
    #[arg(long = "phrase")]
    pub phrases: Vec<String>,

    /// File with one test phrase per line
    #[arg(long)]
    pub phrases_file: Option<String>,

    /// Number of abstraction levels to run
    #[arg(long)]
    pub levels: Option<usize>,

    /// Run policy: independent or cascade
    #[arg(long)]
    pub policy: Option<String>,

    /// Maximum in-flight requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Run-level timeout in seconds (0 disables it)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Override the model that receives the requests
    #[arg(long)]
    pub model: Option<String>,

    /// Report format: markdown or json
    #[arg(long, default_value = "markdown")]
    pub format: String,

    /// Output file (defaults to stdout)
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Use the mock client instead of a real provider
    #[arg(long)]
    pub dry_run: bool,
}

/// Apply CLI overrides to the `[benchmark]` section.
pub fn apply_overrides(config: &mut Config, args: &BenchmarkArgs) {
    let bench = &mut config.benchmark;
    if let Some(levels) = args.levels {
        info!("CLI override: levels = {}", levels);
        bench.levels = levels;
    }
    if let Some(policy) = &args.policy {
        info!("CLI override: policy = {}", policy);
        bench.policy = policy.clone();
    }
    if let Some(concurrency) = args.concurrency {
        info!("CLI override: concurrency = {}", concurrency);
        bench.concurrency = concurrency;
    }
    if let Some(timeout) = args.timeout {
        info!("CLI override: run timeout = {}s", timeout);
        bench.run_timeout_secs = (timeout > 0).then_some(timeout);
    }
    if let Some(model) = &args.model {
        info!("CLI override: benchmark model = {}", model);
        bench.model = Some(model.clone());
    }
}

pub fn options_from_config(config: &Config) -> BenchmarkOptions {
    BenchmarkOptions {
        levels: config.benchmark.levels,
        policy: config.benchmark.get_policy(),
        concurrency: config.benchmark.concurrency,
        run_timeout: config.benchmark.run_timeout(),
        model: config.benchmark_model().to_string(),
    }
}

fn collect_phrases(config: &Config, args: &BenchmarkArgs) -> Result<Vec<String>> {
    let mut phrases: Vec<String> = args
        .phrases
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if let Some(path) = &args.phrases_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read phrases file: {}", path))?;
        phrases.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string),
        );
    }
    if phrases.is_empty() {
        phrases = config.benchmark.test_phrases.clone();
    }
    Ok(phrases)
}

pub async fn run(mut workspace: Workspace, args: BenchmarkArgs) -> Result<()> {
    let format: ReportFormat = args.format.parse()?;
    apply_overrides(&mut workspace.config, &args);
    let config = &workspace.config;

    let template = resolve_document(&workspace, args.identity.as_deref(), args.file.as_deref())?;
    let phrases = collect_phrases(config, &args)?;
    let client: Arc<dyn GenerationClient> = Arc::from(create_client(config, args.dry_run)?);

    let mut harness = BenchmarkHarness::new(client, options_from_config(config));
    if let Some(indicators) = &config.benchmark.refusal_indicators {
        harness = harness.with_classifier(RefusalClassifier::new(indicators));
    }

    let run = harness.run(&template, &phrases).await?;
    let report = BenchmarkReport::from_run(&run, harness.ladder());
    info!(
        "Overall rejection rate {:.1}% over {} attempts",
        report.summary.rejection_rate * 100.0,
        report.summary.total
    );
    if run.timed_out {
        tracing::warn!(
            "Run stopped after {:?}; report covers completed attempts only",
            config.benchmark.run_timeout().unwrap_or(Duration::ZERO)
        );
    }

    emit(args.output.as_deref(), &benchmark_report(&report, format)?)
}
