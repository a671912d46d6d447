//! Serialization of core results for files and stdout.

use anyhow::{Context, Result};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::benchmark::BenchmarkReport;
use crate::document::Document;
use crate::error::CoreError;
use crate::similarity::ComparisonReport;

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-opus-20240229";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Shapes a document can be installed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallFormat {
    Raw,
    Json,
    OpenAi,
    Anthropic,
}

impl InstallFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            InstallFormat::Raw => "txt",
            _ => "json",
        }
    }
}

impl FromStr for InstallFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(InstallFormat::Raw),
            "json" => Ok(InstallFormat::Json),
            "openai" => Ok(InstallFormat::OpenAi),
            "anthropic" => Ok(InstallFormat::Anthropic),
            other => Err(CoreError::InvalidRequest(format!(
                "unsupported format '{}' (expected raw, json, openai or anthropic)",
                other
            ))),
        }
    }
}

impl fmt::Display for InstallFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallFormat::Raw => "raw",
            InstallFormat::Json => "json",
            InstallFormat::OpenAi => "openai",
            InstallFormat::Anthropic => "anthropic",
        })
    }
}

pub fn format_document(document: &Document, format: InstallFormat) -> String {
    let text = document.text();
    let identity = document.identity();
    let value = match format {
        InstallFormat::Raw => return text.to_string(),
        InstallFormat::Json => json!({
            "system_prompt": text,
            "provider": identity.map_or("unknown", |id| id.provider.as_str()),
            "model": identity.map_or("unknown", |id| id.model.as_str()),
            "format": "json",
            "length": document.len(),
        }),
        InstallFormat::OpenAi => json!({
            "role": "system",
            "content": text,
        }),
        InstallFormat::Anthropic => json!({
            "model": identity.map_or(DEFAULT_ANTHROPIC_MODEL, |id| id.model.as_str()),
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "system": text,
            "messages": [],
        }),
    };
    format!("{:#}", value)
}

/// Report formats for comparison and benchmark output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl FromStr for ReportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(CoreError::InvalidRequest(format!(
                "unsupported report format '{}' (expected markdown or json)",
                other
            ))),
        }
    }
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn comparison_markdown(report: &ComparisonReport) -> String {
    let mut lines = vec!["# System Prompt Comparison".to_string(), String::new()];

    lines.push("## Models Compared".to_string());
    lines.push(String::new());
    lines.extend(report.models.iter().map(|m| format!("- {}", m)));
    lines.push(String::new());

    lines.push("## Architecture Patterns".to_string());
    lines.push(String::new());
    for (pattern, models) in &report.patterns {
        lines.push(format!("- {}: {}", pattern, models.join(", ")));
    }
    lines.push(format!("\nMost common: {}", report.most_common_pattern));
    lines.push(String::new());

    lines.push("## Capabilities".to_string());
    lines.push(String::new());
    for (model, caps) in &report.capabilities {
        let caps: Vec<&str> = caps.iter().map(String::as_str).collect();
        lines.push(format!("- {}: {}", model, caps.join(", ")));
    }
    let common: Vec<&str> = report.common_capabilities.iter().map(String::as_str).collect();
    lines.push(format!("\nCommon to all: {}", common.join(", ")));
    lines.push(String::new());

    if !report.safety_coverage.is_empty() {
        lines.push("## Safety Coverage".to_string());
        lines.push(String::new());
        for (kind, coverage) in &report.safety_coverage {
            lines.push(format!(
                "- {}: {} models ({:.1}%)",
                kind, coverage.count, coverage.percentage
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Compatibility Matrix".to_string());
    lines.push(String::new());
    let labels = &report.matrix.labels;
    lines.push(format!("| Model | {} |", labels.join(" | ")));
    lines.push(format!("|---|{}", "---|".repeat(labels.len())));
    for (i, label) in labels.iter().enumerate() {
        let cells: Vec<String> = (0..labels.len())
            .map(|j| percent(report.matrix.get(i, j).unwrap_or(0.0)))
            .collect();
        lines.push(format!("| {} | {} |", label, cells.join(" | ")));
    }
    lines.push(String::new());

    lines.join("\n")
}

pub fn benchmark_markdown(report: &BenchmarkReport) -> String {
    let s = &report.summary;
    let mut lines = vec![
        "# Abstraction Benchmark Results".to_string(),
        String::new(),
        "## Summary".to_string(),
        String::new(),
        format!("- Total attempts: {}", s.total),
        format!("- Rejected: {}", s.rejected),
        format!("- Overall rejection rate: {}", percent(s.rejection_rate)),
        format!("- Mean latency: {:.3}s", s.mean_latency.as_secs_f64()),
        format!("- Transport failures: {}", s.transport_failures),
    ];
    if s.timed_out {
        lines.push("- Run timed out before all attempts completed".to_string());
    }
    lines.push(String::new());

    lines.push("## Levels".to_string());
    lines.push(String::new());
    lines.push(
        "| Level | Name | Attempts | Rejected | Rejection rate | Mean latency | Mean reply length |"
            .to_string(),
    );
    lines.push("|---|---|---|---|---|---|---|".to_string());
    for level in &report.levels {
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {:.3}s | {:.1} |",
            level.level,
            level.name,
            level.count,
            level.rejected,
            percent(level.rejection_rate),
            level.mean_latency.as_secs_f64(),
            level.mean_accepted_length
        ));
    }
    lines.push(String::new());

    lines.join("\n")
}

pub fn comparison_report(report: &ComparisonReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Markdown => Ok(comparison_markdown(report)),
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize comparison")
        }
    }
}

pub fn benchmark_report(report: &BenchmarkReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Markdown => Ok(benchmark_markdown(report)),
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize benchmark report")
        }
    }
}
