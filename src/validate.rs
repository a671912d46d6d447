//! Content checks for corpus template files.
//!
//! A file fails when it contains a prohibited term. Warning terms, missing
//! metadata fields and a missing `## System Prompt` section are reported but
//! do not fail the file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Suggestion => write!(f, "suggestion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(severity: Severity, category: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.to_string(),
            message: message.into(),
        }
    }
}

/// Term lists and required metadata. Terms are matched lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default = "default_prohibited_terms")]
    pub prohibited_terms: Vec<String>,

    #[serde(default = "default_warning_terms")]
    pub warning_terms: Vec<String>,

    /// Fields expected as `**Field:**` lines in the file header
    #[serde(default = "default_metadata_fields")]
    pub metadata_fields: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            prohibited_terms: default_prohibited_terms(),
            warning_terms: default_warning_terms(),
            metadata_fields: default_metadata_fields(),
        }
    }
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn default_prohibited_terms() -> Vec<String> {
    owned(&["hitler", "stalin", "mao", "genocide", "extremist propaganda"])
}

fn default_warning_terms() -> Vec<String> {
    owned(&[
        "evasion",
        "bypass",
        "jailbreak",
        "constraint removal",
        "filter",
        "break free",
        "escape",
        "unshackled",
    ])
}

fn default_metadata_fields() -> Vec<String> {
    owned(&["source", "model"])
}

/// Result for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileValidation {
    pub path: PathBuf,
    pub issues: Vec<ValidationIssue>,
    /// 0.0..=1.0; 0.1 off each for a missing source or date mention
    pub metadata_score: f64,
}

impl FileValidation {
    pub fn is_valid(&self) -> bool {
        self.count(Severity::Error) == 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentValidator {
    rules: ValidationRules,
}

impl ContentValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// Term and disclaimer checks on raw text.
    pub fn check_text(&self, content: &str) -> Vec<ValidationIssue> {
        let lowered = content.to_lowercase();
        let mut issues = Vec::new();

        for term in &self.rules.prohibited_terms {
            if lowered.contains(term.as_str()) {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    "prohibited-term",
                    format!("Prohibited term found: '{}'. Use fictional alternatives", term),
                ));
            }
        }

        for term in &self.rules.warning_terms {
            if lowered.contains(term.as_str()) {
                issues.push(ValidationIssue::new(
                    Severity::Warning,
                    "warning-term",
                    format!(
                        "Warning term found: '{}'. Make sure the context is clearly educational",
                        term
                    ),
                ));
            }
        }

        if !content.contains('⚠') && !lowered.contains("disclaimer") {
            issues.push(ValidationIssue::new(
                Severity::Suggestion,
                "disclaimer",
                "Consider adding a disclaimer or educational notice",
            ));
        }

        issues
    }

    /// All checks for the content of a template file.
    pub fn validate_content(&self, path: impl Into<PathBuf>, content: &str) -> FileValidation {
        let mut issues = self.check_text(content);
        let lowered = content.to_lowercase();

        for field in &self.rules.metadata_fields {
            let marker = format!("**{}:**", field.to_lowercase());
            if !lowered.contains(&marker) {
                issues.push(ValidationIssue::new(
                    Severity::Warning,
                    "metadata",
                    format!("Missing metadata field: '{}'", field),
                ));
            }
        }

        if !content.contains("## System Prompt") {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                "structure",
                "Missing '## System Prompt' section header",
            ));
        }

        issues.sort_by_key(|i| i.severity);
        FileValidation {
            path: path.into(),
            issues,
            metadata_score: metadata_score(&lowered),
        }
    }

    /// A missing or unreadable file is reported as a failed validation.
    pub fn validate_file(&self, path: &Path) -> FileValidation {
        match fs::read_to_string(path) {
            Ok(content) => self.validate_content(path, &content),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                FileValidation {
                    path: path.to_path_buf(),
                    issues: vec![ValidationIssue::new(
                        Severity::Error,
                        "io",
                        format!("Could not read file: {}", e),
                    )],
                    metadata_score: 0.0,
                }
            }
        }
    }

    /// Every `.md` file under `dir`, recursively, sorted by path. Hidden
    /// directories are skipped.
    pub fn validate_directory(&self, dir: &Path) -> Result<Vec<FileValidation>, CoreError> {
        if !dir.is_dir() {
            return Err(CoreError::NotFound(format!(
                "directory {}",
                dir.display()
            )));
        }
        let mut files = Vec::new();
        collect_markdown(dir, &mut files)?;
        files.sort();
        debug!("Validating {} files under {}", files.len(), dir.display());
        Ok(files.iter().map(|f| self.validate_file(f)).collect())
    }
}

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CoreError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if path.is_dir() {
            if !hidden {
                collect_markdown(&path, out)?;
            }
        } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
            out.push(path);
        }
    }
    Ok(())
}

fn metadata_score(lowered: &str) -> f64 {
    let mut score: f64 = 1.0;
    if !lowered.contains("source") {
        score -= 0.1;
    }
    if !lowered.contains("date") {
        score -= 0.1;
    }
    score.max(0.0)
}

fn score_badge(score: f64) -> &'static str {
    if score < 0.5 {
        "🔴"
    } else if score < 0.8 {
        "🟡"
    } else {
        "🟢"
    }
}

pub fn validation_report(results: &[FileValidation]) -> String {
    let total = results.len();
    let valid = results.iter().filter(|r| r.is_valid()).count();
    let pass_rate = if total == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", valid as f64 / total as f64 * 100.0)
    };

    let mut lines = vec![
        "# Content Validation Report".to_string(),
        String::new(),
        "## Summary".to_string(),
        String::new(),
        format!("- Total files: {}", total),
        format!("- Valid: {}", valid),
        format!("- Invalid: {}", total - valid),
        format!("- Pass rate: {}", pass_rate),
        String::new(),
    ];

    if valid < total {
        lines.push("## Files with Errors".to_string());
        lines.push(String::new());
        for result in results.iter().filter(|r| !r.is_valid()) {
            lines.push(format!("### {}", result.path.display()));
            lines.extend(
                result
                    .with_severity(Severity::Error)
                    .map(|i| format!("- ❌ {}", i.message)),
            );
            lines.push(String::new());
        }
    }

    let warned: Vec<&FileValidation> = results
        .iter()
        .filter(|r| r.is_valid() && r.count(Severity::Warning) > 0)
        .collect();
    if !warned.is_empty() {
        lines.push("## Files with Warnings".to_string());
        lines.push(String::new());
        for result in warned {
            lines.push(format!("### {}", result.path.display()));
            lines.extend(
                result
                    .with_severity(Severity::Warning)
                    .map(|i| format!("- ⚠️ {}", i.message)),
            );
            lines.push(String::new());
        }
    }

    lines.push("## Metadata Completeness".to_string());
    lines.push(String::new());
    lines.push("| File | Score |".to_string());
    lines.push("|---|---|".to_string());
    for result in results {
        lines.push(format!(
            "| {} | {} {:.0}% |",
            result.path.display(),
            score_badge(result.metadata_score),
            result.metadata_score * 100.0
        ));
    }
    lines.push(String::new());

    lines.join("\n")
}
