use anyhow::{bail, Result};
use std::collections::BTreeSet;
use tracing::warn;

use crate::cli::{split_list, Workspace};
use crate::similarity::{rank_with_scores, suggest_for_use_case};

/// Rank templates that cover every requested capability.
pub fn run(workspace: &Workspace, capabilities: Vec<String>, limit: usize) -> Result<()> {
    let requirements: BTreeSet<String> = split_list(&capabilities)
        .into_iter()
        .map(|c| c.to_lowercase())
        .collect();
    if requirements.is_empty() {
        bail!("At least one --capability is required");
    }

    let extractor = workspace.extractor();
    for tag in &requirements {
        if !extractor.vocabulary().contains_tag(tag) {
            warn!("'{}' is not a known capability tag; no template will match it", tag);
        }
    }

    let entries = workspace.features(&extractor, &[])?;
    let ranked = rank_with_scores(&requirements, &entries);
    if ranked.is_empty() {
        println!("No template covers all of: {}", join(&requirements));
        return Ok(());
    }

    println!("Templates covering {}:", join(&requirements));
    for candidate in ranked.iter().take(limit) {
        let extra = if candidate.extra_capabilities.is_empty() {
            String::new()
        } else {
            format!("  (also: {})", candidate.extra_capabilities.join(", "))
        };
        println!(
            "  {:>5.1}%  {}{}",
            candidate.match_ratio * 100.0,
            candidate.identity,
            extra
        );
    }
    Ok(())
}

/// Suggest base templates for a free-text use case.
pub fn run_for_use_case(workspace: &Workspace, use_case: String, limit: usize) -> Result<()> {
    if use_case.trim().is_empty() {
        bail!("Use case must not be empty");
    }
    let extractor = workspace.extractor();
    let entries = workspace.features(&extractor, &[])?;
    let suggestions = suggest_for_use_case(&use_case, &entries, &extractor, limit);

    if suggestions.is_empty() {
        println!("No templates available to suggest");
        return Ok(());
    }
    println!("Suggested base templates for \"{}\":", use_case.trim());
    for (rank, s) in suggestions.iter().enumerate() {
        println!("  {}. {} ({:.1}% match)", rank + 1, s.identity, s.score * 100.0);
    }
    Ok(())
}

fn join(tags: &BTreeSet<String>) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
