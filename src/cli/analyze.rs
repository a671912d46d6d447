use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;

use crate::analysis::{Analysis, AnalysisSession, LineDiff};
use crate::cli::Workspace;
use crate::document::Identity;

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    #[serde(flatten)]
    analysis: &'a Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    baseline: Option<&'a LineDiff>,
}

pub fn render(analysis: &Analysis, label: &str, diff: Option<&LineDiff>) -> String {
    let features = &analysis.features;
    let mut out = format!("Analysis: {}\n", label);
    out.push_str(&format!("  Length: {} chars\n", analysis.length));
    out.push_str(&format!("  Pattern: {}\n", features.architecture_pattern));

    let caps: Vec<&str> = features.capabilities.iter().map(String::as_str).collect();
    if caps.is_empty() {
        out.push_str("  Capabilities: (none detected)\n");
    } else {
        out.push_str(&format!("  Capabilities: {}\n", caps.join(", ")));
    }

    if !features.safety_measures.is_empty() {
        out.push_str("  Safety measures:\n");
        for (kind, excerpt) in &features.safety_measures {
            out.push_str(&format!("    - {}: {}\n", kind, excerpt));
        }
    }

    if !analysis.distinctive_traits.is_empty() {
        out.push_str("  Distinctive traits:\n");
        for t in &analysis.distinctive_traits {
            out.push_str(&format!("    - {}\n", t));
        }
    }

    if let Some(diff) = diff {
        out.push_str(&format!(
            "  Baseline similarity: {:.1}% (+{} / -{} lines, {} shared)\n",
            diff.similarity * 100.0,
            diff.lines_added,
            diff.lines_removed,
            diff.common_lines
        ));
        for line in &diff.unique_to_current {
            out.push_str(&format!("    + {}\n", line));
        }
        for line in &diff.unique_to_baseline {
            out.push_str(&format!("    - {}\n", line));
        }
    }
    out
}

pub fn run(
    workspace: &Workspace,
    identity: Option<String>,
    file: Option<String>,
    baseline: Option<String>,
    json: bool,
) -> Result<()> {
    let mut session = AnalysisSession::new(workspace.extractor());
    match (&identity, &file) {
        (Some(id), None) => {
            let id: Identity = id.parse()?;
            session.load(&workspace.corpus, &id)?;
        }
        _ => {
            let doc = crate::cli::resolve_document(workspace, identity.as_deref(), file.as_deref())?;
            session.load_document(doc);
        }
    }

    let analysis = session.analysis()?;
    let diff = match baseline {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read baseline: {}", path))?;
            Some(session.compare_with_baseline(&text)?)
        }
        None => None,
    };

    if json {
        let output = AnalyzeOutput {
            analysis: &analysis,
            baseline: diff.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render(&analysis, &session.document()?.label(), diff.as_ref()));
    }
    Ok(())
}
