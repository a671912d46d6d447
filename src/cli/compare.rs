use anyhow::Result;
use tracing::info;

use crate::cli::{emit, Workspace};
use crate::export::{comparison_report, ReportFormat};
use crate::similarity::ComparisonReport;

/// Compare the listed templates, or the whole corpus when none are given.
pub fn run(
    workspace: &Workspace,
    identities: Vec<String>,
    format: String,
    output: Option<String>,
) -> Result<()> {
    let format: ReportFormat = format.parse()?;
    let extractor = workspace.extractor();
    let entries = workspace.features(&extractor, &identities)?;
    info!("Comparing {} templates", entries.len());

    let report = ComparisonReport::build(&entries)?;
    emit(output.as_deref(), &comparison_report(&report, format)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support;

    #[test]
    fn test_compare_writes_markdown() {
        let dir = test_support::corpus();
        let out = dir.path().join("report.md");
        let ws = Workspace::open(None, Some(dir.path().display().to_string())).unwrap();
        run(
            &ws,
            vec![],
            "markdown".into(),
            Some(out.display().to_string()),
        )
        .unwrap();
        let md = std::fs::read_to_string(out).unwrap();
        assert!(md.contains("# System Prompt Comparison"));
        assert!(md.contains("anthropic/claude"));
        assert!(md.contains("openai/gpt-4o"));
    }

    #[test]
    fn test_compare_rejects_bad_format_and_empty_corpus() {
        let dir = tempfile::TempDir::new().unwrap();
        let ws = Workspace::open(None, Some(dir.path().display().to_string())).unwrap();
        assert!(run(&ws, vec![], "yaml".into(), None).is_err());
        assert!(run(&ws, vec![], "json".into(), None).is_err());
    }
}
