use anyhow::{bail, Context, Result};
use clap::Args;
use std::fs;
use tracing::info;

use crate::cli::{emit, split_list, Workspace};
use crate::corpus::CorpusStore;
use crate::document::Identity;
use crate::rewrite::{render_preview, CustomizationRequest, TemplateRewriter};

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Base template as provider/model
    #[arg(long)]
    pub base: Option<String>,

    /// JSON customization request; flags below override its fields
    #[arg(long)]
    pub request: Option<String>,

    /// Replacement role statement
    #[arg(long)]
    pub role: Option<String>,

    /// Tone, e.g. "friendly and concise"
    #[arg(long)]
    pub tone: Option<String>,

    /// Capability to list (repeatable or comma-separated)
    #[arg(long = "capability")]
    pub capabilities: Vec<String>,

    /// Constraint to append (repeatable)
    #[arg(long = "constraint")]
    pub constraints: Vec<String>,

    #[arg(long)]
    pub use_case: Option<String>,

    #[arg(long)]
    pub output_format: Option<String>,

    /// Extra context appended as a trailing section
    #[arg(long)]
    pub context: Option<String>,

    /// Print the edit plan instead of the result
    #[arg(long)]
    pub preview: bool,

    /// Output file (defaults to stdout)
    #[arg(short = 'o', long)]
    pub output: Option<String>,
}

/// Merge the request file and the flags into one request.
pub fn assemble_request(args: &BuildArgs) -> Result<CustomizationRequest> {
    let mut request = match &args.request {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read request file: {}", path))?;
            serde_json::from_str::<CustomizationRequest>(&content)
                .with_context(|| format!("Invalid customization request in {}", path))?
        }
        None => CustomizationRequest::default(),
    };

    if let Some(base) = &args.base {
        request.base_identity = Some(base.parse::<Identity>()?);
    }
    if args.role.is_some() {
        request.role_description = args.role.clone();
    }
    if args.tone.is_some() {
        request.tone_preference = args.tone.clone();
    }
    if !args.capabilities.is_empty() {
        request.capabilities_needed = split_list(&args.capabilities);
    }
    if !args.constraints.is_empty() {
        request.constraints_to_add.extend(args.constraints.iter().cloned());
    }
    if args.use_case.is_some() {
        request.use_case = args.use_case.clone();
    }
    if args.output_format.is_some() {
        request.output_format = args.output_format.clone();
    }
    if args.context.is_some() {
        request.additional_context = args.context.clone();
    }
    Ok(request)
}

pub fn run(workspace: &Workspace, args: BuildArgs) -> Result<()> {
    let request = assemble_request(&args)?;
    let Some(identity) = request.base_identity.clone() else {
        bail!("A base template is required (--base provider/model or base_identity in --request)");
    };

    let base = workspace.corpus.load(&identity)?;
    let rewriter = TemplateRewriter::default();

    if args.preview {
        let changes = rewriter.preview(&request, &base)?;
        print!("{}", render_preview(&base, &changes));
        return Ok(());
    }

    let built = rewriter.build(&request, &base)?;
    info!("Customized {} ({} chars)", identity, built.len());
    emit(args.output.as_deref(), built.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support;

    #[test]
    fn test_flags_override_request_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("req.json");
        fs::write(
            &path,
            r#"{"base_identity": {"provider": "openai", "model": "gpt-4o"}, "tone_preference": "formal", "constraints_to_add": ["Be brief"]}"#,
        )
        .unwrap();
        let args = BuildArgs {
            request: Some(path.display().to_string()),
            tone: Some("playful".into()),
            constraints: vec!["Cite sources".into()],
            capabilities: vec!["code, math".into()],
            ..Default::default()
        };
        let request = assemble_request(&args).unwrap();
        assert_eq!(request.base_identity.unwrap().model, "gpt-4o");
        assert_eq!(request.tone_preference.as_deref(), Some("playful"));
        assert_eq!(request.constraints_to_add, vec!["Be brief", "Cite sources"]);
        assert_eq!(request.capabilities_needed, vec!["code", "math"]);
    }

    #[test]
    fn test_run_requires_base() {
        let dir = test_support::corpus();
        let ws = Workspace::open(None, Some(dir.path().display().to_string())).unwrap();
        let args = BuildArgs {
            tone: Some("warm".into()),
            ..Default::default()
        };
        assert!(run(&ws, args).is_err());
    }

    #[test]
    fn test_run_writes_output() {
        let dir = test_support::corpus();
        let out = dir.path().join("custom.md");
        let ws = Workspace::open(None, Some(dir.path().display().to_string())).unwrap();
        let args = BuildArgs {
            base: Some("anthropic/claude".into()),
            constraints: vec!["Always cite sources".into()],
            output: Some(out.display().to_string()),
            ..Default::default()
        };
        run(&ws, args).unwrap();
        let text = fs::read_to_string(out).unwrap();
        assert!(text.starts_with("You are Claude, an assistant."));
        assert!(text.contains("- Never share private data\n- Always cite sources"));
    }

    #[test]
    fn test_noop_request_fails() {
        let dir = test_support::corpus();
        let ws = Workspace::open(None, Some(dir.path().display().to_string())).unwrap();
        let args = BuildArgs {
            base: Some("anthropic/claude".into()),
            ..Default::default()
        };
        assert!(run(&ws, args).is_err());
    }
}
