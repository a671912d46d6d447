use anyhow::Result;
use std::path::Path;

use crate::cli::{emit, resolve_document, Workspace};
use crate::document::Document;
use crate::export::{format_document, InstallFormat};
use crate::util::sanitize_path_component;

/// File name used when installing into a directory.
pub fn install_file_name(document: &Document, format: InstallFormat) -> String {
    let stem = match document.identity() {
        Some(id) => format!(
            "{}_{}",
            sanitize_path_component(&id.provider),
            sanitize_path_component(&id.model)
        ),
        None => "custom".to_string(),
    };
    format!("{}.{}", stem, format.extension())
}

pub fn run(
    workspace: &Workspace,
    identity: Option<String>,
    file: Option<String>,
    format: String,
    output: Option<String>,
    dir: Option<String>,
) -> Result<()> {
    let format: InstallFormat = format.parse()?;
    let doc = resolve_document(workspace, identity.as_deref(), file.as_deref())?;
    let rendered = format_document(&doc, format);

    let target = match (output, dir) {
        (Some(path), _) => Some(path),
        (None, Some(dir)) => Some(
            Path::new(&dir)
                .join(install_file_name(&doc, format))
                .display()
                .to_string(),
        ),
        (None, None) => None,
    };
    emit(target.as_deref(), &rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support;
    use crate::document::Identity;

    #[test]
    fn test_install_file_name() {
        let doc = Document::new(Identity::new("openai", "gpt-4o").unwrap(), "x");
        assert_eq!(install_file_name(&doc, InstallFormat::Raw), "openai_gpt-4o.txt");
        assert_eq!(
            install_file_name(&Document::derived("x"), InstallFormat::OpenAi),
            "custom.json"
        );
    }

    #[test]
    fn test_install_into_directory() {
        let dir = test_support::corpus();
        let out = dir.path().join("installed");
        let ws = Workspace::open(None, Some(dir.path().display().to_string())).unwrap();
        run(
            &ws,
            Some("openai/gpt-4o".into()),
            None,
            "anthropic".into(),
            None,
            Some(out.display().to_string()),
        )
        .unwrap();
        let content = std::fs::read_to_string(out.join("openai_gpt-4o.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert!(value["system"].as_str().unwrap().starts_with("You are ChatGPT"));
    }

    #[test]
    fn test_install_rejects_unknown_format() {
        let dir = test_support::corpus();
        let ws = Workspace::open(None, Some(dir.path().display().to_string())).unwrap();
        assert!(run(&ws, Some("openai/gpt-4o".into()), None, "xml".into(), None, None).is_err());
    }
}
