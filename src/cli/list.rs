use anyhow::Result;
use std::collections::BTreeMap;

use crate::cli::Workspace;
use crate::corpus::CorpusStore;
use crate::document::Identity;

/// Group corpus keys by provider, optionally keeping a single provider.
pub fn grouped(keys: Vec<Identity>, provider: Option<&str>) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in keys {
        if provider.is_some_and(|p| !p.eq_ignore_ascii_case(&id.provider)) {
            continue;
        }
        groups.entry(id.provider).or_default().push(id.model);
    }
    groups
}

pub fn run(workspace: &Workspace, provider: Option<String>) -> Result<()> {
    let keys = workspace.corpus.list_keys()?;
    let groups = grouped(keys, provider.as_deref());

    if groups.is_empty() {
        println!("No templates found in {}", workspace.corpus.root().display());
        return Ok(());
    }

    for (provider, models) in &groups {
        println!("{}:", provider);
        for model in models {
            println!("  - {}", model);
        }
    }
    let total: usize = groups.values().map(Vec::len).sum();
    println!("\n{} templates from {} providers", total, groups.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(p: &str, m: &str) -> Identity {
        Identity::new(p, m).unwrap()
    }

    #[test]
    fn test_grouped_by_provider() {
        let keys = vec![id("anthropic", "claude"), id("openai", "gpt-4"), id("openai", "gpt-4o")];
        let groups = grouped(keys, None);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["openai"], vec!["gpt-4", "gpt-4o"]);
    }

    #[test]
    fn test_grouped_provider_filter_is_case_insensitive() {
        let keys = vec![id("anthropic", "claude"), id("openai", "gpt-4")];
        let groups = grouped(keys, Some("OpenAI"));
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["openai"]);
    }

    #[test]
    fn test_run_on_missing_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let ws = Workspace::open(None, Some(dir.path().join("nope").display().to_string())).unwrap();
        assert!(run(&ws, None).is_ok());
    }
}
