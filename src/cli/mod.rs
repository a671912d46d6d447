//! Command implementations behind the `promptwright` binary.

pub mod analyze;
pub mod benchmark;
pub mod build;
pub mod compare;
pub mod install;
pub mod list;
pub mod regions;
pub mod suggest;
pub mod validate;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::analysis::{FeatureExtractor, FeatureSet};
use crate::config::Config;
use crate::corpus::{CorpusStore, FsCorpus};
use crate::document::{Document, Identity};

/// Config plus the corpus it points at, with CLI overrides applied.
pub struct Workspace {
    pub config: Config,
    pub corpus: FsCorpus,
}

impl Workspace {
    pub fn open(config_path: Option<String>, corpus_override: Option<String>) -> Result<Self> {
        let mut config = Config::load_with_path(config_path)?;
        if let Some(root) = corpus_override {
            info!("CLI override: corpus root = {}", root);
            config.corpus.root = root.into();
        }
        let corpus = FsCorpus::new(config.corpus.root.clone())
            .with_excluded_dirs(config.corpus.excluded_dirs.clone());
        Ok(Self { config, corpus })
    }

    pub fn extractor(&self) -> FeatureExtractor {
        FeatureExtractor::with_thresholds(self.config.analysis.clone())
    }

    pub fn load(&self, identity: &str) -> Result<Document> {
        let identity: Identity = identity.parse()?;
        Ok(self.corpus.load(&identity)?)
    }

    /// Features for every corpus entry, or only the listed identities.
    pub fn features(
        &self,
        extractor: &FeatureExtractor,
        only: &[String],
    ) -> Result<Vec<(Identity, FeatureSet)>> {
        let keys = if only.is_empty() {
            self.corpus.list_keys()?
        } else {
            only.iter()
                .map(|s| s.parse::<Identity>())
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        if keys.is_empty() {
            warn!("No templates found under {}", self.corpus.root().display());
        }
        keys.into_iter()
            .map(|id| -> Result<(Identity, FeatureSet)> {
                let doc = self.corpus.load(&id)?;
                let features = extractor.extract(&doc);
                Ok((id, features))
            })
            .collect()
    }
}

/// Load a template from a corpus identity or, when `file` is set, from disk.
pub fn resolve_document(
    workspace: &Workspace,
    identity: Option<&str>,
    file: Option<&str>,
) -> Result<Document> {
    match (identity, file) {
        (_, Some(path)) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read template file: {}", path))?;
            Ok(Document::derived(text))
        }
        (Some(id), None) => workspace.load(id),
        (None, None) => anyhow::bail!("Either a provider/model identity or --file is required"),
    }
}

/// Write to `path`, or stdout when none is given.
pub fn emit(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
            }
            fs::write(path, content).with_context(|| format!("Failed to write {}", path))?;
            info!("Wrote {}", path);
        }
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

/// Split repeated and comma-separated flag values into trimmed items.
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
