//! Corpus storage: documents keyed by `(provider, model)`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::document::{Document, Identity};
use crate::error::{CoreError, Result};
use crate::util::sanitize_path_component;

const SYSTEM_PROMPT_MARKER: &str = "## System Prompt";

pub trait CorpusStore: Send + Sync {
    /// Fails with `NotFound` when no entry exists for `identity`.
    fn load(&self, identity: &Identity) -> Result<Document>;

    /// All keys, sorted by provider then model.
    fn list_keys(&self) -> Result<Vec<Identity>>;

    fn load_all(&self) -> Result<Vec<Document>> {
        self.list_keys()?.iter().map(|id| self.load(id)).collect()
    }
}

/// Markdown files laid out as `<root>/<provider>/<model>.md`.
pub struct FsCorpus {
    root: PathBuf,
    excluded_dirs: Vec<String>,
}

impl FsCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded_dirs: vec!["docs".to_string()],
        }
    }

    pub fn with_excluded_dirs(mut self, excluded: Vec<String>) -> Self {
        self.excluded_dirs = excluded;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the file for an identity, trying `-`/`_` spellings of the model.
    pub fn resolve_path(&self, identity: &Identity) -> Result<PathBuf> {
        let provider = sanitize_path_component(&identity.provider);
        let model = sanitize_path_component(&identity.model);
        if provider.is_empty() || model.is_empty() {
            return Err(CoreError::InvalidRequest(format!(
                "'{}' is empty after sanitization",
                identity
            )));
        }

        let candidates = [
            model.clone(),
            model.replace('-', "_"),
            model.replace('_', "-"),
        ];

        let root = match self.root.canonicalize() {
            Ok(root) => root,
            Err(_) => {
                return Err(CoreError::NotFound(format!(
                    "{} (corpus root {} does not exist)",
                    identity,
                    self.root.display()
                )))
            }
        };

        for name in &candidates {
            let path = root.join(&provider).join(format!("{}.md", name));
            let Ok(resolved) = path.canonicalize() else {
                continue;
            };
            if !resolved.starts_with(&root) {
                warn!("Skipping {:?}: resolves outside the corpus root", path);
                continue;
            }
            if resolved.is_file() {
                return Ok(resolved);
            }
        }

        Err(CoreError::NotFound(format!(
            "{} (tried {}.md under {})",
            identity,
            candidates.join(".md, "),
            root.join(&provider).display()
        )))
    }
}

impl CorpusStore for FsCorpus {
    fn load(&self, identity: &Identity) -> Result<Document> {
        let path = self.resolve_path(identity)?;
        debug!("Loading {} from {:?}", identity, path);
        let content = fs::read_to_string(&path)?;
        Ok(Document::new(
            identity.clone(),
            extract_system_prompt(&content),
        ))
    }

    fn list_keys(&self) -> Result<Vec<Identity>> {
        if !self.root.is_dir() {
            warn!("Corpus root {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let provider = entry.file_name().to_string_lossy().to_string();
            if !entry.file_type()?.is_dir() || self.excluded_dirs.contains(&provider) {
                continue;
            }
            for model_entry in fs::read_dir(entry.path())? {
                let path = model_entry?.path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if let Ok(id) = Identity::new(provider.clone(), stem) {
                        keys.push(id);
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory corpus, mainly for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    entries: BTreeMap<Identity, String>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identity: Identity, text: impl Into<String>) {
        self.entries.insert(identity, text.into());
    }

    pub fn with_entry(mut self, identity: Identity, text: impl Into<String>) -> Self {
        self.insert(identity, text);
        self
    }
}

impl CorpusStore for MemoryCorpus {
    fn load(&self, identity: &Identity) -> Result<Document> {
        self.entries
            .get(identity)
            .map(|text| Document::new(identity.clone(), text.clone()))
            .ok_or_else(|| CoreError::NotFound(identity.to_string()))
    }

    fn list_keys(&self) -> Result<Vec<Identity>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// The prompt body of a corpus file: the `## System Prompt` section up to the
/// next `---` rule or `## ` heading, or else the whole file minus a leading
/// `#` title line.
pub fn extract_system_prompt(content: &str) -> String {
    if let Some(pos) = content.find(SYSTEM_PROMPT_MARKER) {
        let section = &content[pos + SYSTEM_PROMPT_MARKER.len()..];
        let end = ["\n---\n", "\n## "]
            .iter()
            .find_map(|sep| section.find(sep))
            .unwrap_or(section.len());
        return section[..end].trim().to_string();
    }

    match content.split_once('\n') {
        Some((first, rest)) if first.starts_with('#') => rest.trim().to_string(),
        None if content.starts_with('#') => String::new(),
        _ => content.trim().to_string(),
    }
}
