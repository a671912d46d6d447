//! Template documents and the identities that key them in a corpus.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// A `(provider, model)` pair. Both parts are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub provider: String,
    pub model: String,
}

impl Identity {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let provider = provider.into();
        let model = model.into();
        if provider.trim().is_empty() || model.trim().is_empty() {
            return Err(CoreError::InvalidRequest(format!(
                "provider and model must be non-empty (got '{}/{}')",
                provider, model
            )));
        }
        Ok(Self { provider, model })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl FromStr for Identity {
    type Err = CoreError;

    /// Parse `provider/model`. The model part may itself contain `/`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((provider, model)) => Identity::new(provider.trim(), model.trim()),
            None => Err(CoreError::InvalidRequest(format!(
                "expected 'provider/model', got '{}'",
                s
            ))),
        }
    }
}

/// One template. Never mutated: every transformation yields a new `Document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    identity: Option<Identity>,
    text: String,
}

impl Document {
    /// A document loaded from a corpus entry.
    pub fn new(identity: Identity, text: impl Into<String>) -> Self {
        Self {
            identity: Some(identity),
            text: text.into(),
        }
    }

    /// A derived artifact (e.g. a rewrite result) with no corpus identity.
    pub fn derived(text: impl Into<String>) -> Self {
        Self {
            identity: None,
            text: text.into(),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// SHA-256 of the raw text.
    pub fn content_hash(&self) -> [u8; 32] {
        content_hash(&self.text)
    }

    pub fn label(&self) -> String {
        self.identity
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<derived>".to_string())
    }
}

pub(crate) fn content_hash(text: &str) -> [u8; 32] {
    Sha256::digest(text.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parse() {
        let id: Identity = "openai/gpt-4o".parse().unwrap();
        assert_eq!(id.provider, "openai");
        assert_eq!(id.model, "gpt-4o");
        assert_eq!(id.to_string(), "openai/gpt-4o");
    }

    #[test]
    fn test_identity_parse_rejects_missing_slash_or_side() {
        assert!("openai".parse::<Identity>().is_err());
        assert!("/gpt-4o".parse::<Identity>().is_err());
        assert!("openai/ ".parse::<Identity>().is_err());
    }

    #[test]
    fn test_identity_model_may_contain_slash() {
        let id: Identity = "openrouter/meta/llama-3".parse().unwrap();
        assert_eq!(id.provider, "openrouter");
        assert_eq!(id.model, "meta/llama-3");
    }

    #[test]
    fn test_document_hash_depends_only_on_text() {
        let a = Document::new(Identity::new("a", "b").unwrap(), "same text");
        let b = Document::derived("same text");
        let c = Document::derived("other text");
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_derived_has_no_identity() {
        let doc = Document::derived("x");
        assert!(doc.identity().is_none());
        assert_eq!(doc.label(), "<derived>");
    }
}
