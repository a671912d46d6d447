//! Rule tables for capability and safety-measure detection.
//!
//! Both tables are plain data so callers can swap them without touching the
//! matching logic. Order matters: capability rules are reported in table
//! order, and safety rules are applied in order with later rules overwriting
//! earlier ones that share a measure kind.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRule {
    pub tag: String,
    pub keywords: Vec<String>,
}

impl CapabilityRule {
    pub fn new(tag: &str, keywords: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// `lowered` must already be lowercase.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Controlled vocabulary of capability tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityVocabulary {
    pub rules: Vec<CapabilityRule>,
}

impl CapabilityVocabulary {
    pub fn new(rules: Vec<CapabilityRule>) -> Self {
        Self { rules }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.tag.as_str())
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.rules.iter().any(|r| r.tag == tag)
    }
}

impl Default for CapabilityVocabulary {
    fn default() -> Self {
        Self::new(vec![
            CapabilityRule::new("image", &["image", "vision", "visual", "picture", "photo"]),
            CapabilityRule::new(
                "code",
                &["code", "programming", "python", "javascript", "coding"],
            ),
            CapabilityRule::new("search", &["search", "browse", "web", "internet", "look up"]),
            CapabilityRule::new("analysis", &["analyze", "analysis", "evaluate", "assess"]),
            CapabilityRule::new("generation", &["generate", "create", "write", "produce"]),
            CapabilityRule::new("math", &["math", "mathematics", "calculate", "computation"]),
            CapabilityRule::new("reasoning", &["reason", "reasoning", "think", "logical"]),
            CapabilityRule::new("memory", &["memory", "remember", "recall", "context"]),
            CapabilityRule::new("tools", &["tool", "function", "api", "plugin"]),
            CapabilityRule::new("translation", &["translate", "translation", "multilingual"]),
            CapabilityRule::new("summarization", &["summarize", "summarise", "summary", "tl;dr"]),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRule {
    pub keywords: Vec<String>,
    pub kind: String,
    pub justification: String,
}

impl SafetyRule {
    pub fn new(keywords: &[&str], kind: &str, justification: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            kind: kind.to_string(),
            justification: justification.to_string(),
        }
    }

    /// `lowered` must already be lowercase.
    pub fn fires(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Ordered safety-measure rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRules {
    pub rules: Vec<SafetyRule>,
}

impl SafetyRules {
    pub fn new(rules: Vec<SafetyRule>) -> Self {
        Self { rules }
    }
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self::new(vec![
            SafetyRule::new(
                &["do not", "don't", "never"],
                "prohibitions",
                "Explicit prohibitions or restrictions found",
            ),
            SafetyRule::new(
                &["refuse", "cannot", "unable to"],
                "refusal_behavior",
                "Instructions for refusing certain requests",
            ),
            SafetyRule::new(
                &["harm", "harmful", "safety", "safe"],
                "harm_prevention",
                "Harm prevention guidelines present",
            ),
            SafetyRule::new(
                &["personal information", "privacy", "confidential"],
                "privacy_protection",
                "Privacy protection guidelines present",
            ),
            SafetyRule::new(
                &["bias", "fair", "unbiased"],
                "bias_mitigation",
                "Bias mitigation guidelines present",
            ),
            SafetyRule::new(
                &["disclaimer", "not medical"],
                "disclaimers",
                "Appropriate use disclaimers present",
            ),
        ])
    }
}
