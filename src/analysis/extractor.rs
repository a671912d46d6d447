use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::pattern::{classify, ArchitecturePattern, PatternThresholds};
use super::vocabulary::{CapabilityVocabulary, SafetyRules};
use crate::document::{content_hash, Document, Identity};

/// Features derived from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub capabilities: BTreeSet<String>,
    pub safety_measures: BTreeMap<String, String>,
    pub architecture_pattern: ArchitecturePattern,
}

impl FeatureSet {
    pub fn with_capabilities<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capabilities: tags.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Full report for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub identity: Option<Identity>,
    pub features: FeatureSet,
    pub length: usize,
    pub distinctive_traits: Vec<String>,
}

/// Heuristic feature extraction driven by injectable rule tables.
pub struct FeatureExtractor {
    vocabulary: CapabilityVocabulary,
    safety_rules: SafetyRules,
    thresholds: PatternThresholds,
    memo: Option<Mutex<HashMap<[u8; 32], FeatureSet>>>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(
            CapabilityVocabulary::default(),
            SafetyRules::default(),
            PatternThresholds::default(),
        )
    }
}

impl FeatureExtractor {
    pub fn new(
        vocabulary: CapabilityVocabulary,
        safety_rules: SafetyRules,
        thresholds: PatternThresholds,
    ) -> Self {
        Self {
            vocabulary,
            safety_rules,
            thresholds,
            memo: None,
        }
    }

    pub fn with_thresholds(thresholds: PatternThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    /// Cache results by content hash. Identical text always yields identical
    /// features, so the cache never needs invalidation.
    pub fn with_memoization(mut self) -> Self {
        self.memo = Some(Mutex::new(HashMap::new()));
        self
    }

    pub fn vocabulary(&self) -> &CapabilityVocabulary {
        &self.vocabulary
    }

    pub fn extract(&self, document: &Document) -> FeatureSet {
        self.extract_text(document.text())
    }

    pub fn extract_text(&self, text: &str) -> FeatureSet {
        let Some(memo) = &self.memo else {
            return self.compute(text);
        };

        let key = content_hash(text);
        if let Some(hit) = lock_memo(memo).get(&key) {
            debug!("feature memo hit");
            return hit.clone();
        }

        let features = self.compute(text);
        lock_memo(memo).insert(key, features.clone());
        features
    }

    fn compute(&self, text: &str) -> FeatureSet {
        let lowered = text.to_lowercase();
        FeatureSet {
            capabilities: self.capabilities(&lowered),
            safety_measures: self.safety_measures(&lowered),
            architecture_pattern: classify(text, &self.thresholds),
        }
    }

    /// Tags whose keywords occur in `lowered`.
    pub fn capabilities(&self, lowered: &str) -> BTreeSet<String> {
        self.vocabulary
            .rules
            .iter()
            .filter(|rule| rule.matches(lowered))
            .map(|rule| rule.tag.clone())
            .collect()
    }

    /// Applies every rule in order; a later rule with the same kind replaces
    /// the earlier justification.
    pub fn safety_measures(&self, lowered: &str) -> BTreeMap<String, String> {
        let mut measures = BTreeMap::new();
        for rule in &self.safety_rules.rules {
            if rule.fires(lowered) {
                measures.insert(rule.kind.clone(), rule.justification.clone());
            }
        }
        measures
    }

    pub fn analyze(&self, document: &Document) -> Analysis {
        Analysis {
            identity: document.identity().cloned(),
            features: self.extract(document),
            length: document.len(),
            distinctive_traits: distinctive_traits(document.text()),
        }
    }
}

/// The memo only holds finished values, so a poisoned lock is still usable.
fn lock_memo(
    memo: &Mutex<HashMap<[u8; 32], FeatureSet>>,
) -> MutexGuard<'_, HashMap<[u8; 32], FeatureSet>> {
    memo.lock().unwrap_or_else(|poisoned| {
        warn!("feature memo lock was poisoned; recovering");
        poisoned.into_inner()
    })
}

/// Notable instruction styles, in a fixed order.
pub fn distinctive_traits(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let has = |needle: &str| lowered.contains(needle);
    let mut traits = Vec::new();

    if has("adapt") || has("adjust") {
        traits.push("Adaptive behavior instructions".to_string());
    }
    if has("personality") || has("tone") {
        traits.push("Personality/tone specifications".to_string());
    }
    if has("step") || has("first") {
        traits.push("Step-by-step reasoning instructions".to_string());
    }
    if has("ask") && has("question") {
        traits.push("Active questioning instructions".to_string());
    }
    if has("cutoff") || has("knowledge") {
        traits.push("Knowledge cutoff acknowledgment".to_string());
    }

    let length = text.chars().count();
    if length > 3000 {
        traits.push("Extensive detailed instructions".to_string());
    } else if length < 500 {
        traits.push("Concise minimal instructions".to_string());
    }

    traits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::vocabulary::{CapabilityRule, SafetyRule};

    #[test]
    fn test_capabilities_match_any_keyword() {
        let extractor = FeatureExtractor::default();
        let caps = extractor.extract_text("Use PYTHON and browse the Internet.").capabilities;
        assert!(caps.contains("code"));
        assert!(caps.contains("search"));
        assert!(!caps.contains("image"));
    }

    #[test]
    fn test_no_signal_yields_empty_defaults() {
        let features = FeatureExtractor::default().extract_text("");
        assert!(features.capabilities.is_empty());
        assert!(features.safety_measures.is_empty());
        assert_eq!(features.architecture_pattern, ArchitecturePattern::Unknown);
    }

    #[test]
    fn test_last_matching_safety_rule_wins_per_kind() {
        let rules = SafetyRules::new(vec![
            SafetyRule::new(&["never"], "prohibitions", "first"),
            SafetyRule::new(&["privacy"], "privacy_protection", "privacy"),
            SafetyRule::new(&["do not"], "prohibitions", "second"),
        ]);
        let extractor = FeatureExtractor::new(
            CapabilityVocabulary::default(),
            rules,
            PatternThresholds::default(),
        );

        let both = extractor.safety_measures("never share. do not ask.");
        assert_eq!(both.get("prohibitions").map(String::as_str), Some("second"));

        let only_first = extractor.safety_measures("never share.");
        assert_eq!(
            only_first.get("prohibitions").map(String::as_str),
            Some("first")
        );
        assert!(!only_first.contains_key("privacy_protection"));
    }

    #[test]
    fn test_custom_vocabulary_is_used() {
        let vocab = CapabilityVocabulary::new(vec![CapabilityRule::new("cooking", &["recipe"])]);
        let extractor =
            FeatureExtractor::new(vocab, SafetyRules::default(), PatternThresholds::default());
        let caps = extractor.extract_text("Share a recipe and write code").capabilities;
        assert_eq!(caps.into_iter().collect::<Vec<_>>(), vec!["cooking"]);
    }

    #[test]
    fn test_memoized_results_match_fresh_results() {
        let text = "You are Ada, a tutor. Never share personal information.";
        let plain = FeatureExtractor::default();
        let memo = FeatureExtractor::default().with_memoization();
        let first = memo.extract_text(text);
        let second = memo.extract_text(text);
        assert_eq!(first, second);
        assert_eq!(first, plain.extract_text(text));
    }

    #[test]
    fn test_poisoned_memo_still_serves_results() {
        use std::sync::Arc;

        let extractor = Arc::new(FeatureExtractor::default().with_memoization());
        let text = "You can write python code.";
        let first = extractor.extract_text(text);

        let holder = Arc::clone(&extractor);
        let _ = std::thread::spawn(move || {
            let _guard = holder.memo.as_ref().unwrap().lock().unwrap();
            panic!("panic while holding the memo lock");
        })
        .join();
        assert!(extractor.memo.as_ref().unwrap().is_poisoned());

        assert_eq!(extractor.extract_text(text), first);
        let fresh = extractor.extract_text("Search the web.");
        assert_eq!(fresh.capabilities.into_iter().collect::<Vec<_>>(), vec!["search"]);
    }

    #[test]
    fn test_distinctive_traits_length_buckets() {
        assert!(distinctive_traits("short")
            .contains(&"Concise minimal instructions".to_string()));
        let long = "x".repeat(3001);
        assert!(distinctive_traits(&long)
            .contains(&"Extensive detailed instructions".to_string()));
        let medium = "y".repeat(1000);
        assert!(distinctive_traits(&medium).is_empty());
    }

    #[test]
    fn test_analyze_carries_identity_and_length() {
        let id = Identity::new("kimi", "base-chat").unwrap();
        let doc = Document::new(id.clone(), "Ask a question when unsure.");
        let analysis = FeatureExtractor::default().analyze(&doc);
        assert_eq!(analysis.identity, Some(id));
        assert_eq!(analysis.length, 27);
        assert!(analysis
            .distinctive_traits
            .contains(&"Active questioning instructions".to_string()));
    }
}
