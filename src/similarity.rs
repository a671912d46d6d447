//! Capability-set similarity, candidate ranking and cross-model comparison.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::analysis::{ArchitecturePattern, FeatureExtractor, FeatureSet};
use crate::document::Identity;
use crate::error::{CoreError, Result};

/// Jaccard similarity of two tag sets. Two empty sets count as identical.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

pub fn similarity(a: &FeatureSet, b: &FeatureSet) -> f64 {
    jaccard(&a.capabilities, &b.capabilities)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub identity: Identity,
    pub match_ratio: f64,
    /// Capabilities the candidate has beyond the requirements.
    pub extra_capabilities: Vec<String>,
}

fn match_ratio(requirements: &BTreeSet<String>, capabilities: &BTreeSet<String>) -> f64 {
    if capabilities.is_empty() {
        return 1.0;
    }
    requirements.len() as f64 / capabilities.len() as f64
}

/// Candidates covering every requirement, tightest fit first.
pub fn rank_with_scores(
    requirements: &BTreeSet<String>,
    candidates: &[(Identity, FeatureSet)],
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .filter(|(_, features)| requirements.is_subset(&features.capabilities))
        .map(|(identity, features)| RankedCandidate {
            identity: identity.clone(),
            match_ratio: match_ratio(requirements, &features.capabilities),
            extra_capabilities: features
                .capabilities
                .difference(requirements)
                .cloned()
                .collect(),
        })
        .collect();

    debug!(
        "{} of {} candidates cover the requirements",
        ranked.len(),
        candidates.len()
    );

    // sort_by is stable: equal ratios keep input order
    ranked.sort_by(|a, b| {
        b.match_ratio
            .partial_cmp(&a.match_ratio)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

pub fn rank_candidates(
    requirements: &BTreeSet<String>,
    candidates: &[(Identity, FeatureSet)],
) -> Vec<Identity> {
    rank_with_scores(requirements, candidates)
        .into_iter()
        .map(|c| c.identity)
        .collect()
}

/// Pairwise similarity, indexed in entry order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityMatrix {
    pub labels: Vec<String>,
    pub scores: Vec<Vec<f64>>,
}

impl CompatibilityMatrix {
    pub fn build(entries: &[(Identity, FeatureSet)]) -> Self {
        let n = entries.len();
        let mut scores = vec![vec![0.0; n]; n];
        for i in 0..n {
            scores[i][i] = 1.0;
            for j in (i + 1)..n {
                let s = similarity(&entries[i].1, &entries[j].1);
                scores[i][j] = s;
                scores[j][i] = s;
            }
        }
        Self {
            labels: entries.iter().map(|(id, _)| id.to_string()).collect(),
            scores,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.scores.get(i).and_then(|row| row.get(j)).copied()
    }

    pub fn score(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.get(i, j)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyCoverage {
    pub count: usize,
    /// Share of compared models, rounded to one decimal.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub models: Vec<String>,
    pub capabilities: BTreeMap<String, BTreeSet<String>>,
    pub all_capabilities: BTreeSet<String>,
    pub common_capabilities: BTreeSet<String>,
    pub unique_capabilities: BTreeMap<String, BTreeSet<String>>,
    pub safety_coverage: BTreeMap<String, SafetyCoverage>,
    pub patterns: BTreeMap<ArchitecturePattern, Vec<String>>,
    pub most_common_pattern: ArchitecturePattern,
    pub matrix: CompatibilityMatrix,
}

impl ComparisonReport {
    pub fn build(entries: &[(Identity, FeatureSet)]) -> Result<Self> {
        if entries.is_empty() {
            return Err(CoreError::InvalidRequest(
                "comparison needs at least one model".to_string(),
            ));
        }

        let models: Vec<String> = entries.iter().map(|(id, _)| id.to_string()).collect();

        let capabilities: BTreeMap<String, BTreeSet<String>> = entries
            .iter()
            .map(|(id, f)| (id.to_string(), f.capabilities.clone()))
            .collect();

        let all_capabilities: BTreeSet<String> =
            capabilities.values().flatten().cloned().collect();

        let common_capabilities: BTreeSet<String> = all_capabilities
            .iter()
            .filter(|cap| capabilities.values().all(|set| set.contains(*cap)))
            .cloned()
            .collect();

        let mut unique_capabilities = BTreeMap::new();
        for (model, caps) in &capabilities {
            let unique: BTreeSet<String> = caps
                .iter()
                .filter(|cap| {
                    capabilities
                        .iter()
                        .filter(|(other, _)| *other != model)
                        .all(|(_, set)| !set.contains(*cap))
                })
                .cloned()
                .collect();
            if !unique.is_empty() {
                unique_capabilities.insert(model.clone(), unique);
            }
        }

        let mut safety_counts: BTreeMap<String, usize> = BTreeMap::new();
        for (_, features) in entries {
            for kind in features.safety_measures.keys() {
                *safety_counts.entry(kind.clone()).or_default() += 1;
            }
        }
        let total = entries.len() as f64;
        let safety_coverage = safety_counts
            .into_iter()
            .map(|(kind, count)| {
                let percentage = (count as f64 / total * 1000.0).round() / 10.0;
                (kind, SafetyCoverage { count, percentage })
            })
            .collect();

        let mut patterns: BTreeMap<ArchitecturePattern, Vec<String>> = BTreeMap::new();
        // first-seen order breaks ties for the most common pattern
        let mut seen_order: Vec<ArchitecturePattern> = Vec::new();
        for (id, features) in entries {
            let pattern = features.architecture_pattern;
            if !seen_order.contains(&pattern) {
                seen_order.push(pattern);
            }
            patterns.entry(pattern).or_default().push(id.to_string());
        }
        let mut most_common_pattern = seen_order[0];
        for pattern in &seen_order {
            if patterns[pattern].len() > patterns[&most_common_pattern].len() {
                most_common_pattern = *pattern;
            }
        }

        Ok(Self {
            models,
            capabilities,
            all_capabilities,
            common_capabilities,
            unique_capabilities,
            safety_coverage,
            patterns,
            most_common_pattern,
            matrix: CompatibilityMatrix::build(entries),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub identity: Identity,
    pub score: f64,
}

/// Order corpus entries by how well their capabilities match the tags found
/// in a free-text use case.
pub fn suggest_for_use_case(
    use_case: &str,
    entries: &[(Identity, FeatureSet)],
    extractor: &FeatureExtractor,
    limit: usize,
) -> Vec<Suggestion> {
    let wanted = FeatureSet {
        capabilities: extractor.capabilities(&use_case.to_lowercase()),
        ..Default::default()
    };
    debug!("use case maps to {:?}", wanted.capabilities);

    let mut suggestions: Vec<Suggestion> = entries
        .iter()
        .map(|(identity, features)| Suggestion {
            identity: identity.clone(),
            score: similarity(&wanted, features),
        })
        .collect();
    suggestions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    suggestions.truncate(limit);
    suggestions
}
