//! Properties of similarity scoring and candidate ranking.

use std::collections::BTreeSet;

use promptwright::analysis::{FeatureExtractor, FeatureSet};
use promptwright::document::{Document, Identity};
use promptwright::similarity::{rank_candidates, rank_with_scores, similarity};

const TAGS: &[&str] = &["code", "image", "math", "search"];

/// Every subset of TAGS, in bitmask order.
fn all_subsets() -> Vec<FeatureSet> {
    (0..(1u32 << TAGS.len()))
        .map(|mask| {
            FeatureSet::with_capabilities(
                TAGS.iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, t)| *t),
            )
        })
        .collect()
}

#[test]
fn test_similarity_reflexive_and_symmetric() {
    let sets = all_subsets();
    for a in &sets {
        assert_eq!(similarity(a, a), 1.0);
        for b in &sets {
            let ab = similarity(a, b);
            assert_eq!(ab, similarity(b, a));
            assert!((0.0..=1.0).contains(&ab));
        }
    }
}

#[test]
fn test_rank_only_returns_supersets() {
    let sets = all_subsets();
    let candidates: Vec<(Identity, FeatureSet)> = sets
        .iter()
        .enumerate()
        .map(|(i, fs)| (Identity::new("p", format!("m{}", i)).unwrap(), fs.clone()))
        .collect();

    for requirements in &sets {
        let ranked = rank_with_scores(&requirements.capabilities, &candidates);
        for candidate in &ranked {
            let (_, features) = candidates
                .iter()
                .find(|(id, _)| *id == candidate.identity)
                .unwrap();
            assert!(requirements.capabilities.is_subset(&features.capabilities));
        }
        // scores never increase down the list
        for pair in ranked.windows(2) {
            assert!(pair[0].match_ratio >= pair[1].match_ratio);
        }
    }
}

#[test]
fn test_rank_prefers_tightest_fit() {
    let candidates = vec![
        (
            Identity::new("a", "broad").unwrap(),
            FeatureSet::with_capabilities(["code", "math", "search"]),
        ),
        (
            Identity::new("b", "exact").unwrap(),
            FeatureSet::with_capabilities(["code"]),
        ),
        (
            Identity::new("c", "miss").unwrap(),
            FeatureSet::with_capabilities(["math"]),
        ),
    ];
    let requirements: BTreeSet<String> = ["code".to_string()].into_iter().collect();
    let ranked = rank_candidates(&requirements, &candidates);
    assert_eq!(
        ranked.iter().map(|id| id.model.as_str()).collect::<Vec<_>>(),
        vec!["exact", "broad"]
    );
}

#[test]
fn test_extract_is_deterministic_with_and_without_memo() {
    let doc = Document::derived("You are Bot, a helper.\n- Write python code\n- Do not share secrets");
    let plain = FeatureExtractor::default();
    let memo = FeatureExtractor::default().with_memoization();
    let first = plain.extract(&doc);
    assert_eq!(first, plain.extract(&doc));
    assert_eq!(first, memo.extract(&doc));
    assert_eq!(first, memo.extract(&doc));
}
