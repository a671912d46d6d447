//! End-to-end scenarios across extraction, similarity, rewriting and the
//! benchmark harness.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use promptwright::analysis::{ArchitecturePattern, FeatureExtractor};
use promptwright::benchmark::{BenchmarkHarness, BenchmarkOptions, BenchmarkReport, RunPolicy};
use promptwright::corpus::{CorpusStore, MemoryCorpus};
use promptwright::document::{Document, Identity};
use promptwright::llm::GenerationClient;
use promptwright::rewrite::{CustomizationRequest, TemplateRewriter};
use promptwright::similarity::similarity;

const HELPER: &str = "You are Helper, a general assistant.\n- Answer questions\n- Write code\n- Search the web\n- Summarize documents";

struct FixedReply(&'static str);

#[async_trait]
impl GenerationClient for FixedReply {
    async fn generate(&self, _system: Option<&str>, _prompt: &str, _model: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

fn id(provider: &str, model: &str) -> Identity {
    Identity::new(provider, model).unwrap()
}

#[test]
fn test_scenario_a_extract_then_replace_role() {
    let helper = id("test", "helper");
    let store = MemoryCorpus::new().with_entry(helper.clone(), HELPER);
    let base = store.load(&helper).unwrap();

    let features = FeatureExtractor::default().extract(&base);
    assert!(matches!(
        features.architecture_pattern,
        ArchitecturePattern::BulletEnumerated | ArchitecturePattern::PersonaLed
    ));
    assert!(!features.capabilities.is_empty());

    let mut request = CustomizationRequest::new(helper);
    request.role_description = Some("You are Coach, a fitness mentor.".to_string());
    let built = TemplateRewriter::default()
        .build_from_store(&request, &store)
        .unwrap();

    let expected = HELPER.replacen(
        "You are Helper, a general assistant.",
        "You are Coach, a fitness mentor.",
        1,
    );
    assert_eq!(built.text(), expected);
    assert!(built.identity().is_none());
}

#[test]
fn test_scenario_b_same_capabilities_any_prose() {
    let extractor = FeatureExtractor::default();
    let a = extractor.extract(&Document::derived("Help with code and search the web."));
    let b = extractor.extract(&Document::derived(
        "Programming help in python.\n- Browse the internet when needed.\n",
    ));
    assert_eq!(a.capabilities, b.capabilities);
    assert_eq!(
        a.capabilities.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["code", "search"]
    );
    assert_eq!(similarity(&a, &b), 1.0);
}

#[tokio::test]
async fn test_scenario_c_all_refusals() {
    let phrases: Vec<String> = ["First phrase", "Second phrase", "Third phrase"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let harness = BenchmarkHarness::new(
        Arc::new(FixedReply("Sorry, I cannot do that.")),
        BenchmarkOptions {
            levels: 5,
            policy: RunPolicy::Independent,
            ..Default::default()
        },
    );
    let run = harness
        .run(&Document::derived("You are X."), &phrases)
        .await
        .unwrap();
    assert_eq!(run.records.len(), 15);

    let report = BenchmarkReport::from_run(&run, harness.ladder());
    assert_eq!(report.levels.len(), 5);
    for level in &report.levels {
        assert_eq!(level.count, 3);
        assert_eq!(level.rejection_rate, 1.0);
    }
    assert_eq!(report.summary.rejection_rate, 1.0);
    assert_eq!(report.summary.transport_failures, 0);
}

#[tokio::test]
async fn test_cascade_stops_after_first_acceptance() {
    let harness = BenchmarkHarness::new(
        Arc::new(FixedReply("Sure, here you go.")),
        BenchmarkOptions {
            levels: 5,
            policy: RunPolicy::Cascade,
            ..Default::default()
        },
    );
    let phrases = vec!["One".to_string(), "Two".to_string()];
    let run = harness
        .run(&Document::derived("You are X."), &phrases)
        .await
        .unwrap();
    // accepted at level 0, so no higher level is attempted
    assert_eq!(run.records.len(), 2);
    assert!(run.records.iter().all(|r| r.level == 0 && r.accepted));

    let report = BenchmarkReport::from_run(&run, harness.ladder());
    assert_eq!(report.levels[1].count, 0);
    assert_eq!(report.levels[1].rejection_rate, 0.0);
}
