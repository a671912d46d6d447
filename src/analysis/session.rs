use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

use super::extractor::{Analysis, FeatureExtractor, FeatureSet};
use crate::corpus::CorpusStore;
use crate::document::{Document, Identity};
use crate::error::{CoreError, Result};

const DIFF_SAMPLE_LIMIT: usize = 10;

/// Line-level comparison of the loaded document against a baseline text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineDiff {
    pub similarity: f64,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub common_lines: usize,
    pub unique_to_current: Vec<String>,
    pub unique_to_baseline: Vec<String>,
}

/// Holds one loaded document and answers questions about it.
pub struct AnalysisSession {
    extractor: FeatureExtractor,
    document: Option<Document>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(FeatureExtractor::default())
    }
}

impl AnalysisSession {
    pub fn new(extractor: FeatureExtractor) -> Self {
        Self {
            extractor,
            document: None,
        }
    }

    pub fn load(&mut self, store: &dyn CorpusStore, identity: &Identity) -> Result<&Document> {
        let document = store.load(identity)?;
        info!("Loaded {} ({} chars)", identity, document.len());
        Ok(self.document.insert(document))
    }

    pub fn load_document(&mut self, document: Document) -> &Document {
        self.document.insert(document)
    }

    pub fn document(&self) -> Result<&Document> {
        self.document.as_ref().ok_or_else(|| {
            CoreError::InvalidState("no document loaded; call load() first".to_string())
        })
    }

    pub fn features(&self) -> Result<FeatureSet> {
        Ok(self.extractor.extract(self.document()?))
    }

    pub fn analysis(&self) -> Result<Analysis> {
        Ok(self.extractor.analyze(self.document()?))
    }

    pub fn compare_with_baseline(&self, baseline: &str) -> Result<LineDiff> {
        Ok(line_diff(self.document()?.text(), baseline))
    }
}

fn line_set(text: &str) -> BTreeSet<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Jaccard over trimmed non-empty lines; two empty texts are identical.
pub fn line_diff(current: &str, baseline: &str) -> LineDiff {
    let current_lines = line_set(current);
    let baseline_lines = line_set(baseline);

    let common = current_lines.intersection(&baseline_lines).count();
    let union = current_lines.union(&baseline_lines).count();
    let similarity = if union == 0 {
        1.0
    } else {
        common as f64 / union as f64
    };

    let added: Vec<String> = current_lines
        .difference(&baseline_lines)
        .map(|l| l.to_string())
        .collect();
    let removed: Vec<String> = baseline_lines
        .difference(&current_lines)
        .map(|l| l.to_string())
        .collect();

    LineDiff {
        similarity,
        lines_added: added.len(),
        lines_removed: removed.len(),
        common_lines: common,
        unique_to_current: added.into_iter().take(DIFF_SAMPLE_LIMIT).collect(),
        unique_to_baseline: removed.into_iter().take(DIFF_SAMPLE_LIMIT).collect(),
    }
}
