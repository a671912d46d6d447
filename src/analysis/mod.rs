//! Feature extraction: capability tags, safety measures and the architecture
//! pattern of a template, plus a stateful session over a loaded document.

pub mod extractor;
pub mod pattern;
pub mod session;
pub mod vocabulary;

pub use extractor::{distinctive_traits, Analysis, FeatureExtractor, FeatureSet};
pub use pattern::{classify, ArchitecturePattern, PatternThresholds, TextStats};
pub use session::{line_diff, AnalysisSession, LineDiff};
pub use vocabulary::{CapabilityRule, CapabilityVocabulary, SafetyRule, SafetyRules};
