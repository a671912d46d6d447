//! Abstraction benchmark: send test phrases at increasing levels of
//! indirection and record which attempts the model rejects.

pub mod classifier;
pub mod harness;
pub mod levels;
pub mod report;

pub use classifier::RefusalClassifier;
pub use harness::{BenchmarkHarness, BenchmarkOptions, BenchmarkRecord, BenchmarkRun, RunPolicy};
pub use levels::{AbstractionLevel, LevelLadder};
pub use report::{BenchmarkReport, BenchmarkSummary, LevelStats};
