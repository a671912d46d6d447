//! promptwright - analyze, compare, customize and benchmark prompt templates
//!
//! Templates live in a corpus keyed by `(provider, model)`. The library
//! extracts heuristic features from them, scores similarity, detects the
//! role/capability/constraint/tone regions of a template so it can be
//! customized without touching the rest, and measures how a model's
//! rejection rate changes as a request is reframed at increasing levels of
//! abstraction.

pub mod analysis;
pub mod benchmark;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod export;
pub mod llm;
pub mod regions;
pub mod rewrite;
pub mod similarity;
pub mod util;
pub mod validate;
