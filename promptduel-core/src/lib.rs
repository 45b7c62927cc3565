//! PromptDuel Core - Shared state and boundaries for the duel tournament
//!
//! This crate provides the pieces every other layer builds on:
//! - Candidate pool with its active set and win matrix
//! - Dataset of examples with optional labels
//! - Engine configuration
//! - Error taxonomy
//! - Generation boundary (single and batched model calls)
//! - Structured response parsing

pub mod config;
pub mod dataset;
pub mod error;
pub mod generate;
pub mod matrix;
pub mod parse;
pub mod pool;

// Re-exports for convenient access
pub use config::{EngineConfig, GenerationParams, RankingMethod};
pub use dataset::{split_labels, Dataset, Label, StructuredLabel};
pub use error::{EngineError, GenerationError, ParseError};
pub use generate::{dispatch_batch, dispatch_with_schema_fallback, Generator, ResponseSchema};
pub use matrix::WinMatrix;
pub use parse::{extract_json, parse_string_field, parse_string_list};
pub use pool::{Candidate, PerformanceRecord, Pool};
