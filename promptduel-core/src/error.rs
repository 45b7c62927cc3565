//! Error taxonomy for the duel engine
//!
//! Three kinds of failure exist:
//! - [`GenerationError`]: the model boundary failed. Fatal for the run,
//!   apart from the one schema-relaxation retry the duel executor performs.
//! - [`ParseError`]: a model answered but the text was not in the expected
//!   shape. Always recovered at the call site with a named default.
//! - [`EngineError`]: run-level failures, including pool invariant breaks.

/// Failures reported by (or about) the generation boundary
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Structured output rejected: {0}")]
    SchemaRejected(String),

    #[error("Batch returned {got} responses for {expected} prompts")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Batch cancelled: {0}")]
    Cancelled(String),
}

/// A model response that could not be read as the expected structure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("No JSON value found in response")]
    NoJson,

    #[error("Invalid JSON in response: {0}")]
    InvalidJson(String),

    #[error("Missing field '{0}' in response")]
    MissingField(&'static str),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("Unknown verdict: {0}")]
    UnknownVerdict(String),
}

/// Run-level failures that abort an optimization
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Pool invariant violated: {0}")]
    Invariant(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Need at least 2 active candidates to duel, have {active}")]
    InsufficientCandidates { active: usize },

    #[error("Dataset has no examples")]
    EmptyDataset,
}
