//! Generation boundary - the only way the engine talks to a language model
//!
//! Callers implement [`Generator`]. Only `generate` is required; the batch
//! method has a default that fans out over a bounded number of concurrent
//! calls and reassembles results in request order.
//!
//! Timeouts, retries and backoff for individual calls belong to the
//! implementor, not to the engine.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::config::GenerationParams;
use crate::error::GenerationError;

/// JSON schema constraining a structured response
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A language model endpoint
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for one prompt
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;

    /// Generate a completion constrained by `schema`.
    ///
    /// Endpoints without structured output support can keep the default,
    /// which ignores the schema. Endpoints that refuse the schema must return
    /// [`GenerationError::SchemaRejected`]; that is the only error the engine
    /// answers with an unconstrained retry.
    async fn generate_structured(
        &self,
        prompt: &str,
        params: &GenerationParams,
        schema: Option<&ResponseSchema>,
    ) -> Result<String, GenerationError> {
        let _ = schema;
        self.generate(prompt, params).await
    }

    /// Generate completions for many prompts.
    ///
    /// The result has the same length and order as `prompts`. Requests may
    /// complete in any order; at most `max_concurrency` are in flight.
    async fn generate_batch(
        &self,
        prompts: &[String],
        max_concurrency: usize,
        params: &GenerationParams,
        schema: Option<&ResponseSchema>,
    ) -> Result<Vec<String>, GenerationError> {
        let semaphore = Semaphore::new(max_concurrency.max(1));
        let semaphore = &semaphore;

        let futures = prompts.iter().map(|prompt| async move {
            let _permit = semaphore.acquire().await.map_err(|e| {
                GenerationError::Cancelled(format!("Failed to acquire semaphore: {e}"))
            })?;
            self.generate_structured(prompt, params, schema).await
        });

        try_join_all(futures).await
    }
}

/// Dispatch a batch and enforce the ordering contract.
///
/// A response count that differs from the prompt count is reported as
/// [`GenerationError::LengthMismatch`]; responses are consumed positionally,
/// so nothing downstream could use them safely.
pub async fn dispatch_batch(
    generator: &dyn Generator,
    prompts: &[String],
    max_concurrency: usize,
    params: &GenerationParams,
    schema: Option<&ResponseSchema>,
) -> Result<Vec<String>, GenerationError> {
    if prompts.is_empty() {
        return Ok(Vec::new());
    }

    let responses = generator
        .generate_batch(prompts, max_concurrency, params, schema)
        .await?;

    if responses.len() != prompts.len() {
        return Err(GenerationError::LengthMismatch {
            expected: prompts.len(),
            got: responses.len(),
        });
    }

    Ok(responses)
}

/// Dispatch with `schema`, retrying the whole batch once without it if the
/// boundary rejects the schema. Any other failure is returned as is.
pub async fn dispatch_with_schema_fallback(
    generator: &dyn Generator,
    prompts: &[String],
    max_concurrency: usize,
    params: &GenerationParams,
    schema: &ResponseSchema,
) -> Result<Vec<String>, GenerationError> {
    match dispatch_batch(generator, prompts, max_concurrency, params, Some(schema)).await {
        Ok(responses) => Ok(responses),
        Err(GenerationError::SchemaRejected(name)) => {
            tracing::warn!(
                "Schema '{}' rejected for a batch of {} prompts, retrying without it",
                name,
                prompts.len()
            );
            dispatch_batch(generator, prompts, max_concurrency, params, None).await
        }
        Err(e) => Err(e),
    }
}
