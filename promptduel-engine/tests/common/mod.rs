//! Shared fixtures: stub generation boundaries and datasets

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use promptduel_core::{
    Dataset, EngineConfig, GenerationError, GenerationParams, Generator, Label, RankingMethod,
    ResponseSchema,
};
use serde_json::json;

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Text between `start` and the next `end`
pub fn section<'a>(prompt: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = prompt.find(start)? + start.len();
    let rest = &prompt[from..];
    Some(rest.find(end).map_or(rest, |to| &rest[..to]))
}

// ============================================================================
// STUB GENERATORS
// ============================================================================

/// Deterministic model that always prefers the longer instruction.
///
/// - Answer prompts: the instruction is echoed back as the reasoning.
/// - Judge prompts: the side with the longer reasoning wins, ties broken
///   lexicographically.
/// - Mutation prompts: the parent gets a suffix, so offspring are longer.
/// - Summary and proposal prompts: fixed text and the tip line.
#[derive(Default)]
pub struct LongestWins {
    pub calls: AtomicUsize,
}

impl LongestWins {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for LongestWins {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(instruction) = section(prompt, "## Instruction\n", "\n\n## Input") {
            return Ok(json!({ "reasoning": instruction, "answer": "A" }).to_string());
        }

        if prompt.contains("### Response X") {
            let x = section(prompt, "### Response X\nReasoning: ", "\nAnswer:").unwrap_or("");
            let y = section(prompt, "### Response Y\nReasoning: ", "\nAnswer:").unwrap_or("");
            let winner = if (x.len(), x) >= (y.len(), y) { "X" } else { "Y" };
            return Ok(json!({ "winner": winner }).to_string());
        }

        if let Some(parent) = section(prompt, "## Current instruction\n", "\n\n## ") {
            return Ok(json!({ "mutated_prompt": format!("{parent} Check every step.") }).to_string());
        }

        if let Some(tip) = section(prompt, "## Tip\n", "\n\n") {
            return Ok(json!([tip]).to_string());
        }

        Ok("A dataset of short questions.".to_string())
    }
}

/// Rejects every schema-constrained request, delegating plain ones
pub struct RejectsSchemas<G> {
    pub inner: G,
    pub rejected: AtomicUsize,
}

impl<G> RejectsSchemas<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            rejected: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<G: Generator> Generator for RejectsSchemas<G> {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.inner.generate(prompt, params).await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        params: &GenerationParams,
        schema: Option<&ResponseSchema>,
    ) -> Result<String, GenerationError> {
        match schema {
            Some(schema) => {
                self.rejected.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::SchemaRejected(schema.name.clone()))
            }
            None => self.inner.generate(prompt, params).await,
        }
    }
}

/// Endpoint that is always down
pub struct Unreachable;

#[async_trait]
impl Generator for Unreachable {
    async fn generate(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Request("connection refused".to_string()))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Four seeds of distinct lengths; the last one is the longest
pub fn seeds() -> Vec<String> {
    vec![
        "Answer.".to_string(),
        "Answer the question.".to_string(),
        "Answer the question briefly.".to_string(),
        "Answer the question briefly and explain the key step.".to_string(),
    ]
}

pub fn dataset() -> Dataset {
    Dataset::new(vec![
        "Which planet is largest? A) Mars B) Jupiter C) Venus D) Earth".to_string(),
        "What is 3 x 4? A) 7 B) 12 C) 34 D) 1".to_string(),
        "Which is a mammal? A) Shark B) Trout C) Whale D) Squid".to_string(),
    ])
    .unwrap()
}

pub fn labeled_dataset() -> Dataset {
    Dataset::with_labels(
        vec![
            "Which planet is largest? A) Mars B) Jupiter".to_string(),
            "What is 3 x 4? A) 12 B) 7".to_string(),
        ],
        vec![Label::Text("B".to_string()), Label::Text("A".to_string())],
    )
    .unwrap()
}

/// 3 rounds of 2 single-example duels, pruning one candidate after rounds 1 and 2
pub fn scenario_config() -> EngineConfig {
    let mut config = EngineConfig::default()
        .with_rounds(3, 2)
        .with_pool_updates(1, 1, 1, 0)
        .with_ranking(RankingMethod::Copeland)
        .with_seed(2024);
    config.examples_per_duel = 1;
    config.max_concurrency = 4;
    config
}
