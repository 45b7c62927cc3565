//! Mutation - new instructions derived from champion candidates
//!
//! Each offspring slot applies one [`MutationStrategy`], rotating per
//! parent. When a labeled dataset is supplied the prompt also carries a few
//! input / expected-output pairs as grounding. All slots of all parents go
//! out as one batch.

use promptduel_core::{
    dispatch_batch, parse_string_field, Dataset, EngineConfig, EngineError, Generator,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::proposal::sample_examples;
use crate::strategy::MutationStrategy;

/// Field holding the rewritten instruction
const MUTATED_FIELD: &str = "mutated_prompt";

/// Offspring requested from one parent
#[derive(Clone, Debug, PartialEq)]
pub struct MutationRequest<'a> {
    /// Pool index of the parent, for logging
    pub parent: usize,
    pub instruction: &'a str,
    pub count: usize,
    /// Parent's mean F1 so far; reported only
    pub mean_f1: Option<f64>,
}

pub fn build_mutation_prompt(instruction: &str, strategy: MutationStrategy) -> String {
    format!(
        "## Current instruction\n{instruction}\n\n\
         ## Edit\n{}\n\n\
         Respond with a JSON object {{\"{MUTATED_FIELD}\": \"<the new instruction>\"}}.",
        strategy.directive()
    )
}

pub fn build_labeled_mutation_prompt(
    instruction: &str,
    strategy: MutationStrategy,
    grounding: &[(String, String)],
) -> String {
    let pairs = grounding
        .iter()
        .enumerate()
        .map(|(n, (input, expected))| {
            format!("Example {}:\nInput: {}\nExpected output: {}", n + 1, input, expected)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "## Current instruction\n{instruction}\n\n\
         ## Labeled examples\n{pairs}\n\n\
         ## Edit\n{}\n\n\
         The new instruction must lead to the expected outputs above. \
         Respond with a JSON object {{\"{MUTATED_FIELD}\": \"<the new instruction>\"}}.",
        strategy.directive()
    )
}

/// Input / expected-output pairs for up to `k` sampled labeled examples
fn sample_grounding<R: Rng>(dataset: &Dataset, k: usize, rng: &mut R) -> Vec<(String, String)> {
    sample_examples(dataset, k, rng)
        .into_iter()
        .filter_map(|i| {
            let input = dataset.example(i)?;
            match dataset.label(i)?.expected_text() {
                Ok(expected) => Some((input.to_string(), expected)),
                Err(e) => {
                    debug!("Skipping example {} as grounding: {}", i, e);
                    None
                }
            }
        })
        .collect()
}

/// Generate offspring for every request, flattened in request order (Level 1).
///
/// `grounding` switches to the labeled template; pass it only when
/// supervised mutation is enabled and the dataset carries labels.
pub async fn mutate<R: Rng>(
    generator: &dyn Generator,
    requests: &[MutationRequest<'_>],
    grounding: Option<&Dataset>,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<Vec<String>, EngineError> {
    let grounding = grounding.filter(|d| d.is_labeled());

    let mut prompts = Vec::new();
    for request in requests {
        match request.mean_f1 {
            Some(f1) => info!(
                "Mutating candidate {} into {} offspring (mean F1 {:.3})",
                request.parent, request.count, f1
            ),
            None => info!(
                "Mutating candidate {} into {} offspring",
                request.parent, request.count
            ),
        }

        for slot in 0..request.count {
            let strategy = MutationStrategy::nth(slot);
            let prompt = match grounding {
                Some(dataset) => {
                    let pairs = sample_grounding(dataset, config.mutation_examples, rng);
                    build_labeled_mutation_prompt(request.instruction, strategy, &pairs)
                }
                None => build_mutation_prompt(request.instruction, strategy),
            };
            prompts.push(prompt);
        }
    }

    let responses = dispatch_batch(
        generator,
        &prompts,
        config.max_concurrency,
        &config.proposal,
        None,
    )
    .await?;

    Ok(responses
        .iter()
        .map(|response| {
            parse_string_field(response, MUTATED_FIELD)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|e| {
                    warn!("Unstructured mutation ({}), using raw text", e);
                    response.trim().to_string()
                })
        })
        .collect())
}
