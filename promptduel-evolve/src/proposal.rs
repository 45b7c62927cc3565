//! Initial proposals - seed the pool from the dataset alone
//!
//! One call summarizes a few examples into a dataset description. Then one
//! instruction is requested per slot, each with a different writing tip,
//! in a single batch.

use promptduel_core::{
    dispatch_batch, parse_string_list, Dataset, EngineConfig, EngineError, Generator, ParseError,
};
use rand::Rng;
use tracing::{info, warn};

use crate::strategy::InstructionTip;

/// Up to `k` distinct example indices in ascending order
pub(crate) fn sample_examples<R: Rng>(dataset: &Dataset, k: usize, rng: &mut R) -> Vec<usize> {
    let mut picked = rand::seq::index::sample(rng, dataset.len(), k.min(dataset.len())).into_vec();
    picked.sort_unstable();
    picked
}

pub(crate) fn format_examples(dataset: &Dataset, indices: &[usize]) -> String {
    indices
        .iter()
        .filter_map(|&i| dataset.example(i))
        .enumerate()
        .map(|(n, text)| format!("Example {}:\n{}", n + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_summary_prompt(examples: &str) -> String {
    format!(
        "Here are examples from a dataset.\n\n{examples}\n\n\
         Describe in two or three sentences what kind of inputs this dataset \
         contains and what task they pose. Reply with the description only."
    )
}

pub fn build_proposal_prompt(summary: &str, examples: &str, tip: InstructionTip) -> String {
    format!(
        "## Dataset description\n{summary}\n\n\
         ## Sample inputs\n{examples}\n\n\
         ## Tip\n{}\n\n\
         Write one instruction that tells a language model how to solve this task. \
         Respond with a JSON list holding exactly one string: [\"<instruction>\"].",
        tip.text()
    )
}

/// Read the single instruction out of a one-element JSON list
pub fn parse_proposal(text: &str) -> Result<String, ParseError> {
    parse_string_list(text)?
        .into_iter()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .ok_or_else(|| ParseError::UnexpectedShape("empty instruction list".to_string()))
}

/// Propose `count` starting instructions (Level 1)
pub async fn propose_initial<R: Rng>(
    generator: &dyn Generator,
    dataset: &Dataset,
    count: usize,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<Vec<String>, EngineError> {
    let summary_indices = sample_examples(dataset, config.summary_examples, rng);
    let summary = generator
        .generate(
            &build_summary_prompt(&format_examples(dataset, &summary_indices)),
            &config.proposal,
        )
        .await?;
    let summary = summary.trim().to_string();

    let prompts: Vec<String> = (0..count)
        .map(|slot| {
            let shown = sample_examples(dataset, config.proposal_examples, rng);
            build_proposal_prompt(
                &summary,
                &format_examples(dataset, &shown),
                InstructionTip::nth(slot),
            )
        })
        .collect();

    let responses = dispatch_batch(
        generator,
        &prompts,
        config.max_concurrency,
        &config.proposal,
        None,
    )
    .await?;

    let proposals: Vec<String> = responses
        .iter()
        .enumerate()
        .map(|(slot, response)| {
            parse_proposal(response).unwrap_or_else(|e| {
                warn!(
                    "Proposal {} ({}) unstructured: {}, using raw text",
                    slot,
                    InstructionTip::nth(slot).name(),
                    e
                );
                response.trim().to_string()
            })
        })
        .collect();

    info!("Proposed {} initial instructions", proposals.len());
    Ok(proposals)
}
