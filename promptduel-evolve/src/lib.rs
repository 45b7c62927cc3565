//! PromptDuel Evolve - proposing and mutating candidate instructions
//!
//! This crate provides the generative side of the optimizer:
//! - Initial proposals from a dataset summary and rotating writing tips
//! - Mutation of champions with rotating edit strategies
//! - Elite / bottom selection over a rank order
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: propose_initial, mutate (batched generation)
//! - Level 2: select_elite, select_bottom, distribute_slots (decisions)
//! - Level 3: prompt builders and response parsing (steps)
//! - Level 4: strategy tables

mod mutation;
mod proposal;
mod selection;
mod strategy;

pub use mutation::{build_labeled_mutation_prompt, build_mutation_prompt, mutate, MutationRequest};
pub use proposal::{build_proposal_prompt, build_summary_prompt, parse_proposal, propose_initial};
pub use selection::{distribute_slots, select_bottom, select_elite};
pub use strategy::{InstructionTip, MutationStrategy};
