//! PromptDuel Tournament - pairwise duels between candidate instructions
//!
//! This crate provides the tournament machinery:
//! - Ranking systems over a win matrix
//! - Duel scheduling (Thompson sampling over confidence bounds)
//! - Duel execution through the generation boundary
//! - Position-debiased pairwise judging
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: execute_duels, judge_duels (round phases)
//! - Level 2: DuelScheduler::schedule, rank (decisions)
//! - Level 3: prompt building, response parsing, rating replay (steps)
//! - Level 4: normalization, distributions, scoring utilities

mod duel;
mod judge;
pub mod ranking;
mod scheduler;

pub use duel::{
    answer_schema, build_answer_prompt, execute_duels, plan_duel_units, record_performance,
    score_answer, DuelOutcome, DuelUnit, StructuredAnswer,
};
pub use judge::{
    apply_verdicts, build_judge_prompt, judge_duels, judge_duels_with_swaps, parse_verdict,
    verdict_schema, JudgedDuel, Verdict,
};
pub use ranking::{rank, Ranking, RankingSnapshot, SkillRating};
pub use scheduler::{DuelScheduler, RatingSignals};
