//! Optimization loop - INIT, ROUND x N, FINALIZE
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run(), run_seeded(), run_with_observer() - orchestration
//! - Level 2: initialize(), run_round(), update_pool(), finalize() - phases
//! - Level 3: schedule, execute, judge, apply - steps of one round
//! - Level 4: RNG creation, summaries
//!
//! Rounds are strictly sequential. A round touches the pool only after
//! both of its batches have returned, so a failed round leaves the pool
//! and matrix exactly as the previous round left them.

use std::sync::Arc;

use promptduel_core::{Dataset, EngineConfig, EngineError, Generator, Pool, RankingMethod};
use promptduel_tournament::{
    apply_verdicts, execute_duels, judge_duels, plan_duel_units, rank, record_performance,
    DuelScheduler, Ranking, RatingSignals,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::pool_manager::PoolManager;
use crate::result::{leaderboard, OptimizationResult};

/// Progress report handed to the observer after every round
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundSummary {
    /// 1-based round number
    pub round: usize,
    /// Judged units this round
    pub duels: usize,
    pub pool_size: usize,
    pub leader: usize,
    pub leader_score: f64,
    pub pruned: usize,
    pub added: usize,
}

/// Tournament-driven instruction optimizer
pub struct Optimizer {
    generator: Arc<dyn Generator>,
    config: EngineConfig,
    scheduler: DuelScheduler,
    rng: ChaCha8Rng,
    step: u64,
    total_duels: u64,
}

impl Optimizer {
    pub fn new(generator: Arc<dyn Generator>, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            scheduler: DuelScheduler::from_config(&config),
            rng: create_rng(config.seed),
            generator,
            config,
            step: 0,
            total_duels: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // LEVEL 1 - ORCHESTRATION
    // ========================================================================

    /// Propose an initial pool from the dataset and optimize it
    pub async fn run(&mut self, dataset: &Dataset) -> Result<OptimizationResult, EngineError> {
        self.run_with_observer(None, dataset, |_| {}).await
    }

    /// Optimize starting from the given instructions
    pub async fn run_seeded(
        &mut self,
        seeds: Vec<String>,
        dataset: &Dataset,
    ) -> Result<OptimizationResult, EngineError> {
        self.run_with_observer(Some(seeds), dataset, |_| {}).await
    }

    /// Full run, reporting a [`RoundSummary`] after every round.
    ///
    /// This function reads like a table of contents:
    /// 1. INIT: seed or propose the pool
    /// 2. ROUND x total_rounds: duel, judge, update the pool
    /// 3. FINALIZE: rank once more and report the winner
    pub async fn run_with_observer<F>(
        &mut self,
        seeds: Option<Vec<String>>,
        dataset: &Dataset,
        mut observer: F,
    ) -> Result<OptimizationResult, EngineError>
    where
        F: FnMut(&RoundSummary),
    {
        self.step = 0;
        self.total_duels = 0;

        let mut manager = self.initialize(seeds, dataset).await?;
        info!(
            "Starting optimization: pool={}, rounds={}, duels/round={}, ranking={}",
            manager.pool().len(),
            self.config.total_rounds,
            self.config.duels_per_round,
            self.config.ranking.name()
        );

        for round in 1..=self.config.total_rounds {
            let duels = self.run_round(&mut manager, dataset).await?;

            let (pruned, added) = if self.config.is_update_round(round) {
                self.update_pool(&mut manager, round, dataset).await?
            } else {
                (0, 0)
            };

            let summary = self.summarize(manager.pool(), round, duels, pruned, added);
            info!(
                "Round {}: {} duels, pool={}, leader={} ({:.3})",
                summary.round, summary.duels, summary.pool_size, summary.leader, summary.leader_score
            );
            observer(&summary);
        }

        finalize(
            manager.into_pool(),
            self.config.ranking,
            self.config.total_rounds,
            self.total_duels,
        )
    }

    // ========================================================================
    // LEVEL 2 - PHASES
    // ========================================================================

    async fn initialize(
        &mut self,
        seeds: Option<Vec<String>>,
        dataset: &Dataset,
    ) -> Result<PoolManager, EngineError> {
        match seeds {
            Some(seeds) => PoolManager::from_seeds(seeds),
            None => {
                PoolManager::initialize(
                    self.generator.as_ref(),
                    dataset,
                    self.config.initial_pool_size,
                    &self.config,
                    &mut self.rng,
                )
                .await
            }
        }
    }

    /// Schedule, execute and judge one round; returns the judged unit count
    async fn run_round(
        &mut self,
        manager: &mut PoolManager,
        dataset: &Dataset,
    ) -> Result<usize, EngineError> {
        let active = manager.pool().active();
        if active.len() < 2 {
            warn!("Only {} active candidate(s), skipping duels", active.len());
            return Ok(0);
        }

        let signals = RatingSignals::compute(manager.pool().matrix());
        let pairs = self.scheduler.schedule(
            manager.pool().matrix(),
            &active,
            &mut self.step,
            &signals,
            self.config.duels_per_round,
            &mut self.rng,
        )?;
        let units = plan_duel_units(
            &pairs,
            dataset.len(),
            self.config.examples_per_duel,
            &mut self.rng,
        );

        let outcomes = execute_duels(
            self.generator.as_ref(),
            manager.pool(),
            dataset,
            &units,
            &self.config,
        )
        .await?;
        let judged = judge_duels(
            self.generator.as_ref(),
            dataset,
            &outcomes,
            &self.config,
            &mut self.rng,
        )
        .await?;

        let fallbacks = judged.iter().filter(|j| j.fallback).count();
        if fallbacks > 0 {
            warn!("{} of {} verdicts used the left-wins fallback", fallbacks, judged.len());
        }

        let pool = manager.pool_mut();
        apply_verdicts(pool, &judged)?;
        record_performance(pool, &outcomes)?;
        pool.check_invariants()?;

        self.total_duels += judged.len() as u64;
        Ok(judged.len())
    }

    /// Prune, then expand
    async fn update_pool(
        &mut self,
        manager: &mut PoolManager,
        round: usize,
        dataset: &Dataset,
    ) -> Result<(usize, usize), EngineError> {
        let pruned = manager.prune(self.config.prune_count, self.config.ranking)?;
        let added = manager
            .expand(
                self.generator.as_ref(),
                self.config.new_candidates,
                self.config.mutation_parents,
                round,
                dataset,
                &self.config,
                &mut self.rng,
            )
            .await?;
        manager.pool().check_invariants()?;
        Ok((pruned.len(), added.len()))
    }

    fn summarize(
        &self,
        pool: &Pool,
        round: usize,
        duels: usize,
        pruned: usize,
        added: usize,
    ) -> RoundSummary {
        let ranking = rank(self.config.ranking, pool.matrix());
        let leader = ranking.leader().unwrap_or(0);
        RoundSummary {
            round,
            duels,
            pool_size: pool.len(),
            leader,
            leader_score: ranking.scores.get(leader).copied().unwrap_or(0.0),
            pruned,
            added,
        }
    }
}

/// Authoritative ranking of a finished pool and its winner
pub fn final_ranking(pool: &Pool, method: RankingMethod) -> Result<(usize, Ranking), EngineError> {
    pool.check_invariants()?;
    let ranking = rank(method, pool.matrix());
    let best = ranking
        .leader()
        .ok_or(EngineError::InsufficientCandidates { active: 0 })?;
    Ok((best, ranking))
}

/// FINALIZE: rank the pool once more and build the result
pub fn finalize(
    pool: Pool,
    method: RankingMethod,
    rounds_completed: usize,
    total_duels_conducted: u64,
) -> Result<OptimizationResult, EngineError> {
    let (best_index, _) = final_ranking(&pool, method)?;
    let best_instruction = pool.instruction(best_index)?.to_string();
    info!(
        "Finished: best candidate {} after {} duels",
        best_index, total_duels_conducted
    );

    Ok(OptimizationResult {
        best_instruction,
        best_index,
        ranking_method: method,
        rounds_completed,
        total_candidates_generated: pool.total_generated(),
        total_duels_conducted,
        final_matrix_total: pool.matrix().total_matches(),
        win_matrix: pool.matrix().clone(),
        leaderboard: leaderboard(&pool, method),
        final_pool: pool.candidates().to_vec(),
    })
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}
