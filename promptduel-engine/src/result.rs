//! Final report of an optimization run

use std::path::Path;

use anyhow::{Context, Result};
use promptduel_core::{Candidate, Pool, RankingMethod, WinMatrix};
use promptduel_tournament::RankingSnapshot;
use serde::Serialize;

/// One row of the final leaderboard. Reporting only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub index: usize,
    pub instruction: String,
    pub copeland: f64,
    pub borda: f64,
    pub avg_win_rate: f64,
    pub elo: f64,
    pub skill_mu: f64,
    pub skill_sigma: f64,
    pub skill_conservative: f64,
    pub aggregate: f64,
    pub wins: u32,
    pub losses: u32,
    pub mean_f1: Option<f64>,
}

/// Every candidate with every theory's score, in the order of `method`
pub fn leaderboard(pool: &Pool, method: RankingMethod) -> Vec<LeaderboardEntry> {
    let matrix = pool.matrix();
    let snapshot = RankingSnapshot::compute(matrix);

    snapshot
        .get(method)
        .order
        .iter()
        .filter_map(|&i| {
            let candidate = pool.candidate(i)?;
            let skill = snapshot.skill.get(i)?;
            Some(LeaderboardEntry {
                index: i,
                instruction: candidate.instruction.clone(),
                copeland: snapshot.copeland.scores[i],
                borda: snapshot.borda.scores[i],
                avg_win_rate: snapshot.avg_win_rate.scores[i],
                elo: snapshot.elo.scores[i],
                skill_mu: skill.mu,
                skill_sigma: skill.sigma,
                skill_conservative: skill.conservative(),
                aggregate: snapshot.aggregate.scores[i],
                wins: matrix.total_wins(i),
                losses: matrix.total_losses(i),
                mean_f1: pool.mean_f1(i),
            })
        })
        .collect()
}

/// Outcome of a run, emitted once at FINALIZE
#[derive(Clone, Debug, Serialize)]
pub struct OptimizationResult {
    pub best_instruction: String,
    pub best_index: usize,
    pub ranking_method: RankingMethod,
    pub rounds_completed: usize,
    /// Candidates ever added to the pool, seeds included
    pub total_candidates_generated: usize,
    /// Judged (pair, example) units over the whole run, pruned candidates included
    pub total_duels_conducted: u64,
    /// Sum of the final win matrix
    pub final_matrix_total: u64,
    pub win_matrix: WinMatrix,
    pub final_pool: Vec<Candidate>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl OptimizationResult {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize optimization result")
    }

    /// Write the result as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write result to {}", path.display()))
    }
}
