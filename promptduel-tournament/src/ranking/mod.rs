//! Ranking systems - pure functions from a win matrix to a best-first order
//!
//! Every ranker returns a [`Ranking`]: one score per candidate plus the
//! order those scores imply. Ties are broken by lower index so that the
//! same matrix always yields the same order.

mod aggregate;
mod counting;
mod elo;
mod skill;

use promptduel_core::{RankingMethod, WinMatrix};
use serde::Serialize;

pub use aggregate::aggregate;
pub use counting::{avg_win_rate, borda, copeland};
pub use elo::{elo, ELO_INITIAL_RATING, ELO_K_FACTOR};
pub use skill::{skill, skill_ratings, SkillRating, SKILL_INITIAL_MU, SKILL_INITIAL_SIGMA};

/// Scores and the best-first order they imply
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ranking {
    /// Candidate indices, best first
    pub order: Vec<usize>,
    /// Score per candidate, indexed by candidate
    pub scores: Vec<f64>,
}

impl Ranking {
    /// Order candidates by score (descending), ties by index
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let tiebreak = vec![0.0; scores.len()];
        Self::from_scores_with_tiebreak(scores, &tiebreak)
    }

    /// Order by score, then by `tiebreak` (both descending), then by index
    pub fn from_scores_with_tiebreak(scores: Vec<f64>, tiebreak: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    tiebreak[b]
                        .partial_cmp(&tiebreak[a])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.cmp(&b))
        });
        Self { order, scores }
    }

    /// Top candidate
    pub fn leader(&self) -> Option<usize> {
        self.order.first().copied()
    }

    /// Zero-based position of `index` in the order
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|&i| i == index)
    }

    /// Best-first order restricted to `allowed`
    pub fn order_within(&self, allowed: &[usize]) -> Vec<usize> {
        self.order
            .iter()
            .copied()
            .filter(|i| allowed.contains(i))
            .collect()
    }
}

/// Rank with the given theory (Level 2)
pub fn rank(method: RankingMethod, matrix: &WinMatrix) -> Ranking {
    match method {
        RankingMethod::Copeland => copeland(matrix),
        RankingMethod::Borda => borda(matrix),
        RankingMethod::AvgWinRate => avg_win_rate(matrix),
        RankingMethod::Elo => elo(matrix),
        RankingMethod::Aggregate => aggregate(matrix),
    }
}

/// Every ranking theory evaluated on one matrix
///
/// Recomputed from scratch each round; nothing here is carried between
/// rounds.
#[derive(Clone, Debug, Serialize)]
pub struct RankingSnapshot {
    pub copeland: Ranking,
    pub borda: Ranking,
    pub avg_win_rate: Ranking,
    pub elo: Ranking,
    pub skill: Vec<SkillRating>,
    pub skill_ranking: Ranking,
    pub aggregate: Ranking,
}

impl RankingSnapshot {
    pub fn compute(matrix: &WinMatrix) -> Self {
        let skill = skill_ratings(matrix);
        let skill_ranking =
            Ranking::from_scores(skill.iter().map(SkillRating::conservative).collect());

        Self {
            copeland: copeland(matrix),
            borda: borda(matrix),
            avg_win_rate: avg_win_rate(matrix),
            elo: elo(matrix),
            skill,
            skill_ranking,
            aggregate: aggregate(matrix),
        }
    }

    /// The ranking selected by `method`
    pub fn get(&self, method: RankingMethod) -> &Ranking {
        match method {
            RankingMethod::Copeland => &self.copeland,
            RankingMethod::Borda => &self.borda,
            RankingMethod::AvgWinRate => &self.avg_win_rate,
            RankingMethod::Elo => &self.elo,
            RankingMethod::Aggregate => &self.aggregate,
        }
    }
}
