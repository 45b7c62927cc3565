//! Bayesian skill rating (TrueSkill-style, two players, no draws)
//!
//! Ratings are refit from the full match history on every call. There is
//! no incremental state: the same matrix always yields the same ratings,
//! and removing a candidate's matches removes their influence entirely.

use promptduel_core::WinMatrix;
use serde::Serialize;
use statrs::function::erf::erf;

use super::Ranking;

/// Prior mean of every candidate
pub const SKILL_INITIAL_MU: f64 = 25.0;

/// Prior uncertainty of every candidate
pub const SKILL_INITIAL_SIGMA: f64 = SKILL_INITIAL_MU / 3.0;

/// Performance noise per match
const BETA: f64 = SKILL_INITIAL_SIGMA / 2.0;

/// Skill drift added before each match, keeps sigma from collapsing
const TAU: f64 = SKILL_INITIAL_SIGMA / 100.0;

/// Passes over the history
const EPOCHS: usize = 3;

/// Posterior belief about one candidate's skill
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SkillRating {
    pub mu: f64,
    pub sigma: f64,
}

impl SkillRating {
    pub fn prior() -> Self {
        Self {
            mu: SKILL_INITIAL_MU,
            sigma: SKILL_INITIAL_SIGMA,
        }
    }

    /// Lower bound used for ranking: mu - 3 sigma
    pub fn conservative(&self) -> f64 {
        self.mu - 3.0 * self.sigma
    }
}

/// Fit ratings by replaying every recorded match for several epochs
pub fn skill_ratings(matrix: &WinMatrix) -> Vec<SkillRating> {
    let mut ratings = vec![SkillRating::prior(); matrix.dim()];
    let history = matrix.match_history();

    for _ in 0..EPOCHS {
        for &(winner, loser) in &history {
            let (w, l) = update(ratings[winner], ratings[loser]);
            ratings[winner] = w;
            ratings[loser] = l;
        }
    }

    ratings
}

/// Rank by conservative score
pub fn skill(matrix: &WinMatrix) -> Ranking {
    Ranking::from_scores(
        skill_ratings(matrix)
            .iter()
            .map(SkillRating::conservative)
            .collect(),
    )
}

fn update(winner: SkillRating, loser: SkillRating) -> (SkillRating, SkillRating) {
    let winner_var = winner.sigma.powi(2) + TAU.powi(2);
    let loser_var = loser.sigma.powi(2) + TAU.powi(2);

    let c = (2.0 * BETA.powi(2) + winner_var + loser_var).sqrt();
    let t = (winner.mu - loser.mu) / c;
    let v = v_win(t);
    let w = (v * (v + t)).clamp(0.0, 1.0 - 1e-9);

    let new_winner = SkillRating {
        mu: winner.mu + winner_var / c * v,
        sigma: (winner_var * (1.0 - winner_var / c.powi(2) * w)).sqrt(),
    };
    let new_loser = SkillRating {
        mu: loser.mu - loser_var / c * v,
        sigma: (loser_var * (1.0 - loser_var / c.powi(2) * w)).sqrt(),
    };
    (new_winner, new_loser)
}

/// Mean shift factor for a win: pdf(t) / cdf(t)
fn v_win(t: f64) -> f64 {
    let denom = normal_cdf(t);
    if denom < 1e-12 {
        -t
    } else {
        normal_pdf(t) / denom
    }
}

fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}
