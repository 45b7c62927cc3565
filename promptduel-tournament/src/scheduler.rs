//! Duel scheduling - Thompson sampling over a confidence-bounded bandit
//!
//! Each call to [`DuelScheduler::schedule`] draws one posterior preference
//! matrix θ (shared by every duel in that call) and then picks duels one
//! at a time:
//!
//! 1. Six candidate features are fused with Dirichlet weights (fresh per
//!    duel) and a softmax over the fused score picks the first duelist.
//! 2. The second duelist is sampled by posterior variance against the
//!    first, among opponents not already shown to beat it.
//!
//! With no recorded matches at all, both duelists are drawn uniformly.

use promptduel_core::{EngineConfig, EngineError, WinMatrix};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::{Beta, Dirichlet};
use tracing::debug;

use crate::ranking::RankingSnapshot;

/// Number of fused features per candidate
const FEATURE_COUNT: usize = 6;

/// Scale of the random tie-breaking noise added to fused scores
const JITTER: f64 = 1e-9;

/// Rating signals computed from the previous round's matrix
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RatingSignals {
    pub elo: Vec<f64>,
    pub skill_mu: Vec<f64>,
    pub skill_conservative: Vec<f64>,
}

impl RatingSignals {
    pub fn from_snapshot(snapshot: &RankingSnapshot) -> Self {
        Self {
            elo: snapshot.elo.scores.clone(),
            skill_mu: snapshot.skill.iter().map(|r| r.mu).collect(),
            skill_conservative: snapshot.skill.iter().map(|r| r.conservative()).collect(),
        }
    }

    /// Signals straight from a matrix
    pub fn compute(matrix: &WinMatrix) -> Self {
        Self::from_snapshot(&RankingSnapshot::compute(matrix))
    }

    fn len_matches(&self, n: usize) -> bool {
        self.elo.len() == n && self.skill_mu.len() == n && self.skill_conservative.len() == n
    }
}

/// Pair selection policy
#[derive(Clone, Debug)]
pub struct DuelScheduler {
    /// Exploration parameter of the confidence bounds
    pub alpha: f64,
    /// Softmax temperature for the first duelist
    pub tau: f64,
    /// Sample feature weights from Dirichlet(1, ..., 1); uniform weights otherwise
    pub dirichlet: bool,
}

impl DuelScheduler {
    pub fn new(alpha: f64, tau: f64, dirichlet: bool) -> Self {
        Self {
            alpha,
            tau,
            dirichlet,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.alpha,
            config.selection_temperature,
            config.dirichlet_fusion,
        )
    }

    /// Pick `count` duels among `active` candidates (Level 2).
    ///
    /// `step` is the run-wide duel counter; it advances by one per duel.
    pub fn schedule<R: Rng>(
        &self,
        matrix: &WinMatrix,
        active: &[usize],
        step: &mut u64,
        signals: &RatingSignals,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<(usize, usize)>, EngineError> {
        if active.len() < 2 {
            return Err(EngineError::InsufficientCandidates {
                active: active.len(),
            });
        }
        if let Some(&bad) = active.iter().find(|&&i| i >= matrix.dim()) {
            return Err(EngineError::Invariant(format!(
                "active index {} outside matrix of dimension {}",
                bad,
                matrix.dim()
            )));
        }

        let mut pairs = Vec::with_capacity(count);

        if matrix.is_empty() {
            for _ in 0..count {
                *step += 1;
                let picked = rand::seq::index::sample(rng, active.len(), 2);
                pairs.push((active[picked.index(0)], active[picked.index(1)]));
            }
            debug!("No match history, scheduled {} uniform duels", count);
            return Ok(pairs);
        }

        if !signals.len_matches(matrix.dim()) {
            return Err(EngineError::Invariant(format!(
                "rating signals do not cover {} candidates",
                matrix.dim()
            )));
        }

        let theta = sample_theta(matrix, rng)?;
        let features = candidate_features(&theta, active, signals);

        for _ in 0..count {
            *step += 1;
            let first = self.first_duelist(&features, active, rng)?;
            let second = self.second_duelist(matrix, first, active, *step, rng)?;
            debug!("Duel {}: {} vs {}", step, first, second);
            pairs.push((first, second));
        }

        Ok(pairs)
    }

    fn first_duelist<R: Rng>(
        &self,
        features: &[[f64; FEATURE_COUNT]],
        active: &[usize],
        rng: &mut R,
    ) -> Result<usize, EngineError> {
        let weights = if self.dirichlet {
            Dirichlet::new(&[1.0; FEATURE_COUNT])
                .map_err(|e| EngineError::Invariant(format!("Dirichlet weights: {e}")))?
                .sample(rng)
        } else {
            vec![1.0 / FEATURE_COUNT as f64; FEATURE_COUNT]
        };

        let tau = self.tau.max(f64::EPSILON);
        let logits: Vec<f64> = features
            .iter()
            .map(|f| {
                let fused: f64 = f.iter().zip(&weights).map(|(x, w)| x * w).sum();
                (fused + rng.gen::<f64>() * JITTER) / tau
            })
            .collect();

        let probs = softmax(&logits);
        let dist = WeightedIndex::new(&probs)
            .map_err(|e| EngineError::Invariant(format!("first duelist weights: {e}")))?;
        Ok(active[dist.sample(rng)])
    }

    fn second_duelist<R: Rng>(
        &self,
        matrix: &WinMatrix,
        first: usize,
        active: &[usize],
        step: u64,
        rng: &mut R,
    ) -> Result<usize, EngineError> {
        let (options, weights): (Vec<usize>, Vec<f64>) =
            opponent_weights(matrix, first, active, self.alpha, step)
                .into_iter()
                .unzip();
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| EngineError::Invariant(format!("second duelist weights: {e}")))?;
        Ok(options[dist.sample(rng)])
    }
}

// ============================================================================
// Posterior and bounds
// ============================================================================

/// Hoeffding interval on the probability that `i` beats `j`
fn confidence_bounds(matrix: &WinMatrix, i: usize, j: usize, alpha: f64, step: u64) -> (f64, f64) {
    let n = matrix.matches_between(i, j);
    if n == 0 {
        return (0.0, 1.0);
    }
    let p = matrix.wins(i, j) as f64 / n as f64;
    let t = step.max(2) as f64;
    let half_width = (alpha * t.ln() / n as f64).sqrt();
    ((p - half_width).clamp(0.0, 1.0), (p + half_width).clamp(0.0, 1.0))
}

/// θ[i][j] ~ Beta(W[i][j] + 1, W[j][i] + 1), with θ[j][i] = 1 - θ[i][j]
fn sample_theta<R: Rng>(matrix: &WinMatrix, rng: &mut R) -> Result<Vec<Vec<f64>>, EngineError> {
    let n = matrix.dim();
    let mut theta = vec![vec![0.5; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let beta = Beta::new(
                matrix.wins(i, j) as f64 + 1.0,
                matrix.wins(j, i) as f64 + 1.0,
            )
            .map_err(|e| EngineError::Invariant(format!("Beta posterior ({i}, {j}): {e}")))?;
            let p = beta.sample(rng);
            theta[i][j] = p;
            theta[j][i] = 1.0 - p;
        }
    }
    Ok(theta)
}

fn beta_variance(a: f64, b: f64) -> f64 {
    let s = a + b;
    a * b / (s * s * (s + 1.0))
}

/// Sampling weight of every possible opponent of `first`.
///
/// Opponents whose lower bound on beating `first` exceeds 0.5 are already
/// settled and excluded, unless that leaves nobody.
fn opponent_weights(
    matrix: &WinMatrix,
    first: usize,
    active: &[usize],
    alpha: f64,
    step: u64,
) -> Vec<(usize, f64)> {
    let others: Vec<usize> = active.iter().copied().filter(|&c| c != first).collect();
    let plausible: Vec<usize> = others
        .iter()
        .copied()
        .filter(|&c| confidence_bounds(matrix, c, first, alpha, step).0 <= 0.5)
        .collect();
    let pool = if plausible.is_empty() { others } else { plausible };

    pool.into_iter()
        .map(|c| {
            let variance = beta_variance(
                matrix.wins(c, first) as f64 + 1.0,
                matrix.wins(first, c) as f64 + 1.0,
            );
            let decay = 1.0 / (1.0 + matrix.matches_between(c, first) as f64);
            (c, variance * decay)
        })
        .collect()
}

// ============================================================================
// Features
// ============================================================================

/// Min-max normalized features per active candidate, higher is better:
/// θ-Copeland, θ-Borda, θ-mean win rate, Elo, skill mean, skill conservative
fn candidate_features(
    theta: &[Vec<f64>],
    active: &[usize],
    signals: &RatingSignals,
) -> Vec<[f64; FEATURE_COUNT]> {
    let opponents = (active.len() - 1).max(1) as f64;

    let mut columns: [Vec<f64>; FEATURE_COUNT] = Default::default();
    for &i in active {
        let row = active.iter().filter(|&&j| j != i).map(|&j| theta[i][j]);
        let copeland = row.clone().filter(|&p| p > 0.5).count() as f64
            - row.clone().filter(|&p| p < 0.5).count() as f64;
        let borda: f64 = row.sum();

        columns[0].push(copeland);
        columns[1].push(borda);
        columns[2].push(borda / opponents);
        columns[3].push(signals.elo[i]);
        columns[4].push(signals.skill_mu[i]);
        columns[5].push(signals.skill_conservative[i]);
    }

    for column in &mut columns {
        min_max_normalize(column);
    }

    (0..active.len())
        .map(|k| std::array::from_fn(|f| columns[f][k]))
        .collect()
}

/// Scale to [0, 1]; a constant column becomes 0.5
fn min_max_normalize(values: &mut [f64]) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    for v in values.iter_mut() {
        *v = if range > 0.0 { (*v - min) / range } else { 0.5 };
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
