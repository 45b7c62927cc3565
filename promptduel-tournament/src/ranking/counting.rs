//! Counting rankers - Copeland, Borda and average win rate
//!
//! Only opponents with at least one recorded match contribute.

use promptduel_core::WinMatrix;

use super::Ranking;

/// Copeland: opponents beaten minus opponents lost to.
///
/// A pair counts as beaten when the head-to-head wins are strictly greater.
/// Ties in the score fall back to the higher mean win rate.
pub fn copeland(matrix: &WinMatrix) -> Ranking {
    let n = matrix.dim();
    let scores: Vec<f64> = (0..n)
        .map(|i| {
            let mut score = 0i64;
            for j in 0..n {
                if i == j {
                    continue;
                }
                let (won, lost) = (matrix.wins(i, j), matrix.wins(j, i));
                if won > lost {
                    score += 1;
                } else if won < lost {
                    score -= 1;
                }
            }
            score as f64
        })
        .collect();

    let mean_rates = mean_win_rates(matrix);
    Ranking::from_scores_with_tiebreak(scores, &mean_rates)
}

/// Borda: sum of head-to-head win rates
pub fn borda(matrix: &WinMatrix) -> Ranking {
    let n = matrix.dim();
    let scores = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i)
                .filter_map(|j| matrix.win_rate(i, j))
                .sum()
        })
        .collect();
    Ranking::from_scores(scores)
}

/// Average win rate across met opponents (0.5 for candidates with no matches)
pub fn avg_win_rate(matrix: &WinMatrix) -> Ranking {
    Ranking::from_scores(mean_win_rates(matrix))
}

fn mean_win_rates(matrix: &WinMatrix) -> Vec<f64> {
    let n = matrix.dim();
    (0..n)
        .map(|i| {
            let rates: Vec<f64> = (0..n)
                .filter(|&j| j != i)
                .filter_map(|j| matrix.win_rate(i, j))
                .collect();
            if rates.is_empty() {
                0.5
            } else {
                rates.iter().sum::<f64>() / rates.len() as f64
            }
        })
        .collect()
}
