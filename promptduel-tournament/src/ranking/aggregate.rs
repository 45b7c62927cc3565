//! Aggregate ranker - positional vote across the other theories

use promptduel_core::WinMatrix;

use super::{avg_win_rate, borda, copeland, elo, skill, Ranking};

/// Each ranker awards `n - position` points; candidates sort by total
pub fn aggregate(matrix: &WinMatrix) -> Ranking {
    let n = matrix.dim();
    let rankings = [
        copeland(matrix),
        borda(matrix),
        avg_win_rate(matrix),
        elo(matrix),
        skill(matrix),
    ];

    let mut scores = vec![0.0; n];
    for ranking in &rankings {
        for (position, &candidate) in ranking.order.iter().enumerate() {
            scores[candidate] += (n - position) as f64;
        }
    }

    Ranking::from_scores(scores)
}
