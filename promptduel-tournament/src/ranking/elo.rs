//! Elo ratings replayed from the match history

use promptduel_core::WinMatrix;

use super::Ranking;

/// Rating every candidate starts from
pub const ELO_INITIAL_RATING: f64 = 1500.0;

/// Update step per match
pub const ELO_K_FACTOR: f64 = 32.0;

/// Elo: replay each recorded match in row-major order from the initial rating.
///
/// The replay order changes the final values but is fixed, so the same
/// matrix always produces the same ratings.
pub fn elo(matrix: &WinMatrix) -> Ranking {
    let mut ratings = vec![ELO_INITIAL_RATING; matrix.dim()];

    for (winner, loser) in matrix.match_history() {
        let expected = expected_score(ratings[winner], ratings[loser]);
        let delta = ELO_K_FACTOR * (1.0 - expected);
        ratings[winner] += delta;
        ratings[loser] -= delta;
    }

    Ranking::from_scores(ratings)
}

/// Logistic probability that a player rated `rating` beats one rated `opponent`
fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_match_moves_sixteen_points() {
        let matrix = WinMatrix::from_rows(vec![vec![0, 1], vec![0, 0]]).unwrap();
        let ranking = elo(&matrix);
        assert!((ranking.scores[0] - 1516.0).abs() < 1e-9);
        assert!((ranking.scores[1] - 1484.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratings_are_zero_sum() {
        let matrix =
            WinMatrix::from_rows(vec![vec![0, 4, 1], vec![2, 0, 3], vec![0, 1, 0]]).unwrap();
        let ranking = elo(&matrix);
        let total: f64 = ranking.scores.iter().sum();
        assert!((total - 3.0 * ELO_INITIAL_RATING).abs() < 1e-6);
    }

    #[test]
    fn test_expected_score_symmetry() {
        let a = expected_score(1600.0, 1400.0);
        let b = expected_score(1400.0, 1600.0);
        assert!((a + b - 1.0).abs() < 1e-12);
        assert!(a > 0.75 && a < 0.77);
    }
}
