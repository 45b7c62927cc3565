//! WinMatrix - pairwise tally of judged duels
//!
//! `counts[i][j]` is the number of judged duels in which candidate `i` beat
//! candidate `j`. The two directions are independent counters; their sum is
//! the number of completed matches between the pair. The diagonal is unused.

use serde::{Deserialize, Serialize};

/// Square tally of pairwise wins, indexed densely by pool position
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinMatrix {
    counts: Vec<Vec<u32>>,
}

impl WinMatrix {
    /// Create a zero matrix of dimension `n`
    pub fn new(n: usize) -> Self {
        Self {
            counts: vec![vec![0; n]; n],
        }
    }

    /// Build from raw rows. Returns `None` unless the rows form a square matrix.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Option<Self> {
        let n = rows.len();
        if rows.iter().any(|row| row.len() != n) {
            return None;
        }
        Some(Self { counts: rows })
    }

    /// Dimension (number of candidates)
    pub fn dim(&self) -> usize {
        self.counts.len()
    }

    /// True when every row has `dim()` entries
    pub fn is_square(&self) -> bool {
        let n = self.counts.len();
        self.counts.iter().all(|row| row.len() == n)
    }

    /// Wins of `i` over `j`
    pub fn wins(&self, i: usize, j: usize) -> u32 {
        self.counts[i][j]
    }

    /// Completed matches between `i` and `j`
    pub fn matches_between(&self, i: usize, j: usize) -> u32 {
        self.counts[i][j] + self.counts[j][i]
    }

    /// Empirical probability that `i` beats `j`, if they have met
    pub fn win_rate(&self, i: usize, j: usize) -> Option<f64> {
        let total = self.matches_between(i, j);
        if total == 0 {
            None
        } else {
            Some(self.counts[i][j] as f64 / total as f64)
        }
    }

    /// Record one duel won by `winner` against `loser`
    pub fn record_win(&mut self, winner: usize, loser: usize) {
        debug_assert_ne!(winner, loser, "a candidate cannot duel itself");
        self.counts[winner][loser] += 1;
    }

    /// Total wins of `i` across all opponents
    pub fn total_wins(&self, i: usize) -> u32 {
        self.counts[i].iter().sum()
    }

    /// Total losses of `i` across all opponents
    pub fn total_losses(&self, i: usize) -> u32 {
        self.counts.iter().map(|row| row[i]).sum()
    }

    /// Total completed matches in the matrix
    pub fn total_matches(&self) -> u64 {
        self.counts
            .iter()
            .flat_map(|row| row.iter())
            .map(|&c| c as u64)
            .sum()
    }

    /// True when no match has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.total_matches() == 0
    }

    /// Raw rows, for reporting
    pub fn rows(&self) -> &[Vec<u32>] {
        &self.counts
    }

    /// Every recorded individual match as `(winner, loser)`, in row-major order.
    ///
    /// A cell with count `c` yields the same pair `c` times. Sequential rating
    /// systems replay this stream, so its order is part of their output.
    pub fn match_history(&self) -> Vec<(usize, usize)> {
        let mut history = Vec::with_capacity(self.total_matches() as usize);
        for (i, row) in self.counts.iter().enumerate() {
            for (j, &count) in row.iter().enumerate() {
                if i == j {
                    continue;
                }
                for _ in 0..count {
                    history.push((i, j));
                }
            }
        }
        history
    }

    /// Append `extra` zero rows/columns
    pub fn grow(&mut self, extra: usize) {
        let n = self.dim() + extra;
        for row in &mut self.counts {
            row.resize(n, 0);
        }
        self.counts.resize_with(n, || vec![0; n]);
    }

    /// Delete the rows/columns of `removed` and compact the remaining indices.
    ///
    /// Survivors keep their relative order, so old index `k` maps to
    /// `k - (number of removed indices below k)`.
    pub fn remove(&mut self, removed: &[usize]) {
        let n = self.dim();
        let mut keep = vec![true; n];
        for &idx in removed {
            if idx < n {
                keep[idx] = false;
            }
        }

        let counts = std::mem::take(&mut self.counts);
        self.counts = counts
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep[*i])
            .map(|(_, row)| {
                row.into_iter()
                    .enumerate()
                    .filter(|(j, _)| keep[*j])
                    .map(|(_, c)| c)
                    .collect()
            })
            .collect();
    }
}
