//! Candidate pool - instructions, active set, win matrix and performance records
//!
//! The pool owns every piece of per-candidate state so that removal and
//! growth can keep them consistent in one step. Candidates are identified
//! solely by their position; removal renumbers survivors densely.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::matrix::WinMatrix;

/// One instruction under evaluation. Never edited after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// The instruction text
    pub instruction: String,
    /// Round in which this candidate entered the pool (0 = initial pool)
    pub born_in_round: usize,
}

impl Candidate {
    /// Candidate present from the start of the run
    pub fn initial(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            born_in_round: 0,
        }
    }

    /// Candidate created by a pool update after `round`
    pub fn offspring(instruction: impl Into<String>, round: usize) -> Self {
        Self {
            instruction: instruction.into(),
            born_in_round: round,
        }
    }
}

/// Supervised comparison of one answer against its expected answer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub example_index: usize,
}

impl PerformanceRecord {
    /// Fallback record for comparisons that could not be made
    pub fn zero(example_index: usize) -> Self {
        Self {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            example_index,
        }
    }
}

/// Ordered candidates plus the state derived from their duels
#[derive(Clone, Debug)]
pub struct Pool {
    candidates: Vec<Candidate>,
    active: BTreeSet<usize>,
    matrix: WinMatrix,
    performance: Vec<Vec<PerformanceRecord>>,
    total_generated: usize,
}

impl Pool {
    /// Create a pool with a zero matrix and every candidate active
    pub fn new(candidates: Vec<Candidate>) -> Self {
        let n = candidates.len();
        Self {
            candidates,
            active: (0..n).collect(),
            matrix: WinMatrix::new(n),
            performance: vec![Vec::new(); n],
            total_generated: n,
        }
    }

    /// Number of candidates in the pool
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    /// Instruction text at `index`
    pub fn instruction(&self, index: usize) -> Result<&str, EngineError> {
        self.candidates
            .get(index)
            .map(|c| c.instruction.as_str())
            .ok_or_else(|| {
                EngineError::Invariant(format!(
                    "candidate index {} out of range for pool of {}",
                    index,
                    self.len()
                ))
            })
    }

    /// Indices still eligible to duel, ascending
    pub fn active(&self) -> Vec<usize> {
        self.active.iter().copied().collect()
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.contains(&index)
    }

    /// Exclude a candidate from future duels without removing it
    pub fn deactivate(&mut self, index: usize) {
        self.active.remove(&index);
    }

    pub fn matrix(&self) -> &WinMatrix {
        &self.matrix
    }

    /// Candidates ever created over the lifetime of this pool
    pub fn total_generated(&self) -> usize {
        self.total_generated
    }

    /// Record a judged duel
    pub fn record_win(&mut self, winner: usize, loser: usize) -> Result<(), EngineError> {
        let n = self.len();
        if winner >= n || loser >= n || winner == loser {
            return Err(EngineError::Invariant(format!(
                "cannot record duel {} over {} in pool of {}",
                winner, loser, n
            )));
        }
        self.matrix.record_win(winner, loser);
        Ok(())
    }

    /// Append a supervised performance record for `index`
    pub fn record_performance(
        &mut self,
        index: usize,
        record: PerformanceRecord,
    ) -> Result<(), EngineError> {
        let records = self.performance.get_mut(index).ok_or_else(|| {
            EngineError::Invariant(format!("no performance slot for candidate {}", index))
        })?;
        records.push(record);
        Ok(())
    }

    /// Performance records for `index` since the last prune
    pub fn performance(&self, index: usize) -> &[PerformanceRecord] {
        self.performance
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mean F1 across the candidate's records, if it has any
    pub fn mean_f1(&self, index: usize) -> Option<f64> {
        let records = self.performance(index);
        if records.is_empty() {
            None
        } else {
            Some(records.iter().map(|r| r.f1).sum::<f64>() / records.len() as f64)
        }
    }

    /// Remove candidates and compact every per-candidate structure.
    ///
    /// Performance records are cleared (their indices are stale) and every
    /// survivor becomes active again.
    pub fn remove(&mut self, indices: &[usize]) -> Result<(), EngineError> {
        let n = self.len();
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            return Err(EngineError::Invariant(format!(
                "cannot remove candidate {} from pool of {}",
                bad, n
            )));
        }
        let removed: BTreeSet<usize> = indices.iter().copied().collect();

        let candidates = std::mem::take(&mut self.candidates);
        self.candidates = candidates
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !removed.contains(i))
            .map(|(_, c)| c)
            .collect();

        self.matrix.remove(indices);

        let survivors = self.candidates.len();
        self.performance = vec![Vec::new(); survivors];
        self.active = (0..survivors).collect();

        self.check_invariants()
    }

    /// Append new candidates as active members with empty matrix rows.
    ///
    /// Returns the indices assigned to them.
    pub fn append(&mut self, new: Vec<Candidate>) -> Result<Vec<usize>, EngineError> {
        let start = self.len();
        let added = new.len();

        self.candidates.extend(new);
        self.matrix.grow(added);
        self.performance.resize_with(start + added, Vec::new);
        self.active.extend(start..start + added);
        self.total_generated += added;

        self.check_invariants()?;
        Ok((start..start + added).collect())
    }

    /// Verify the matrix and side tables match the candidate list
    pub fn check_invariants(&self) -> Result<(), EngineError> {
        let n = self.len();
        if !self.matrix.is_square() || self.matrix.dim() != n {
            return Err(EngineError::Invariant(format!(
                "win matrix has dimension {} but pool has {} candidates",
                self.matrix.dim(),
                n
            )));
        }
        if self.performance.len() != n {
            return Err(EngineError::Invariant(format!(
                "{} performance slots for {} candidates",
                self.performance.len(),
                n
            )));
        }
        if let Some(&bad) = self.active.iter().find(|&&i| i >= n) {
            return Err(EngineError::Invariant(format!(
                "active index {} out of range for pool of {}",
                bad, n
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pool(n: usize) -> Pool {
        Pool::new(
            (0..n)
                .map(|i| Candidate::initial(format!("instruction {}", i)))
                .collect(),
        )
    }

    #[test]
    fn test_new_pool_all_active() {
        let pool = make_pool(4);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.active(), vec![0, 1, 2, 3]);
        assert_eq!(pool.matrix().dim(), 4);
        assert_eq!(pool.total_generated(), 4);
        assert!(pool.check_invariants().is_ok());
    }

    #[test]
    fn test_record_win_rejects_bad_indices() {
        let mut pool = make_pool(2);
        assert!(pool.record_win(0, 1).is_ok());
        assert!(pool.record_win(0, 0).is_err());
        assert!(pool.record_win(0, 2).is_err());
        assert_eq!(pool.matrix().wins(0, 1), 1);
    }

    #[test]
    fn test_remove_renumbers_and_resets() {
        let mut pool = make_pool(4);
        pool.record_win(0, 3).unwrap();
        pool.record_win(2, 3).unwrap();
        pool.record_win(0, 2).unwrap();
        pool.record_performance(2, PerformanceRecord::zero(0)).unwrap();
        pool.deactivate(0);

        pool.remove(&[1]).unwrap();

        assert_eq!(pool.len(), 3);
        assert_eq!(pool.instruction(1).unwrap(), "instruction 2");
        assert_eq!(pool.matrix().wins(0, 2), 1); // old (0, 3)
        assert_eq!(pool.matrix().wins(1, 2), 1); // old (2, 3)
        assert_eq!(pool.matrix().wins(0, 1), 1); // old (0, 2)
        assert!(pool.performance(1).is_empty());
        assert_eq!(pool.active(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_out_of_range_fails() {
        let mut pool = make_pool(2);
        assert!(matches!(pool.remove(&[2]), Err(EngineError::Invariant(_))));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_append_grows_everything() {
        let mut pool = make_pool(2);
        pool.record_win(1, 0).unwrap();

        let added = pool
            .append(vec![
                Candidate::offspring("child a", 2),
                Candidate::offspring("child b", 2),
            ])
            .unwrap();

        assert_eq!(added, vec![2, 3]);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.matrix().dim(), 4);
        assert_eq!(pool.matrix().wins(1, 0), 1);
        assert_eq!(pool.active(), vec![0, 1, 2, 3]);
        assert_eq!(pool.total_generated(), 4);
        assert_eq!(pool.candidate(3).unwrap().born_in_round, 2);
    }

    #[test]
    fn test_total_generated_survives_removal() {
        let mut pool = make_pool(3);
        pool.remove(&[0, 1]).unwrap();
        pool.append(vec![Candidate::offspring("new", 1)]).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.total_generated(), 4);
    }

    #[test]
    fn test_mean_f1() {
        let mut pool = make_pool(2);
        assert_eq!(pool.mean_f1(0), None);
        pool.record_performance(
            0,
            PerformanceRecord {
                precision: 1.0,
                recall: 1.0,
                f1: 1.0,
                example_index: 0,
            },
        )
        .unwrap();
        pool.record_performance(0, PerformanceRecord::zero(1)).unwrap();
        assert_eq!(pool.mean_f1(0), Some(0.5));
    }
}
