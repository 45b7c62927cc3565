//! Structural guarantees of the pool across prune, expand and finalize

mod common;

use common::{dataset, seeds, LongestWins};
use promptduel_core::{EngineConfig, Pool, RankingMethod};
use promptduel_engine::{final_ranking, finalize, PoolManager};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// FIXTURES
// ============================================================================

fn eight_seeds() -> Vec<String> {
    (0..8).map(|i| format!("Instruction variant {i}")).collect()
}

/// Record `n` random duels between distinct candidates
fn random_duels(pool: &mut Pool, n: usize, rng: &mut ChaCha8Rng) {
    let size = pool.len();
    for _ in 0..n {
        let a = rng.gen_range(0..size);
        let b = (a + rng.gen_range(1..size)) % size;
        pool.record_win(a, b).unwrap();
    }
}

fn assert_dimension_invariant(pool: &Pool) {
    let matrix = pool.matrix();
    assert!(matrix.is_square());
    assert_eq!(matrix.dim(), pool.len());
    assert!(pool.active().iter().all(|&i| i < matrix.dim()));
    pool.check_invariants().unwrap();
}

// ============================================================================
// PRUNE MONOTONICITY
// ============================================================================

#[test]
fn test_prune_preserves_survivor_interactions() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut manager = PoolManager::from_seeds(eight_seeds()).unwrap();
    random_duels(manager.pool_mut(), 60, &mut rng);

    let before = manager.pool().clone();
    let removed = manager.prune(3, RankingMethod::Borda).unwrap();

    assert_eq!(removed.len(), 3);
    assert_eq!(manager.pool().len(), before.len() - 3);
    assert_dimension_invariant(manager.pool());

    // Map each survivor back to its old index by instruction text
    let old_index = |text: &str| {
        before
            .candidates()
            .iter()
            .position(|c| c.instruction == text)
            .unwrap()
    };
    let after = manager.pool();
    let survivors: Vec<usize> = after
        .candidates()
        .iter()
        .map(|c| old_index(&c.instruction))
        .collect();

    for (new_i, &old_i) in survivors.iter().enumerate() {
        for (new_j, &old_j) in survivors.iter().enumerate() {
            assert_eq!(
                after.matrix().wins(new_i, new_j),
                before.matrix().wins(old_i, old_j)
            );
        }
        // Row sums only lose the wins against removed candidates
        let lost_to_removed: u32 = removed
            .iter()
            .map(|text| before.matrix().wins(old_i, old_index(text)))
            .sum();
        assert_eq!(
            after.matrix().total_wins(new_i),
            before.matrix().total_wins(old_i) - lost_to_removed
        );
    }
}

#[test]
fn test_prune_resets_active_set_and_performance() {
    let mut manager = PoolManager::from_seeds(eight_seeds()).unwrap();
    manager.pool_mut().deactivate(1);
    manager
        .pool_mut()
        .record_performance(0, promptduel_core::PerformanceRecord::zero(0))
        .unwrap();

    manager.prune(2, RankingMethod::Copeland).unwrap();

    let pool = manager.pool();
    assert_eq!(pool.active(), (0..6).collect::<Vec<_>>());
    assert!((0..6).all(|i| pool.performance(i).is_empty()));
}

// ============================================================================
// DIMENSION INVARIANT ACROSS UPDATES
// ============================================================================

#[tokio::test]
async fn test_dimension_invariant_through_update_cycles() {
    let generator = LongestWins::default();
    let config = EngineConfig::default().with_pool_updates(1, 2, 3, 4);
    let data = dataset();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut manager = PoolManager::from_seeds(seeds()).unwrap();

    let mut expected = manager.pool().len();
    for round in 1..=4 {
        random_duels(manager.pool_mut(), 10, &mut rng);
        assert_dimension_invariant(manager.pool());

        let pruned = manager.prune(config.prune_count, config.ranking).unwrap();
        assert_dimension_invariant(manager.pool());

        let added = manager
            .expand(
                &generator,
                config.new_candidates,
                config.mutation_parents,
                round,
                &data,
                &config,
                &mut rng,
            )
            .await
            .unwrap();
        assert_dimension_invariant(manager.pool());

        expected = expected - pruned.len() + added.len();
        assert_eq!(manager.pool().len(), expected);
        assert_eq!(added.len(), 4);
        let matrix = manager.pool().matrix();
        assert!(added
            .iter()
            .all(|&i| matrix.total_wins(i) + matrix.total_losses(i) == 0));
    }

    assert_eq!(manager.pool().total_generated(), 4 + 4 * 4);
}

// ============================================================================
// FINALIZE
// ============================================================================

#[test]
fn test_finalize_is_idempotent() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    let mut manager = PoolManager::from_seeds(eight_seeds()).unwrap();
    random_duels(manager.pool_mut(), 40, &mut rng);
    let pool = manager.into_pool();

    for method in [
        RankingMethod::Copeland,
        RankingMethod::Borda,
        RankingMethod::AvgWinRate,
        RankingMethod::Elo,
        RankingMethod::Aggregate,
    ] {
        let (best_a, ranking_a) = final_ranking(&pool, method).unwrap();
        let (best_b, ranking_b) = final_ranking(&pool, method).unwrap();
        assert_eq!(best_a, best_b);
        assert_eq!(ranking_a.order, ranking_b.order);

        let first = finalize(pool.clone(), method, 1, 40).unwrap();
        let second = finalize(pool.clone(), method, 1, 40).unwrap();
        assert_eq!(first.best_index, second.best_index);
        assert_eq!(first.leaderboard, second.leaderboard);
        assert_eq!(first.final_matrix_total, 40);
    }
}
