//! Pool manager - seeding, pruning and expanding the candidate pool
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: initialize(), prune(), expand() - one pool update each
//! - Level 2: authoritative ranking, parent / victim selection
//! - Level 3: Pool::remove / Pool::append keep matrix and side tables aligned

use promptduel_core::{
    Candidate, Dataset, EngineConfig, EngineError, Generator, Pool, RankingMethod,
};
use promptduel_evolve::{
    distribute_slots, mutate, propose_initial, select_bottom, select_elite, MutationRequest,
};
use promptduel_tournament::{rank, Ranking};
use rand::Rng;
use tracing::{debug, info};

/// Owns the pool and applies every structural change to it
#[derive(Clone, Debug)]
pub struct PoolManager {
    pool: Pool,
}

impl PoolManager {
    /// Start from caller-provided instructions
    pub fn from_seeds(seeds: Vec<String>) -> Result<Self, EngineError> {
        if seeds.len() < 2 {
            return Err(EngineError::InsufficientCandidates {
                active: seeds.len(),
            });
        }
        let pool = Pool::new(seeds.into_iter().map(Candidate::initial).collect());
        pool.check_invariants()?;
        Ok(Self { pool })
    }

    /// Propose `count` starting candidates from the dataset
    pub async fn initialize<R: Rng>(
        generator: &dyn Generator,
        dataset: &Dataset,
        count: usize,
        config: &EngineConfig,
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        let proposals = propose_initial(generator, dataset, count, config, rng).await?;
        Self::from_seeds(proposals)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    pub fn into_pool(self) -> Pool {
        self.pool
    }

    /// Best-first order under `method`
    pub fn ranking(&self, method: RankingMethod) -> Ranking {
        rank(method, self.pool.matrix())
    }

    /// Remove the `n` lowest-ranked active candidates.
    ///
    /// At least one candidate always survives. Returns the removed
    /// instructions, worst first.
    pub fn prune(&mut self, n: usize, method: RankingMethod) -> Result<Vec<String>, EngineError> {
        let n = n.min(self.pool.len().saturating_sub(1));
        if n == 0 {
            return Ok(Vec::new());
        }

        let ranking = self.ranking(method);
        let victims = select_bottom(&ranking.order, &self.pool.active(), n);
        let removed = victims
            .iter()
            .map(|&i| self.pool.instruction(i).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        self.pool.remove(&victims)?;
        info!(
            "Pruned {} candidates {:?}, pool now {}",
            victims.len(),
            victims,
            self.pool.len()
        );
        Ok(removed)
    }

    /// Mutate the top `top_k` active candidates into `total_new` offspring.
    ///
    /// Offspring are appended as active candidates born in `round`.
    /// Returns their pool indices.
    #[allow(clippy::too_many_arguments)]
    pub async fn expand<R: Rng>(
        &mut self,
        generator: &dyn Generator,
        total_new: usize,
        top_k: usize,
        round: usize,
        dataset: &Dataset,
        config: &EngineConfig,
        rng: &mut R,
    ) -> Result<Vec<usize>, EngineError> {
        if total_new == 0 || top_k == 0 {
            return Ok(Vec::new());
        }

        let ranking = self.ranking(config.ranking);
        let parents = select_elite(&ranking.order, &self.pool.active(), top_k);
        let slots = distribute_slots(total_new, parents.len());

        let requests = parents
            .iter()
            .zip(&slots)
            .filter(|(_, count)| **count > 0)
            .map(|(&parent, &count)| {
                Ok(MutationRequest {
                    parent,
                    instruction: self.pool.instruction(parent)?,
                    count,
                    mean_f1: self.pool.mean_f1(parent),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        debug!("Mutation parents {:?} with slots {:?}", parents, slots);

        let grounding = config.supervised_mutation.then_some(dataset);
        let offspring = mutate(generator, &requests, grounding, config, rng).await?;

        let added = self.pool.append(
            offspring
                .into_iter()
                .map(|text| Candidate::offspring(text, round))
                .collect(),
        )?;
        info!("Added {} offspring, pool now {}", added.len(), self.pool.len());
        Ok(added)
    }
}
