//! Engine configuration
//!
//! One flat struct holding every recognised option. All fields have
//! defaults, so partial JSON files are accepted.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Ranking theory used for pruning, parent selection and the final winner
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingMethod {
    #[default]
    Copeland,
    Borda,
    #[serde(rename = "avg-winrate")]
    AvgWinRate,
    Elo,
    Aggregate,
}

impl RankingMethod {
    /// Configuration name of this method
    pub fn name(&self) -> &'static str {
        match self {
            RankingMethod::Copeland => "copeland",
            RankingMethod::Borda => "borda",
            RankingMethod::AvgWinRate => "avg-winrate",
            RankingMethod::Elo => "elo",
            RankingMethod::Aggregate => "aggregate",
        }
    }
}

impl std::str::FromStr for RankingMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copeland" => Ok(RankingMethod::Copeland),
            "borda" => Ok(RankingMethod::Borda),
            "avg-winrate" => Ok(RankingMethod::AvgWinRate),
            "elo" => Ok(RankingMethod::Elo),
            "aggregate" => Ok(RankingMethod::Aggregate),
            other => Err(EngineError::Config(format!(
                "unknown ranking method '{}'",
                other
            ))),
        }
    }
}

/// Sampling parameters for one class of model call
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Configuration for a full optimization run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rounds to run before finalizing
    pub total_rounds: usize,
    /// Duels scheduled per round
    pub duels_per_round: usize,
    /// Examples sampled per duel (all examples if fewer exist)
    pub examples_per_duel: usize,
    /// Candidates proposed when the pool is not seeded
    pub initial_pool_size: usize,
    /// Pool update runs after every round that is a multiple of this
    pub update_frequency: usize,
    /// Candidates pruned per update
    pub prune_count: usize,
    /// Top candidates used as mutation parents per update
    pub mutation_parents: usize,
    /// Offspring generated per update
    pub new_candidates: usize,
    /// Maximum in-flight requests per batch
    pub max_concurrency: usize,
    /// Exploration parameter of the confidence bounds
    pub alpha: f64,
    /// Softmax temperature for picking the first duelist
    pub selection_temperature: f64,
    /// Sample Dirichlet weights over ranking features (uniform if false)
    pub dirichlet_fusion: bool,
    /// Answer choices used when a label carries no override
    pub default_choices: Vec<String>,
    /// Authoritative ranking theory
    pub ranking: RankingMethod,
    /// Ground mutations in labeled examples when labels exist
    pub supervised_mutation: bool,
    /// Examples summarized into the dataset description
    pub summary_examples: usize,
    /// Examples shown to each initial proposal
    pub proposal_examples: usize,
    /// Labeled pairs shown to each supervised mutation
    pub mutation_examples: usize,
    /// Parameters for candidate answers in duels
    pub answer: GenerationParams,
    /// Parameters for judge calls
    pub judge: GenerationParams,
    /// Parameters for summaries, proposals and mutations
    pub proposal: GenerationParams,
    /// Random seed for reproducibility (None = entropy)
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            total_rounds: 10,
            duels_per_round: 8,
            examples_per_duel: 3,
            initial_pool_size: 8,
            update_frequency: 3,
            prune_count: 2,
            mutation_parents: 2,
            new_candidates: 2,
            max_concurrency: 16,
            alpha: 0.51,
            selection_temperature: 0.2,
            dirichlet_fusion: true,
            default_choices: vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ],
            ranking: RankingMethod::Copeland,
            supervised_mutation: false,
            summary_examples: 5,
            proposal_examples: 3,
            mutation_examples: 3,
            answer: GenerationParams::new(0.0, 512),
            judge: GenerationParams::new(0.0, 256),
            proposal: GenerationParams::new(0.9, 512),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Set the number of rounds and duels per round
    pub fn with_rounds(mut self, total_rounds: usize, duels_per_round: usize) -> Self {
        self.total_rounds = total_rounds;
        self.duels_per_round = duels_per_round;
        self
    }

    /// Set the pool update schedule
    pub fn with_pool_updates(
        mut self,
        update_frequency: usize,
        prune_count: usize,
        mutation_parents: usize,
        new_candidates: usize,
    ) -> Self {
        self.update_frequency = update_frequency;
        self.prune_count = prune_count;
        self.mutation_parents = mutation_parents;
        self.new_candidates = new_candidates;
        self
    }

    /// Set the authoritative ranking
    pub fn with_ranking(mut self, ranking: RankingMethod) -> Self {
        self.ranking = ranking;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// True if a pool update should follow `round` (1-based)
    pub fn is_update_round(&self, round: usize) -> bool {
        round < self.total_rounds && round % self.update_frequency == 0
    }

    /// Check option ranges
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: &str| -> Result<(), EngineError> {
            Err(EngineError::Config(msg.to_string()))
        };

        if self.total_rounds == 0 {
            return fail("total_rounds must be > 0");
        }
        if self.duels_per_round == 0 {
            return fail("duels_per_round must be > 0");
        }
        if self.examples_per_duel == 0 {
            return fail("examples_per_duel must be > 0");
        }
        if self.initial_pool_size < 2 {
            return fail("initial_pool_size must be >= 2");
        }
        if self.update_frequency == 0 {
            return fail("update_frequency must be > 0");
        }
        if self.max_concurrency == 0 {
            return fail("max_concurrency must be > 0");
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return fail("alpha must be a positive number");
        }
        if !(self.selection_temperature.is_finite() && self.selection_temperature > 0.0) {
            return fail("selection_temperature must be a positive number");
        }
        if self.default_choices.is_empty() {
            return fail("default_choices must not be empty");
        }
        Ok(())
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}
