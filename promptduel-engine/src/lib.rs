//! PromptDuel Engine - tournament-driven instruction optimization
//!
//! Ties the other crates together into the optimization loop:
//! - Pool manager (seed, prune, expand)
//! - Optimizer state machine (INIT -> ROUND x N -> FINALIZE)
//! - Final report with leaderboard
//!
//! The caller supplies a [`Generator`](promptduel_core::Generator); every
//! model call goes through it.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use promptduel_core::{Dataset, EngineConfig, Generator};
//! # use promptduel_engine::Optimizer;
//! # async fn demo(generator: Arc<dyn Generator>) -> Result<(), Box<dyn std::error::Error>> {
//! let dataset = Dataset::new(vec!["What is 2 + 2?".to_string()])?;
//! let config = EngineConfig::default().with_rounds(6, 4).with_seed(7);
//! let mut optimizer = Optimizer::new(generator, config)?;
//! let result = optimizer.run(&dataset).await?;
//! println!("{}", result.best_instruction);
//! # Ok(())
//! # }
//! ```

mod optimizer;
mod pool_manager;
mod result;

pub use optimizer::{final_ranking, finalize, Optimizer, RoundSummary};
pub use pool_manager::PoolManager;
pub use result::{leaderboard, LeaderboardEntry, OptimizationResult};
