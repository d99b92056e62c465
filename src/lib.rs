//! Daily fantasy sports lineup optimizer
//!
//! Builds 0/1 integer programs over a player pool and solves them
//! repeatedly to produce a ranked sequence of distinct lineups that respect
//! salary caps, roster slots, team limits, stacking and exposure rules.
//!
//! ## Features
//!
//! - **Roster rules**: budget, slot covering for multi-position players,
//!   team and game limits, opposing-team and same-team position rules
//! - **Stacking**: team, positions and game stacks, or custom nested groups
//! - **Exposure**: per-player, per-team and per-stack caps and minimums
//! - **Projections**: standard, randomized and progressive points
//! - **Late swap**: re-optimize entered lineups after games lock
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dfs_optimizer::{LineupOptimizer, LineupPosition, OptimizeOptions, Player, Settings};
//!
//! # fn example() -> dfs_optimizer::Result<()> {
//! let settings = Settings::new(
//!     Some(50_000.0),
//!     vec![
//!         LineupPosition::new("G", &["PG", "SG"]),
//!         LineupPosition::new("F", &["SF", "PF"]),
//!         LineupPosition::new("UTIL", &["PG", "SG", "SF", "PF", "C"]),
//!     ],
//! );
//! let mut optimizer = LineupOptimizer::new(settings)?;
//! optimizer.load_players(vec![
//!     Player::new("1", "Guard", &["PG"], "BOS", 9_000.0, 45.0),
//!     // ...
//! ])?;
//!
//! for lineup in optimizer.optimize(20, OptimizeOptions::new().max_exposure(0.6))? {
//!     println!("{}", lineup?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Configuration
//!
//! The CLI reads site settings from `--settings`, then:
//! ```bash
//! export DFS_OPTIMIZER_SETTINGS=/path/to/settings.json
//! ```

pub mod assembly;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod exposure;
pub mod fantasy_points;
pub mod logging;
pub mod models;
pub mod optimizer;
pub mod pool;
pub mod positions;
pub mod rules;
pub mod solver;
pub mod source;
pub mod stacks;
pub mod statistics;

// Re-export commonly used types
pub use config::{Settings, SiteRule, SETTINGS_ENV_VAR};
pub use error::{OptimizerError, Result};
pub use exposure::ExposureStrategyKind;
pub use fantasy_points::FantasyPointsStrategy;
pub use models::{GameClock, GameInfo, Lineup, LineupPlayer, LineupPosition, Player};
pub use optimizer::{LineupIterator, LineupOptimizer, OptimizationContext, OptimizeOptions};
pub use pool::{FilterAttribute, PlayerFilter, PlayerPool};
pub use solver::{GoodLpSolver, Sign, Solver, SolverError, Variable};
pub use stacks::{GameStack, NestedPlayersGroup, PlayersGroup, PositionsStack, Stack, StackSpec, TeamStack};
pub use statistics::Statistics;
