//! Fantasy points strategies: the per-player objective coefficient used in
//! each solve.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::error::{OptimizerError, Result};
use crate::models::Player;

pub const DEFAULT_MIN_DEVIATION: f64 = 0.0;
pub const DEFAULT_MAX_DEVIATION: f64 = 0.12;
pub const DEFAULT_PROGRESSIVE_SCALE: f64 = 0.01;

/// How projections are turned into objective coefficients.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FantasyPointsStrategy {
    /// Use `fppg` as is.
    #[default]
    Standard,
    /// Uniform draw between floor and ceiling when both are known,
    /// otherwise `fppg` moved up or down by a uniform deviation.
    Random {
        min_deviation: f64,
        max_deviation: f64,
    },
    /// `fppg * (1 + scale * times_used)`, nudging frequently used players up.
    Progressive { scale: f64 },
}

impl FantasyPointsStrategy {
    pub fn random() -> Self {
        FantasyPointsStrategy::Random {
            min_deviation: DEFAULT_MIN_DEVIATION,
            max_deviation: DEFAULT_MAX_DEVIATION,
        }
    }

    pub fn progressive() -> Self {
        FantasyPointsStrategy::Progressive {
            scale: DEFAULT_PROGRESSIVE_SCALE,
        }
    }

    /// True when coefficients never change between iterations.
    pub fn is_static(&self) -> bool {
        matches!(self, FantasyPointsStrategy::Standard)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            FantasyPointsStrategy::Standard => Ok(()),
            FantasyPointsStrategy::Random {
                min_deviation,
                max_deviation,
            } => {
                if min_deviation < 0.0 || max_deviation < min_deviation {
                    return Err(OptimizerError::config(format!(
                        "invalid deviation range {min_deviation}..{max_deviation}"
                    )));
                }
                Ok(())
            }
            FantasyPointsStrategy::Progressive { scale } => {
                if scale < 0.0 {
                    return Err(OptimizerError::config(format!(
                        "progressive scale must be non-negative, got {scale}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Stateful evaluator of a [`FantasyPointsStrategy`] over one run.
#[derive(Debug, Clone)]
pub struct PointsCalculator {
    strategy: FantasyPointsStrategy,
    rng: StdRng,
    usage: HashMap<String, usize>,
}

impl PointsCalculator {
    pub fn new(strategy: FantasyPointsStrategy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            strategy,
            rng,
            usage: HashMap::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.strategy.is_static()
    }

    pub fn points(&mut self, player: &Player) -> f64 {
        match self.strategy {
            FantasyPointsStrategy::Standard => player.fppg,
            FantasyPointsStrategy::Random {
                min_deviation,
                max_deviation,
            } => {
                if let (Some(floor), Some(ceil)) = (player.fppg_floor, player.fppg_ceil) {
                    let (low, high) = ordered(floor, ceil);
                    return self.rng.gen_range(low..=high);
                }
                let (low, high) = ordered(
                    player.min_deviation.unwrap_or(min_deviation),
                    player.max_deviation.unwrap_or(max_deviation),
                );
                let deviation = self.rng.gen_range(low..=high);
                let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                player.fppg * (1.0 + sign * deviation)
            }
            FantasyPointsStrategy::Progressive { scale } => {
                let scale = player.progressive_scale.unwrap_or(scale);
                let used = self.usage.get(&player.key()).copied().unwrap_or(0);
                player.fppg * (1.0 + scale * used as f64)
            }
        }
    }

    /// Record the players of the lineup just generated.
    pub fn set_used<'a>(&mut self, players: impl IntoIterator<Item = &'a Player>) {
        for player in players {
            *self.usage.entry(player.key()).or_default() += 1;
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
