//! Exposure strategies: when has a player, team or stack group been used
//! often enough across a run?

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const EPSILON: f64 = 1e-9;

/// Policy deciding when a configured maximum exposure is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExposureStrategyKind {
    /// Reached once `used >= max_exposure * total_lineups`.
    #[default]
    Total,
    /// Reached once `used >= ceil(max_exposure * (generated + 1))`, which keeps
    /// the running ratio under the cap after every lineup.
    AfterEach,
}

/// Usage counters for a set of keys with maximum exposure limits.
#[derive(Debug, Clone)]
pub struct ExposureTracker {
    kind: ExposureStrategyKind,
    total_lineups: usize,
    generated: usize,
    limits: HashMap<String, f64>,
    used: HashMap<String, usize>,
}

impl ExposureTracker {
    pub fn new(
        kind: ExposureStrategyKind,
        total_lineups: usize,
        limits: HashMap<String, f64>,
    ) -> Self {
        Self {
            kind,
            total_lineups,
            generated: 0,
            limits,
            used: HashMap::new(),
        }
    }

    pub fn has_limits(&self) -> bool {
        !self.limits.is_empty()
    }

    pub fn limit(&self, key: &str) -> Option<f64> {
        self.limits.get(key).copied()
    }

    /// Number of recorded lineups that used `key`.
    pub fn used(&self, key: &str) -> usize {
        self.used.get(key).copied().unwrap_or(0)
    }

    pub fn generated(&self) -> usize {
        self.generated
    }

    pub fn is_reached(&self, key: &str) -> bool {
        let Some(max_exposure) = self.limit(key) else {
            return false;
        };
        let used = self.used(key) as f64;
        match self.kind {
            ExposureStrategyKind::Total => {
                used >= max_exposure * self.total_lineups as f64 - EPSILON
            }
            ExposureStrategyKind::AfterEach => {
                let allowed = (max_exposure * (self.generated + 1) as f64 - EPSILON).ceil();
                used >= allowed
            }
        }
    }

    /// Record one generated lineup that used `keys`.
    pub fn set_used<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            *self.used.entry(key.as_ref().to_string()).or_default() += 1;
        }
        self.generated += 1;
    }
}
