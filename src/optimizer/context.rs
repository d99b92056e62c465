//! Per-run mutable state shared by the engine and its rules.

use std::collections::HashMap;

use crate::exposure::ExposureStrategyKind;
use crate::models::{Lineup, LineupPlayer};

#[derive(Debug, Clone)]
pub struct OptimizationContext {
    pub total_lineups: usize,
    pub remaining_lineups: usize,
    pub lineups: Vec<Lineup>,
    /// Points used for each player (by key) in the iteration being solved.
    pub players_used_fppg: HashMap<String, f64>,
    pub exclude_lineups: Vec<Lineup>,
    pub exposure_strategy: ExposureStrategyKind,
    /// Players kept in their slot during the current late-swap iteration.
    pub unswappable: Vec<LineupPlayer>,
}

impl OptimizationContext {
    pub fn new(
        total_lineups: usize,
        exposure_strategy: ExposureStrategyKind,
        exclude_lineups: Vec<Lineup>,
    ) -> Self {
        Self {
            total_lineups,
            remaining_lineups: total_lineups,
            lineups: Vec::with_capacity(total_lineups),
            players_used_fppg: HashMap::new(),
            exclude_lineups,
            exposure_strategy,
            unswappable: Vec::new(),
        }
    }

    pub fn generated(&self) -> usize {
        self.lineups.len()
    }

    pub(crate) fn start_iteration(&mut self) {
        self.players_used_fppg.clear();
        self.unswappable.clear();
    }

    pub(crate) fn add_lineup(&mut self, lineup: Lineup) {
        self.lineups.push(lineup);
        self.remaining_lineups = self.remaining_lineups.saturating_sub(1);
    }
}
