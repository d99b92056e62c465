//! Rules whose constraints depend on what earlier lineups used.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{OptimizerRule, RuleEnv};
use crate::error::Result;
use crate::exposure::ExposureTracker;
use crate::models::{Lineup, Player};
use crate::positions::PositionCombination;
use crate::solver::{Sign, Solver, Variable};

/// Forces hand-locked players in and keeps players at or under their
/// maximum exposure.
#[derive(Debug)]
pub struct LockedPlayersRule {
    locked: Vec<Player>,
    tracker: ExposureTracker,
}

impl LockedPlayersRule {
    /// `tracker` holds the maximum exposure of every capped player by key.
    pub fn new(locked: Vec<Player>, tracker: ExposureTracker) -> Self {
        Self { locked, tracker }
    }
}

impl OptimizerRule for LockedPlayersRule {
    fn apply_for_iteration<S: Solver>(
        &mut self,
        solver: &mut S,
        env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        for (player, variable) in env.players.iter() {
            if env.context.unswappable.iter().any(|lp| &lp.player == player) {
                continue;
            }
            let key = player.key();
            if self.tracker.is_reached(&key) {
                let name = format!("max_exposure_{key}");
                solver.add_constraint(&[variable], None, Sign::Eq, 0.0, Some(&name));
            } else if self.locked.contains(player) {
                let name = format!("locked_{key}");
                solver.add_constraint(&[variable], None, Sign::Eq, 1.0, Some(&name));
            }
        }
        Ok(())
    }

    fn post_optimize(&mut self, selected: &[Variable], env: &mut RuleEnv<'_>) {
        let keys: Vec<String> = env.players.selected(selected).map(Player::key).collect();
        self.tracker.set_used(keys);
    }
}

/// Caps the overlap between the next lineup and every earlier one.
#[derive(Debug)]
pub struct UniqueLineupRule {
    max_repeating: Option<usize>,
    used: Vec<Vec<Variable>>,
}

impl UniqueLineupRule {
    /// Without `max_repeating` each new lineup must differ from earlier ones
    /// by at least one player.
    pub fn new(max_repeating: Option<usize>, excluded: &[Lineup], env: &RuleEnv<'_>) -> Self {
        let used = excluded
            .iter()
            .map(|lineup| {
                lineup
                    .iter()
                    .filter_map(|lp| env.players.variable(&lp.player))
                    .collect()
            })
            .collect();
        Self { max_repeating, used }
    }
}

impl OptimizerRule for UniqueLineupRule {
    fn apply_for_iteration<S: Solver>(
        &mut self,
        solver: &mut S,
        _env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        for (i, variables) in self.used.iter().enumerate() {
            let limit = match self.max_repeating {
                Some(max) => max,
                None => variables.len().saturating_sub(1),
            };
            if limit >= variables.len() {
                continue;
            }
            let name = format!("unique_lineup_{i}");
            solver.add_constraint(variables, None, Sign::Lte, limit as f64, Some(&name));
        }
        Ok(())
    }

    fn post_optimize(&mut self, selected: &[Variable], env: &mut RuleEnv<'_>) {
        let players: Vec<Variable> = selected
            .iter()
            .copied()
            .filter(|v| env.players.player(*v).is_some())
            .collect();
        self.used.push(players);
    }
}

/// Schedules players with a minimum exposure across the remaining lineups.
///
/// A player whose outstanding need equals the lineups left is forced in.
/// Otherwise every position combination must hold at least
/// `ceil(outstanding need of its players / lineups left)` of them, so early
/// lineups can't crowd out players that still need appearances.
#[derive(Debug)]
pub struct MinExposureRule {
    needs: HashMap<Variable, usize>,
    remaining_lineups: usize,
    combinations: Vec<PositionCombination>,
}

impl MinExposureRule {
    pub fn new(
        env: &RuleEnv<'_>,
        total_lineups: usize,
        combinations: impl IntoIterator<Item = PositionCombination>,
    ) -> Self {
        let needs = env
            .players
            .iter()
            .filter_map(|(player, variable)| {
                let fraction = player.min_exposure?;
                let need = (fraction * total_lineups as f64).round() as usize;
                (need > 0).then_some((variable, need))
            })
            .collect();
        Self {
            needs,
            remaining_lineups: total_lineups,
            combinations: combinations.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needs.is_empty()
    }
}

impl OptimizerRule for MinExposureRule {
    fn apply_for_iteration<S: Solver>(
        &mut self,
        solver: &mut S,
        env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        if self.remaining_lineups == 0 {
            return Ok(());
        }
        let outstanding: BTreeMap<Variable, usize> = self
            .needs
            .iter()
            .filter(|(_, need)| **need > 0)
            .map(|(v, need)| (*v, *need))
            .collect();

        for (variable, need) in &outstanding {
            if *need >= self.remaining_lineups {
                let name = format!("min_exposure_{}", variable.index());
                solver.add_constraint(&[*variable], None, Sign::Eq, 1.0, Some(&name));
            }
        }

        for combination in &self.combinations {
            let (variables, total_need) = outstanding.iter().fold(
                (Vec::new(), 0usize),
                |(mut variables, total), (variable, need)| match env.players.player(*variable) {
                    Some(player) if player.is_eligible_for(combination) => {
                        variables.push(*variable);
                        (variables, total + need)
                    }
                    _ => (variables, total),
                },
            );
            if total_need == 0 {
                continue;
            }
            let required = total_need.div_ceil(self.remaining_lineups);
            let name = format!("min_exposure_{}", combination.join("_"));
            solver.add_constraint(&variables, None, Sign::Gte, required as f64, Some(&name));
        }
        Ok(())
    }

    fn post_optimize(&mut self, selected: &[Variable], _env: &mut RuleEnv<'_>) {
        for variable in selected {
            if let Some(need) = self.needs.get_mut(variable) {
                *need = need.saturating_sub(1);
            }
        }
        self.remaining_lineups = self.remaining_lineups.saturating_sub(1);
    }
}

/// Minimum and maximum exposure per team; a team is used by a lineup when
/// at least one of its players is in it.
#[derive(Debug)]
pub struct TeamExposureRule {
    tracker: ExposureTracker,
    needs: BTreeMap<String, usize>,
    remaining_lineups: usize,
}

impl TeamExposureRule {
    /// `min_exposures` are fractions per team; maximums live in `tracker`.
    pub fn new(
        tracker: ExposureTracker,
        min_exposures: &BTreeMap<String, f64>,
        total_lineups: usize,
    ) -> Self {
        let needs = min_exposures
            .iter()
            .map(|(team, fraction)| (team.clone(), (fraction * total_lineups as f64).round() as usize))
            .filter(|(_, need)| *need > 0)
            .collect();
        Self {
            tracker,
            needs,
            remaining_lineups: total_lineups,
        }
    }
}

impl OptimizerRule for TeamExposureRule {
    fn apply_for_iteration<S: Solver>(
        &mut self,
        solver: &mut S,
        env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        for (team, players) in env.players.by_team() {
            let variables: Vec<Variable> = players.iter().map(|(_, v)| *v).collect();
            if self.tracker.is_reached(team) {
                let name = format!("team_max_exposure_{team}");
                solver.add_constraint(&variables, None, Sign::Lte, 0.0, Some(&name));
            } else if self
                .needs
                .get(team)
                .is_some_and(|need| *need >= self.remaining_lineups && self.remaining_lineups > 0)
            {
                let name = format!("team_min_exposure_{team}");
                solver.add_constraint(&variables, None, Sign::Gte, 1.0, Some(&name));
            }
        }
        Ok(())
    }

    fn post_optimize(&mut self, selected: &[Variable], env: &mut RuleEnv<'_>) {
        let teams: BTreeSet<&str> = env
            .players
            .selected(selected)
            .map(|p| p.team.as_str())
            .collect();
        for team in &teams {
            if let Some(need) = self.needs.get_mut(*team) {
                *need = need.saturating_sub(1);
            }
        }
        self.tracker.set_used(teams);
        self.remaining_lineups = self.remaining_lineups.saturating_sub(1);
    }
}
