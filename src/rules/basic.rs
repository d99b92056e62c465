//! Roster-shape rules: counts, budget, positions and team caps.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{OptimizerRule, RuleEnv};
use crate::error::{OptimizerError, Result};
use crate::exposure::ExposureTracker;
use crate::models::{Lineup, LineupPosition, Player};
use crate::pool::LockedPlayer;
use crate::positions::{positions_for_optimizer, remaining_positions, PositionCombination};
use crate::solver::{Sign, Solver, Variable};

/// Exactly `total` players per lineup.
#[derive(Debug)]
pub struct TotalPlayersRule {
    total: usize,
}

impl TotalPlayersRule {
    pub fn new(total: usize) -> Self {
        Self { total }
    }
}

impl OptimizerRule for TotalPlayersRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let variables = env.players.select(|_| true);
        solver.add_constraint(&variables, None, Sign::Eq, self.total as f64, Some("total_players"));
        Ok(())
    }
}

#[derive(Debug)]
pub struct BudgetRule {
    budget: f64,
}

impl BudgetRule {
    pub fn new(budget: f64) -> Self {
        Self { budget }
    }
}

impl OptimizerRule for BudgetRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        if self.budget <= 0.0 {
            return Ok(());
        }
        let (variables, salaries): (Vec<Variable>, Vec<f64>) =
            env.players.iter().map(|(p, v)| (v, p.salary)).unzip();
        solver.add_constraint(&variables, Some(&salaries), Sign::Lte, self.budget, Some("budget"));
        Ok(())
    }
}

#[derive(Debug)]
pub struct MinSalaryCapRule {
    min_salary: f64,
}

impl MinSalaryCapRule {
    pub fn new(min_salary: f64) -> Self {
        Self { min_salary }
    }
}

impl OptimizerRule for MinSalaryCapRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let (variables, salaries): (Vec<Variable>, Vec<f64>) =
            env.players.iter().map(|(p, v)| (v, p.salary)).unzip();
        solver.add_constraint(
            &variables,
            Some(&salaries),
            Sign::Gte,
            self.min_salary,
            Some("min_salary_cap"),
        );
        Ok(())
    }
}

/// At least `count` selected players eligible for each position
/// combination, plus any extra same-position allowance.
///
/// Players locked into a named slot take that slot out of the covering:
/// they are forced in and the other players cover the open slots. A locked
/// player whose exposure is reached frees the slot again.
#[derive(Debug)]
pub struct PositionsRule {
    required: BTreeMap<PositionCombination, usize>,
    extra: HashMap<String, usize>,
    slot_locks: Option<SlotLocks>,
}

#[derive(Debug)]
struct SlotLocks {
    slots: Vec<LineupPosition>,
    multi_positions: BTreeSet<PositionCombination>,
    locks: Vec<(Player, String)>,
    tracker: ExposureTracker,
}

impl PositionsRule {
    pub fn new(required: BTreeMap<PositionCombination, usize>, extra: HashMap<String, usize>) -> Self {
        Self {
            required,
            extra,
            slot_locks: None,
        }
    }

    /// Cover `slots` around players locked into a named slot. `tracker`
    /// holds the maximum exposure of capped players by key.
    pub fn with_slot_locks(
        mut self,
        slots: Vec<LineupPosition>,
        multi_positions: BTreeSet<PositionCombination>,
        locks: &[LockedPlayer],
        tracker: ExposureTracker,
    ) -> Self {
        let locks: Vec<(Player, String)> = locks
            .iter()
            .filter_map(|lock| lock.slot.as_ref().map(|slot| (lock.player.clone(), slot.clone())))
            .collect();
        if !locks.is_empty() {
            self.slot_locks = Some(SlotLocks {
                slots,
                multi_positions,
                locks,
                tracker,
            });
        }
        self
    }

    fn add_covering<S: Solver>(
        &self,
        solver: &mut S,
        env: &RuleEnv<'_>,
        required: &BTreeMap<PositionCombination, usize>,
        excluded: &[&Player],
    ) {
        for (combination, count) in required {
            let extra = match combination.as_slice() {
                [single] => self.extra.get(single).copied().unwrap_or(0),
                _ => 0,
            };
            let variables = env
                .players
                .select(|p| p.is_eligible_for(combination) && !excluded.iter().any(|e| *e == p));
            let name = format!("positions_{}", combination.join("_"));
            solver.add_constraint(&variables, None, Sign::Gte, (count + extra) as f64, Some(&name));
        }
    }
}

impl OptimizerRule for PositionsRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        if self.slot_locks.is_none() {
            self.add_covering(solver, env, &self.required, &[]);
        }
        Ok(())
    }

    fn apply_for_iteration<S: Solver>(
        &mut self,
        solver: &mut S,
        env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        let Some(slot_locks) = &self.slot_locks else {
            return Ok(());
        };
        let active: Vec<&(Player, String)> = slot_locks
            .locks
            .iter()
            .filter(|(player, _)| !slot_locks.tracker.is_reached(&player.key()))
            .collect();
        for (player, _) in &active {
            let variable = env
                .players
                .variable(player)
                .ok_or_else(|| OptimizerError::PlayerNotFound {
                    name: player.name.clone(),
                })?;
            let name = format!("slot_locked_{}", player.key());
            solver.add_constraint(&[variable], None, Sign::Eq, 1.0, Some(&name));
        }

        let open = remaining_positions(&slot_locks.slots, active.iter().map(|(_, slot)| slot.as_str()));
        let required = positions_for_optimizer(&open, &slot_locks.multi_positions);
        let excluded: Vec<&Player> = active.iter().map(|(player, _)| player).collect();
        self.add_covering(solver, env, &required, &excluded);
        Ok(())
    }

    fn post_optimize(&mut self, selected: &[Variable], env: &mut RuleEnv<'_>) {
        if let Some(slot_locks) = &mut self.slot_locks {
            let keys: Vec<String> = env.players.selected(selected).map(Player::key).collect();
            slot_locks.tracker.set_used(keys);
        }
    }
}

#[derive(Debug)]
pub struct MaxFromOneTeamRule {
    max: usize,
}

impl MaxFromOneTeamRule {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl OptimizerRule for MaxFromOneTeamRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        for (team, players) in env.players.by_team() {
            if players.len() <= self.max {
                continue;
            }
            let variables: Vec<Variable> = players.iter().map(|(_, v)| *v).collect();
            let name = format!("max_from_team_{team}");
            solver.add_constraint(&variables, None, Sign::Lte, self.max as f64, Some(&name));
        }
        Ok(())
    }
}

/// Exactly the declared number of players from each listed team.
#[derive(Debug)]
pub struct TeamQuotaRule {
    quotas: BTreeMap<String, usize>,
}

impl TeamQuotaRule {
    pub fn new(quotas: BTreeMap<String, usize>) -> Self {
        Self { quotas }
    }
}

impl OptimizerRule for TeamQuotaRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        for (team, count) in &self.quotas {
            let variables = env.players.select(|p| &p.team == team);
            let name = format!("players_from_team_{team}");
            solver.add_constraint(&variables, None, Sign::Eq, *count as f64, Some(&name));
        }
        Ok(())
    }
}

/// Caps players from one team, not counting those holding an excluded
/// position (pitchers when capping hitters).
#[derive(Debug)]
pub struct MaxFromOneTeamExcludingPositionsRule {
    max: usize,
    excluded_positions: Vec<String>,
}

impl MaxFromOneTeamExcludingPositionsRule {
    pub fn new(max: usize, excluded_positions: Vec<String>) -> Self {
        Self {
            max,
            excluded_positions,
        }
    }
}

impl OptimizerRule for MaxFromOneTeamExcludingPositionsRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        for (team, players) in env.players.by_team() {
            let variables: Vec<Variable> = players
                .iter()
                .filter(|(p, _)| {
                    !p.original_positions()
                        .iter()
                        .any(|pos| self.excluded_positions.contains(pos))
                })
                .map(|(_, v)| *v)
                .collect();
            if variables.len() <= self.max {
                continue;
            }
            let name = format!("max_hitters_from_team_{team}");
            solver.add_constraint(&variables, None, Sign::Lte, self.max as f64, Some(&name));
        }
        Ok(())
    }
}

/// At most one selected player per position code.
#[derive(Debug, Default)]
pub struct OnePlayerPerPositionRule;

impl OptimizerRule for OnePlayerPerPositionRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let mut by_position: BTreeMap<&str, Vec<Variable>> = BTreeMap::new();
        for (player, variable) in env.players.iter() {
            for position in &player.positions {
                by_position.entry(position.as_str()).or_default().push(variable);
            }
        }
        for (position, variables) in by_position {
            if variables.len() > 1 {
                let name = format!("one_per_position_{position}");
                solver.add_constraint(&variables, None, Sign::Lte, 1.0, Some(&name));
            }
        }
        Ok(())
    }
}

/// At most one record per full name, so derived variants of one human are
/// never selected together.
#[derive(Debug, Default)]
pub struct UniquePlayerRule;

impl OptimizerRule for UniquePlayerRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let mut by_name: BTreeMap<&str, Vec<Variable>> = BTreeMap::new();
        for (player, variable) in env.players.iter() {
            by_name.entry(player.name.as_str()).or_default().push(variable);
        }
        for (name, variables) in by_name {
            if variables.len() > 1 {
                let name = format!("unique_player_{name}");
                solver.add_constraint(&variables, None, Sign::Lte, 1.0, Some(&name));
            }
        }
        Ok(())
    }
}

/// Keeps the average projected ownership of a lineup within a band.
///
/// `sum((own - min) * x) >= 0` and `sum((own - max) * x) <= 0`; players
/// without an ownership projection are left out of both sums.
#[derive(Debug)]
pub struct ProjectedOwnershipRule {
    min: Option<f64>,
    max: Option<f64>,
}

impl ProjectedOwnershipRule {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }
}

impl OptimizerRule for ProjectedOwnershipRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let owned: Vec<(Variable, f64)> = env
            .players
            .iter()
            .filter_map(|(p, v)| p.projected_ownership.map(|own| (v, own)))
            .collect();
        let variables: Vec<Variable> = owned.iter().map(|(v, _)| *v).collect();
        if let Some(min) = self.min {
            let coefficients: Vec<f64> = owned.iter().map(|(_, own)| own - min).collect();
            solver.add_constraint(
                &variables,
                Some(&coefficients),
                Sign::Gte,
                0.0,
                Some("min_projected_ownership"),
            );
        }
        if let Some(max) = self.max {
            let coefficients: Vec<f64> = owned.iter().map(|(_, own)| own - max).collect();
            solver.add_constraint(
                &variables,
                Some(&coefficients),
                Sign::Lte,
                0.0,
                Some("max_projected_ownership"),
            );
        }
        Ok(())
    }
}
