//! The lineup optimizer.
//!
//! [`LineupOptimizer`] owns the site settings, the player pool and every
//! user constraint. Setters validate eagerly, so misconfiguration is
//! reported at the call that introduced it rather than at solve time.
//! [`LineupOptimizer::optimize`] builds a fresh rule set and base model
//! for one run and returns a lazy [`LineupIterator`].

mod context;
mod run;

#[cfg(test)]
mod tests;

pub use context::OptimizationContext;
pub use run::LineupIterator;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::Settings;
use crate::error::{OptimizerError, Result};
use crate::exposure::ExposureStrategyKind;
use crate::fantasy_points::FantasyPointsStrategy;
use crate::models::{GameClock, Lineup, Player};
use crate::pool::PlayerPool;
use crate::positions::known_positions;
use crate::solver::{GoodLpSolver, Solver};
use crate::stacks::StackSpec;
use crate::statistics::Statistics;

/// Options for a single `optimize` run.
#[derive(Debug, Clone, Default)]
pub struct OptimizeOptions {
    /// Maximum exposure for players that don't declare their own.
    pub max_exposure: Option<f64>,
    pub with_injured: bool,
    pub exposure_strategy: ExposureStrategyKind,
    /// Earlier lineups the new ones must also differ from.
    pub exclude_lineups: Vec<Lineup>,
}

impl OptimizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_exposure(mut self, max_exposure: f64) -> Self {
        self.max_exposure = Some(max_exposure);
        self
    }

    pub fn with_injured(mut self, with_injured: bool) -> Self {
        self.with_injured = with_injured;
        self
    }

    pub fn exposure_strategy(mut self, strategy: ExposureStrategyKind) -> Self {
        self.exposure_strategy = strategy;
        self
    }

    pub fn exclude_lineups(mut self, lineups: Vec<Lineup>) -> Self {
        self.exclude_lineups = lineups;
        self
    }
}

/// Restriction between a position group and the opposing team's.
#[derive(Debug, Clone)]
struct OpposingRestriction {
    first: Vec<String>,
    second: Vec<String>,
    max_allowed: usize,
}

/// User constraints layered on top of the site settings.
#[derive(Debug, Clone, Default)]
struct Constraints {
    min_salary_cap: Option<f64>,
    max_repeating_players: Option<usize>,
    min_projected_ownership: Option<f64>,
    max_projected_ownership: Option<f64>,
    players_from_one_team: BTreeMap<String, usize>,
    players_with_same_position: HashMap<String, usize>,
    opposing_restrictions: Vec<OpposingRestriction>,
    opposing_forces: Vec<(String, String)>,
    same_team_restrictions: Vec<(String, String)>,
    spacing: Option<(Vec<String>, u32)>,
    min_teams: Option<usize>,
    max_teams: Option<usize>,
    min_games: Option<usize>,
    min_starters: Option<usize>,
    team_min_exposures: BTreeMap<String, f64>,
    team_max_exposures: HashMap<String, f64>,
}

/// Generates lineups for one site and sport.
pub struct LineupOptimizer<S: Solver = GoodLpSolver> {
    settings: Settings,
    player_pool: PlayerPool,
    solver: S,
    stacks: Vec<StackSpec>,
    fantasy_points_strategy: FantasyPointsStrategy,
    seed: Option<u64>,
    clock: Option<GameClock>,
    constraints: Constraints,
    last_context: Option<OptimizationContext>,
}

impl LineupOptimizer<GoodLpSolver> {
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_solver(settings, GoodLpSolver::new())
    }
}

impl<S: Solver> LineupOptimizer<S> {
    /// Build an optimizer around a solver prototype; every run starts from
    /// a fresh copy of it.
    pub fn with_solver(settings: Settings, solver: S) -> Result<Self> {
        settings.validate()?;
        let player_pool = PlayerPool::new(settings.positions.clone(), settings.budget);
        Ok(Self {
            settings,
            player_pool,
            solver,
            stacks: Vec::new(),
            fantasy_points_strategy: FantasyPointsStrategy::default(),
            seed: None,
            clock: None,
            constraints: Constraints::default(),
            last_context: None,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn player_pool(&self) -> &PlayerPool {
        &self.player_pool
    }

    pub fn player_pool_mut(&mut self) -> &mut PlayerPool {
        &mut self.player_pool
    }

    pub fn load_players(&mut self, players: Vec<Player>) -> Result<()> {
        self.player_pool.load_players(players)
    }

    pub fn total_players(&self) -> usize {
        self.settings.total_players()
    }

    pub fn budget(&self) -> Option<f64> {
        self.settings.budget
    }

    /// Summary of the most recent run.
    pub fn last_context(&self) -> Option<&OptimizationContext> {
        self.last_context.as_ref()
    }

    /// Usage statistics over the lineups of the most recent run.
    pub fn statistics(&self) -> Option<Statistics> {
        self.last_context
            .as_ref()
            .map(|ctx| Statistics::from_lineups(&ctx.lineups))
    }

    pub fn set_fantasy_points_strategy(&mut self, strategy: FantasyPointsStrategy) -> Result<()> {
        strategy.validate()?;
        self.fantasy_points_strategy = strategy;
        Ok(())
    }

    /// Seed for randomized projections.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    /// Fix the time used to decide which games have started.
    pub fn set_clock(&mut self, clock: GameClock) {
        self.clock = Some(clock);
    }

    pub fn add_stack(&mut self, stack: impl Into<StackSpec>) -> Result<()> {
        let stack = stack.into();
        stack.validate(&self.settings, &self.player_pool.teams(), &self.known_positions())?;
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stacks(&self) -> &[StackSpec] {
        &self.stacks
    }

    pub fn clear_stacks(&mut self) {
        self.stacks.clear();
    }

    /// Drop every user constraint and stack; settings and the pool stay.
    pub fn reset_constraints(&mut self) {
        self.constraints = Constraints::default();
        self.stacks.clear();
    }

    pub fn set_min_salary_cap(&mut self, min_salary: f64) -> Result<()> {
        if let Some(budget) = self.settings.budget {
            if min_salary > budget {
                return Err(OptimizerError::config(format!(
                    "min salary {min_salary} exceeds budget {budget}"
                )));
            }
        }
        self.constraints.min_salary_cap = Some(min_salary);
        Ok(())
    }

    /// Largest number of players any two generated lineups may share.
    pub fn set_max_repeating_players(&mut self, max_repeating: usize) -> Result<()> {
        if max_repeating >= self.total_players() {
            return Err(OptimizerError::config(format!(
                "max repeating players must be below {}",
                self.total_players()
            )));
        }
        self.constraints.max_repeating_players = Some(max_repeating);
        Ok(())
    }

    pub fn set_projected_ownership(&mut self, min: Option<f64>, max: Option<f64>) -> Result<()> {
        validate_exposure_bounds("projected ownership", min, max)?;
        self.constraints.min_projected_ownership = min;
        self.constraints.max_projected_ownership = max;
        Ok(())
    }

    /// Exact number of players from each listed team.
    pub fn set_players_from_one_team(&mut self, quotas: BTreeMap<String, usize>) -> Result<()> {
        for (team, count) in &quotas {
            self.ensure_team(team)?;
            let limit = self
                .settings
                .max_from_one_team
                .unwrap_or(self.total_players());
            if *count > limit {
                return Err(OptimizerError::config(format!(
                    "{count} players from {team} exceeds the limit of {limit}"
                )));
            }
        }
        if quotas.values().sum::<usize>() > self.total_players() {
            return Err(OptimizerError::config("team quotas exceed roster size"));
        }
        self.constraints.players_from_one_team = quotas;
        Ok(())
    }

    /// Extra players of a position beyond what the slots require.
    pub fn set_players_with_same_position(&mut self, extra: HashMap<String, usize>) -> Result<()> {
        for position in extra.keys() {
            self.ensure_position(position)?;
        }
        self.constraints.players_with_same_position = extra;
        Ok(())
    }

    pub fn restrict_positions_for_opposing_team(
        &mut self,
        first: &[&str],
        second: &[&str],
        max_allowed: usize,
    ) -> Result<()> {
        self.ensure_games()?;
        for position in first.iter().chain(second) {
            self.ensure_position(position)?;
        }
        self.constraints.opposing_restrictions.push(OpposingRestriction {
            first: first.iter().map(|p| p.to_string()).collect(),
            second: second.iter().map(|p| p.to_string()).collect(),
            max_allowed,
        });
        Ok(())
    }

    pub fn force_positions_for_opposing_team(&mut self, pairs: &[(&str, &str)]) -> Result<()> {
        self.ensure_games()?;
        let pairs = self.position_pairs(pairs)?;
        self.constraints.opposing_forces.extend(pairs);
        Ok(())
    }

    pub fn restrict_positions_for_same_team(&mut self, pairs: &[(&str, &str)]) -> Result<()> {
        let pairs = self.position_pairs(pairs)?;
        self.constraints.same_team_restrictions.extend(pairs);
        Ok(())
    }

    /// Same-team players of `positions` must be at least `spacing` roster
    /// orders apart.
    pub fn set_spacing_for_positions(&mut self, positions: &[&str], spacing: u32) -> Result<()> {
        if spacing < 1 {
            return Err(OptimizerError::config("spacing must be at least 1"));
        }
        for position in positions {
            self.ensure_position(position)?;
        }
        let positions = positions.iter().map(|p| p.to_string()).collect();
        self.constraints.spacing = Some((positions, spacing));
        Ok(())
    }

    pub fn set_total_teams(&mut self, min: Option<usize>, max: Option<usize>) -> Result<()> {
        let total = self.total_players();
        if let Some(min) = min {
            if min > total {
                return Err(OptimizerError::config(format!(
                    "min teams {min} exceeds roster size {total}"
                )));
            }
        }
        match (min, max) {
            (_, Some(0)) => return Err(OptimizerError::config("max teams must be positive")),
            (Some(min), Some(max)) if min > max => {
                return Err(OptimizerError::config(format!(
                    "min teams {min} is above max teams {max}"
                )))
            }
            _ => {}
        }
        self.constraints.min_teams = min;
        self.constraints.max_teams = max;
        Ok(())
    }

    pub fn set_min_games(&mut self, min: usize) -> Result<()> {
        if min > self.total_players() {
            return Err(OptimizerError::config(format!(
                "min games {min} exceeds roster size {}",
                self.total_players()
            )));
        }
        self.constraints.min_games = Some(min);
        Ok(())
    }

    pub fn set_min_starters(&mut self, min: usize) -> Result<()> {
        if min > self.total_players() {
            return Err(OptimizerError::config(format!(
                "min starters {min} exceeds roster size {}",
                self.total_players()
            )));
        }
        self.constraints.min_starters = Some(min);
        Ok(())
    }

    /// Minimum and maximum share of lineups using at least one player of
    /// `team`.
    pub fn set_team_exposure(&mut self, team: &str, min: Option<f64>, max: Option<f64>) -> Result<()> {
        self.ensure_team(team)?;
        validate_exposure_bounds(team, min, max)?;
        match min {
            Some(min) => self.constraints.team_min_exposures.insert(team.to_string(), min),
            None => self.constraints.team_min_exposures.remove(team),
        };
        match max {
            Some(max) => self.constraints.team_max_exposures.insert(team.to_string(), max),
            None => self.constraints.team_max_exposures.remove(team),
        };
        Ok(())
    }

    fn known_positions(&self) -> BTreeSet<String> {
        let mut positions = known_positions(&self.settings.positions);
        positions.extend(self.player_pool.known_positions());
        positions
    }

    fn ensure_team(&self, team: &str) -> Result<()> {
        if self.player_pool.has_team(team) {
            Ok(())
        } else {
            Err(OptimizerError::InvalidTeam {
                team: team.to_string(),
            })
        }
    }

    fn ensure_position(&self, position: &str) -> Result<()> {
        if self.known_positions().contains(position) {
            Ok(())
        } else {
            Err(OptimizerError::InvalidPosition {
                position: position.to_string(),
            })
        }
    }

    fn ensure_games(&self) -> Result<()> {
        if self.player_pool.games().is_empty() {
            return Err(OptimizerError::config("players have no game information"));
        }
        Ok(())
    }

    fn position_pairs(&self, pairs: &[(&str, &str)]) -> Result<Vec<(String, String)>> {
        pairs
            .iter()
            .map(|(first, second)| {
                self.ensure_position(first)?;
                self.ensure_position(second)?;
                Ok((first.to_string(), second.to_string()))
            })
            .collect()
    }
}

fn validate_exposure_bounds(name: &str, min: Option<f64>, max: Option<f64>) -> Result<()> {
    for value in [min, max].into_iter().flatten() {
        if !(0.0..=1.0).contains(&value) {
            return Err(OptimizerError::InvalidExposure {
                name: name.to_string(),
                message: format!("{value} is outside 0..1"),
            });
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(OptimizerError::InvalidExposure {
                name: name.to_string(),
                message: format!("min {min} is above max {max}"),
            });
        }
    }
    Ok(())
}
