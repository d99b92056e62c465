//! Rules relating players of the same team, opposing teams and games.

use std::collections::BTreeSet;

use super::{add_indicator, OptimizerRule, RuleEnv};
use crate::error::Result;
use crate::models::{GameInfo, Player};
use crate::solver::{Sign, Solver, Variable};

/// Limits how many `second` players may face selected `first` players.
///
/// For each game and orientation an indicator `y` is 1 whenever any
/// `first` player of one team is picked; when it is, the opponent's
/// `second` players are capped at `max_allowed`.
#[derive(Debug)]
pub struct RestrictPositionsForOpposingTeamRule {
    id: usize,
    first: Vec<String>,
    second: Vec<String>,
    max_allowed: usize,
}

impl RestrictPositionsForOpposingTeamRule {
    pub fn new(id: usize, first: Vec<String>, second: Vec<String>, max_allowed: usize) -> Self {
        Self {
            id,
            first,
            second,
            max_allowed,
        }
    }
}

impl OptimizerRule for RestrictPositionsForOpposingTeamRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        for (g, game) in env.players.games().into_iter().enumerate() {
            let orientations = [
                (&game.home_team, &game.away_team),
                (&game.away_team, &game.home_team),
            ];
            for (team, opponent) in orientations {
                let first = team_positions(env, game_filter(team, game), &self.first);
                let second = team_positions(env, game_filter(opponent, game), &self.second);
                if first.is_empty() || second.len() <= self.max_allowed {
                    continue;
                }
                let y = solver.add_variable(
                    &format!("restrict_opposing_{}_{g}_{team}", self.id),
                    None,
                    None,
                )?;

                // sum(first) - |first| * y <= 0
                let mut variables = first.clone();
                variables.push(y);
                let mut coefficients = vec![1.0; first.len()];
                coefficients.push(-(first.len() as f64));
                solver.add_constraint(&variables, Some(&coefficients), Sign::Lte, 0.0, None);

                // sum(second) + m * y <= max_allowed + m
                let m = (second.len() - self.max_allowed) as f64;
                let mut variables = second.clone();
                variables.push(y);
                let mut coefficients = vec![1.0; second.len()];
                coefficients.push(m);
                let name = format!("restrict_opposing_{}_{game}_{team}", self.id);
                solver.add_constraint(
                    &variables,
                    Some(&coefficients),
                    Sign::Lte,
                    self.max_allowed as f64 + m,
                    Some(&name),
                );
            }
        }
        Ok(())
    }
}

/// Requires, for every position pair, one player of the first position and
/// an opponent of the second in the same game.
#[derive(Debug)]
pub struct ForcePositionsForOpposingTeamRule {
    pairs: Vec<(String, String)>,
}

impl ForcePositionsForOpposingTeamRule {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }
}

impl OptimizerRule for ForcePositionsForOpposingTeamRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let games = env.players.games();
        for (k, (first, second)) in self.pairs.iter().enumerate() {
            let mut options = Vec::new();
            for (g, game) in games.iter().enumerate() {
                let orientations = [
                    (&game.home_team, &game.away_team),
                    (&game.away_team, &game.home_team),
                ];
                for (team, opponent) in orientations {
                    let own = team_positions(env, game_filter(team, game), std::slice::from_ref(first));
                    let other =
                        team_positions(env, game_filter(opponent, game), std::slice::from_ref(second));
                    if own.is_empty() || other.is_empty() {
                        continue;
                    }
                    let y = solver.add_variable(&format!("force_opposing_{k}_{g}_{team}"), None, None)?;
                    for side in [&own, &other] {
                        // y <= sum(side)
                        let mut variables = side.clone();
                        variables.push(y);
                        let mut coefficients = vec![1.0; side.len()];
                        coefficients.push(-1.0);
                        solver.add_constraint(&variables, Some(&coefficients), Sign::Gte, 0.0, None);
                    }
                    options.push(y);
                }
            }
            let name = format!("force_opposing_{first}_{second}");
            solver.add_constraint(&options, None, Sign::Gte, 1.0, Some(&name));
        }
        Ok(())
    }
}

/// Forbids a player of one position together with a teammate of another.
#[derive(Debug)]
pub struct RestrictPositionsForSameTeamRule {
    pairs: Vec<(String, String)>,
}

impl RestrictPositionsForSameTeamRule {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }
}

impl OptimizerRule for RestrictPositionsForSameTeamRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let mut seen: BTreeSet<(Variable, Variable)> = BTreeSet::new();
        for players in env.players.by_team().values() {
            for (first, second) in &self.pairs {
                for (p, x) in players.iter().filter(|(p, _)| p.has_position(first)) {
                    for (q, y) in players.iter().filter(|(q, _)| q.has_position(second)) {
                        if p == q {
                            continue;
                        }
                        let pair = if x < y { (*x, *y) } else { (*y, *x) };
                        if seen.insert(pair) {
                            solver.add_constraint(&[pair.0, pair.1], None, Sign::Lte, 1.0, None);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Forbids same-team players whose roster orders are closer than `spacing`
/// (cyclically) when both hold one of `positions`.
#[derive(Debug)]
pub struct RosterSpacingRule {
    positions: Vec<String>,
    spacing: u32,
}

impl RosterSpacingRule {
    pub fn new(positions: Vec<String>, spacing: u32) -> Self {
        Self { positions, spacing }
    }
}

impl OptimizerRule for RosterSpacingRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let max_order = env
            .players
            .iter()
            .filter_map(|(p, _)| p.roster_order)
            .max()
            .unwrap_or(0);
        if max_order == 0 {
            return Ok(());
        }
        for (team, players) in env.players.by_team() {
            let ordered: Vec<(u32, Variable)> = players
                .iter()
                .filter(|(p, _)| p.is_eligible_for(&self.positions))
                .filter_map(|(p, v)| p.roster_order.map(|order| (order, *v)))
                .collect();
            for (i, (a, x)) in ordered.iter().enumerate() {
                for (b, y) in &ordered[i + 1..] {
                    let gap = a.abs_diff(*b) % max_order;
                    let distance = gap.min(max_order - gap);
                    if distance < self.spacing {
                        let name = format!("spacing_{team}_{a}_{b}");
                        solver.add_constraint(&[*x, *y], None, Sign::Lte, 1.0, Some(&name));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MinStartersRule {
    min: usize,
}

impl MinStartersRule {
    pub fn new(min: usize) -> Self {
        Self { min }
    }
}

impl OptimizerRule for MinStartersRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let starters = env.players.select(|p| p.is_confirmed_starter == Some(true));
        solver.add_constraint(&starters, None, Sign::Gte, self.min as f64, Some("min_starters"));
        Ok(())
    }
}

/// Players from at least `min` distinct games.
#[derive(Debug)]
pub struct MinGamesRule {
    min: usize,
}

impl MinGamesRule {
    pub fn new(min: usize) -> Self {
        Self { min }
    }
}

impl OptimizerRule for MinGamesRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let games = env.players.games();
        if games.is_empty() {
            return Ok(());
        }
        let mut indicators = Vec::with_capacity(games.len());
        for (g, game) in games.iter().enumerate() {
            let variables = env.players.select(|p| p.game_info.as_ref() == Some(*game));
            indicators.push(add_indicator(solver, &format!("game_{g}"), &variables)?);
        }
        solver.add_constraint(&indicators, None, Sign::Gte, self.min as f64, Some("min_games"));
        Ok(())
    }
}

/// Between `min` and `max` distinct teams per lineup, ignoring players of
/// the excluded positions.
#[derive(Debug)]
pub struct TotalTeamsRule {
    min: Option<usize>,
    max: Option<usize>,
    exclude_positions: Vec<String>,
}

impl TotalTeamsRule {
    pub fn new(min: Option<usize>, max: Option<usize>, exclude_positions: Vec<String>) -> Self {
        Self {
            min,
            max,
            exclude_positions,
        }
    }
}

impl OptimizerRule for TotalTeamsRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        let mut indicators = Vec::new();
        for (team, players) in env.players.by_team() {
            let variables: Vec<Variable> = players
                .iter()
                .filter(|(p, _)| !p.is_eligible_for(&self.exclude_positions))
                .map(|(_, v)| *v)
                .collect();
            if variables.is_empty() {
                continue;
            }
            indicators.push(add_indicator(solver, &format!("team_{team}"), &variables)?);
        }
        if let Some(min) = self.min {
            solver.add_constraint(&indicators, None, Sign::Gte, min as f64, Some("min_teams"));
        }
        if let Some(max) = self.max {
            solver.add_constraint(&indicators, None, Sign::Lte, max as f64, Some("max_teams"));
        }
        Ok(())
    }
}

fn game_filter<'a>(team: &'a str, game: &'a GameInfo) -> impl Fn(&Player) -> bool + 'a {
    move |p| p.team == team && p.game_info.as_ref() == Some(game)
}

fn team_positions(
    env: &RuleEnv<'_>,
    on_team: impl Fn(&Player) -> bool,
    positions: &[String],
) -> Vec<Variable> {
    env.players.select(|p| on_team(p) && p.is_eligible_for(positions))
}
