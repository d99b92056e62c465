//! Constraint generators.
//!
//! Each rule contributes variables and constraints to the model through
//! up to three hooks:
//!
//! - `apply` runs once against the base model of a run
//! - `apply_for_iteration` runs against the per-iteration copy, before
//!   each solve
//! - `post_optimize` sees the selected variables after a successful solve
//!   and updates whatever usage state the rule keeps
//!
//! Rules are a closed set dispatched through [`Rule`]; the engine builds
//! the active list fresh for every run.

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::models::{GameInfo, Lineup, Player};
use crate::optimizer::OptimizationContext;
use crate::solver::{Sign, Solver, Variable};

mod basic;
mod exposure;
mod late_swap;
mod objective;
mod stacking;
mod teams;

#[cfg(test)]
mod tests;

pub use basic::{
    BudgetRule, MaxFromOneTeamExcludingPositionsRule, MaxFromOneTeamRule, MinSalaryCapRule,
    OnePlayerPerPositionRule, PositionsRule, ProjectedOwnershipRule, TeamQuotaRule,
    TotalPlayersRule, UniquePlayerRule,
};
pub use exposure::{LockedPlayersRule, MinExposureRule, TeamExposureRule, UniqueLineupRule};
pub use late_swap::LateSwapRule;
pub use objective::ObjectiveRule;
pub use stacking::GenericStacksRule;
pub use teams::{
    ForcePositionsForOpposingTeamRule, MinGamesRule, MinStartersRule,
    RestrictPositionsForOpposingTeamRule, RestrictPositionsForSameTeamRule, RosterSpacingRule,
    TotalTeamsRule,
};

/// Solver variable of every player in the run, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PlayerVariables {
    entries: Vec<(Player, Variable)>,
    by_variable: HashMap<Variable, usize>,
}

impl PlayerVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, player: Player, variable: Variable) {
        self.by_variable.insert(variable, self.entries.len());
        self.entries.push((player, variable));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Player, Variable)> {
        self.entries.iter().map(|(player, variable)| (player, *variable))
    }

    pub fn player(&self, variable: Variable) -> Option<&Player> {
        self.by_variable.get(&variable).map(|&i| &self.entries[i].0)
    }

    pub fn variable(&self, player: &Player) -> Option<Variable> {
        self.entries
            .iter()
            .find(|(p, _)| p == player)
            .map(|(_, variable)| *variable)
    }

    /// Variables of players matching `predicate`.
    pub fn select(&self, predicate: impl Fn(&Player) -> bool) -> Vec<Variable> {
        self.iter()
            .filter(|(player, _)| predicate(player))
            .map(|(_, variable)| variable)
            .collect()
    }

    /// Variables grouped by team, teams sorted.
    pub fn by_team(&self) -> BTreeMap<&str, Vec<(&Player, Variable)>> {
        let mut teams: BTreeMap<&str, Vec<(&Player, Variable)>> = BTreeMap::new();
        for (player, variable) in self.iter() {
            teams.entry(player.team.as_str()).or_default().push((player, variable));
        }
        teams
    }

    /// Distinct games of the players, in first-seen order.
    pub fn games(&self) -> Vec<&GameInfo> {
        let mut games: Vec<&GameInfo> = Vec::new();
        for game in self.entries.iter().filter_map(|(p, _)| p.game_info.as_ref()) {
            if !games.contains(&game) {
                games.push(game);
            }
        }
        games
    }

    /// Selected player records among `selected`.
    pub fn selected<'a>(&'a self, selected: &'a [Variable]) -> impl Iterator<Item = &'a Player> {
        selected.iter().filter_map(|v| self.player(*v))
    }
}

/// What a rule sees while contributing constraints.
pub struct RuleEnv<'a> {
    pub players: &'a PlayerVariables,
    pub context: &'a mut OptimizationContext,
}

pub trait OptimizerRule {
    fn apply<S: Solver>(&mut self, _solver: &mut S, _env: &mut RuleEnv<'_>) -> Result<()> {
        Ok(())
    }

    fn apply_for_iteration<S: Solver>(
        &mut self,
        _solver: &mut S,
        _env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        Ok(())
    }

    fn post_optimize(&mut self, _selected: &[Variable], _env: &mut RuleEnv<'_>) {}
}

macro_rules! rule_set {
    ($($variant:ident($rule:ty)),* $(,)?) => {
        /// Every rule the engine knows about.
        #[derive(Debug)]
        pub enum Rule {
            $($variant($rule)),*
        }

        impl Rule {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Rule::$variant(_) => stringify!($variant)),*
                }
            }
        }

        impl OptimizerRule for Rule {
            fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
                match self {
                    $(Rule::$variant(rule) => rule.apply(solver, env)),*
                }
            }

            fn apply_for_iteration<S: Solver>(
                &mut self,
                solver: &mut S,
                env: &mut RuleEnv<'_>,
                previous: Option<&Lineup>,
            ) -> Result<()> {
                match self {
                    $(Rule::$variant(rule) => rule.apply_for_iteration(solver, env, previous)),*
                }
            }

            fn post_optimize(&mut self, selected: &[Variable], env: &mut RuleEnv<'_>) {
                match self {
                    $(Rule::$variant(rule) => rule.post_optimize(selected, env)),*
                }
            }
        }

        $(
            impl From<$rule> for Rule {
                fn from(rule: $rule) -> Self {
                    Rule::$variant(rule)
                }
            }
        )*
    };
}

rule_set! {
    LateSwap(LateSwapRule),
    Objective(ObjectiveRule),
    TotalPlayers(TotalPlayersRule),
    Positions(PositionsRule),
    Budget(BudgetRule),
    LockedPlayers(LockedPlayersRule),
    UniqueLineup(UniqueLineupRule),
    UniquePlayer(UniquePlayerRule),
    MaxFromOneTeam(MaxFromOneTeamRule),
    TeamQuota(TeamQuotaRule),
    MaxFromOneTeamExcludingPositions(MaxFromOneTeamExcludingPositionsRule),
    OnePlayerPerPosition(OnePlayerPerPositionRule),
    MinSalaryCap(MinSalaryCapRule),
    ProjectedOwnership(ProjectedOwnershipRule),
    MinExposure(MinExposureRule),
    TeamExposure(TeamExposureRule),
    RestrictPositionsForOpposingTeam(RestrictPositionsForOpposingTeamRule),
    ForcePositionsForOpposingTeam(ForcePositionsForOpposingTeamRule),
    RestrictPositionsForSameTeam(RestrictPositionsForSameTeamRule),
    RosterSpacing(RosterSpacingRule),
    MinStarters(MinStartersRule),
    MinGames(MinGamesRule),
    TotalTeams(TotalTeamsRule),
    GenericStacks(GenericStacksRule),
}

/// Binary indicator that is 1 exactly when any of `variables` is selected.
pub(crate) fn add_indicator<S: Solver>(
    solver: &mut S,
    name: &str,
    variables: &[Variable],
) -> Result<Variable> {
    let indicator = solver.add_variable(name, None, None)?;
    let size = variables.len() as f64;

    // indicator <= sum(variables)
    let mut lower: Vec<Variable> = variables.to_vec();
    lower.push(indicator);
    let mut coefficients = vec![1.0; variables.len()];
    coefficients.push(-1.0);
    solver.add_constraint(&lower, Some(&coefficients), Sign::Gte, 0.0, None);

    // sum(variables) <= size * indicator
    let last = coefficients.len() - 1;
    coefficients[last] = -size;
    solver.add_constraint(&lower, Some(&coefficients), Sign::Lte, 0.0, None);
    Ok(indicator)
}
