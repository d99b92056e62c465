//! Run orchestration: the per-run rule set and the lazy solve loop.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{LineupOptimizer, OptimizationContext, OptimizeOptions};
use crate::assembly::build_lineup;
use crate::config::SiteRule;
use crate::error::{OptimizerError, Result};
use crate::exposure::ExposureTracker;
use crate::fantasy_points::PointsCalculator;
use crate::models::{GameClock, Lineup, LineupPlayer, LineupPosition, Player};
use crate::pool::LockedPlayer;
use crate::positions::{multi_position_combinations, positions_for_optimizer};
use crate::rules::{
    BudgetRule, ForcePositionsForOpposingTeamRule, GenericStacksRule, LateSwapRule,
    LockedPlayersRule, MaxFromOneTeamExcludingPositionsRule, MaxFromOneTeamRule, MinExposureRule,
    MinGamesRule, MinSalaryCapRule, MinStartersRule, ObjectiveRule, OnePlayerPerPositionRule,
    OptimizerRule, PlayerVariables, PositionsRule, ProjectedOwnershipRule,
    RestrictPositionsForOpposingTeamRule, RestrictPositionsForSameTeamRule, RosterSpacingRule,
    Rule, RuleEnv, TeamExposureRule, TeamQuotaRule, TotalPlayersRule, TotalTeamsRule,
    UniqueLineupRule, UniquePlayerRule,
};
use crate::solver::{Solver, Variable};
use crate::stacks::Stack;

/// Entered lineups to re-optimize and the clock deciding started games.
struct LateSwap {
    lineups: Vec<Lineup>,
    clock: GameClock,
}

impl<S: Solver> LineupOptimizer<S> {
    /// Generate up to `n` lineups lazily.
    ///
    /// Each call to `next` on the returned iterator performs one solve. A
    /// failed solve yields [`OptimizerError::GenerateLineup`] and ends the
    /// sequence. When every slot is hand-locked only one lineup is produced.
    pub fn optimize(&mut self, n: usize, options: OptimizeOptions) -> Result<LineupIterator<'_, S>> {
        self.start_run(n, options, None)
    }

    /// Late swap: re-optimize entered lineups, one output per input.
    ///
    /// Players whose games have started keep their slot; every other slot
    /// is refilled from players whose games are still ahead.
    pub fn optimize_lineups(
        &mut self,
        lineups: Vec<Lineup>,
        options: OptimizeOptions,
    ) -> Result<LineupIterator<'_, S>> {
        let clock = match self.clock {
            Some(clock) => clock,
            None => GameClock::system(self.settings.timezone()?),
        };
        let n = lineups.len();
        self.start_run(n, options, Some(LateSwap { lineups, clock }))
    }

    fn start_run(
        &mut self,
        n: usize,
        options: OptimizeOptions,
        late_swap: Option<LateSwap>,
    ) -> Result<LineupIterator<'_, S>> {
        let entered = late_swap.as_ref().map(|swap| swap.lineups.as_slice());
        let players = self.run_players(&options, entered)?;
        let is_late_swap = late_swap.is_some();

        let mut context = OptimizationContext::new(
            n,
            options.exposure_strategy,
            options.exclude_lineups.clone(),
        );
        let mut base = self.solver.copy();
        base.setup();
        let mut variables = PlayerVariables::new();
        for (i, player) in players.into_iter().enumerate() {
            let variable = base.add_variable(&format!("Player_{i}_{}", player.key()), None, None)?;
            variables.push(player, variable);
        }

        let mut rules = {
            let env = RuleEnv {
                players: &variables,
                context: &mut context,
            };
            self.build_rules(&env, late_swap)?
        };
        {
            let mut env = RuleEnv {
                players: &variables,
                context: &mut context,
            };
            for rule in &mut rules {
                rule.apply(&mut base, &mut env)?;
                debug!(rule = rule.name(), "applied rule");
            }
        }

        let slots = self.settings.positions.clone();
        let all_locked = !is_late_swap
            && !slots.is_empty()
            && !self.player_pool.locked_players().is_empty()
            && self.player_pool.remaining_positions().is_empty();
        let limit = if all_locked {
            info!("every slot is locked, generating a single lineup");
            n.min(1)
        } else {
            n
        };
        info!(
            lineups = n,
            players = variables.len(),
            rules = rules.len(),
            late_swap = is_late_swap,
            "starting optimization"
        );

        let slot_locks: Vec<LockedPlayer> = self
            .player_pool
            .locked_players()
            .iter()
            .filter(|lock| lock.slot.is_some())
            .cloned()
            .collect();
        Ok(LineupIterator {
            base,
            variables,
            rules,
            context: self.last_context.insert(context),
            slots,
            slot_locks,
            limit,
            done: false,
        })
    }

    /// Players entering the model: the filtered pool, plus entered lineup
    /// players the filters dropped, with the default max exposure applied.
    fn run_players(&self, options: &OptimizeOptions, entered: Option<&[Lineup]>) -> Result<Vec<Player>> {
        if let Some(max_exposure) = options.max_exposure {
            if !(0.0..=1.0).contains(&max_exposure) {
                return Err(OptimizerError::InvalidExposure {
                    name: "max exposure".to_string(),
                    message: format!("{max_exposure} is outside 0..1"),
                });
            }
        }
        let mut players = self.player_pool.filtered_players(options.with_injured);
        for lineup in entered.unwrap_or_default() {
            for lineup_player in lineup.iter() {
                let known = self.player_pool.all_players().contains(&lineup_player.player);
                if known && !players.contains(&lineup_player.player) {
                    players.push(lineup_player.player.clone());
                }
            }
        }
        if let Some(max_exposure) = options.max_exposure {
            for player in players.iter_mut().filter(|p| p.max_exposure.is_none()) {
                player.max_exposure = Some(max_exposure);
            }
        }
        if players.is_empty() {
            return Err(OptimizerError::config("no players to optimize"));
        }
        Ok(players)
    }

    /// The active rules of one run, in application order.
    ///
    /// Late swap comes first so the players it keeps are known before the
    /// exposure gate runs.
    fn build_rules(&self, env: &RuleEnv<'_>, late_swap: Option<LateSwap>) -> Result<Vec<Rule>> {
        let total_lineups = env.context.total_lineups;
        let kind = env.context.exposure_strategy;
        let players: Vec<Player> = env.players.iter().map(|(p, _)| p.clone()).collect();
        let multi_positions = multi_position_combinations(&players);
        let slots = &self.settings.positions;
        let positions = positions_for_optimizer(slots, &multi_positions);
        let constraints = &self.constraints;
        let is_late_swap = late_swap.is_some();

        let mut rules: Vec<Rule> = Vec::new();
        if let Some(LateSwap { lineups, clock }) = late_swap {
            rules.push(LateSwapRule::new(lineups, slots.clone(), multi_positions.clone(), clock).into());
        }
        let limits: HashMap<String, f64> = players
            .iter()
            .filter_map(|p| p.max_exposure.map(|max| (p.key(), max)))
            .collect();
        let tracker = ExposureTracker::new(kind, total_lineups, limits);

        let calculator = PointsCalculator::new(self.fantasy_points_strategy.clone(), self.seed);
        rules.push(ObjectiveRule::new(calculator).into());
        if !is_late_swap {
            rules.push(TotalPlayersRule::new(self.total_players()).into());
            rules.push(
                PositionsRule::new(
                    positions.clone(),
                    constraints.players_with_same_position.clone(),
                )
                .with_slot_locks(
                    slots.clone(),
                    multi_positions.clone(),
                    self.player_pool.locked_players(),
                    tracker.clone(),
                )
                .into(),
            );
        }
        if let Some(budget) = self.settings.budget {
            rules.push(BudgetRule::new(budget).into());
        }

        let locked: Vec<Player> = self
            .player_pool
            .locked_players()
            .iter()
            .map(|lock| lock.player.clone())
            .collect();
        rules.push(LockedPlayersRule::new(locked, tracker).into());

        if !is_late_swap {
            let max_repeating = constraints.max_repeating_players;
            rules.push(UniqueLineupRule::new(max_repeating, &env.context.exclude_lineups, env).into());
        }
        let mut names = HashSet::new();
        if !players.iter().all(|p| names.insert(p.name.as_str())) {
            rules.push(UniquePlayerRule.into());
        }
        if let Some(max) = self.settings.max_from_one_team {
            rules.push(MaxFromOneTeamRule::new(max).into());
        }
        if !constraints.players_from_one_team.is_empty() {
            rules.push(TeamQuotaRule::new(constraints.players_from_one_team.clone()).into());
        }
        if let Some(min_salary) = constraints.min_salary_cap {
            rules.push(MinSalaryCapRule::new(min_salary).into());
        }
        if constraints.min_projected_ownership.is_some() || constraints.max_projected_ownership.is_some() {
            rules.push(
                ProjectedOwnershipRule::new(
                    constraints.min_projected_ownership,
                    constraints.max_projected_ownership,
                )
                .into(),
            );
        }
        if !is_late_swap {
            let min_exposure = MinExposureRule::new(env, total_lineups, positions.keys().cloned());
            if !min_exposure.is_empty() {
                rules.push(min_exposure.into());
            }
        }

        for (i, restriction) in constraints.opposing_restrictions.iter().enumerate() {
            rules.push(
                RestrictPositionsForOpposingTeamRule::new(
                    i,
                    restriction.first.clone(),
                    restriction.second.clone(),
                    restriction.max_allowed,
                )
                .into(),
            );
        }
        if !constraints.opposing_forces.is_empty() {
            rules.push(ForcePositionsForOpposingTeamRule::new(constraints.opposing_forces.clone()).into());
        }
        if !constraints.same_team_restrictions.is_empty() {
            rules.push(
                RestrictPositionsForSameTeamRule::new(constraints.same_team_restrictions.clone()).into(),
            );
        }
        if let Some((positions, spacing)) = &constraints.spacing {
            rules.push(RosterSpacingRule::new(positions.clone(), *spacing).into());
        }
        if let Some(min) = constraints.min_starters {
            rules.push(MinStartersRule::new(min).into());
        }
        if let Some(min) = constraints.min_games.or(self.settings.min_games) {
            rules.push(MinGamesRule::new(min).into());
        }
        let min_teams = constraints.min_teams.or(self.settings.min_teams);
        if min_teams.is_some() || constraints.max_teams.is_some() {
            rules.push(
                TotalTeamsRule::new(
                    min_teams,
                    constraints.max_teams,
                    self.settings.total_teams_exclude_positions.clone(),
                )
                .into(),
            );
        }
        if !constraints.team_min_exposures.is_empty() || !constraints.team_max_exposures.is_empty() {
            let tracker =
                ExposureTracker::new(kind, total_lineups, constraints.team_max_exposures.clone());
            rules.push(
                TeamExposureRule::new(tracker, &constraints.team_min_exposures, total_lineups).into(),
            );
        }

        let stacks = self
            .stacks
            .iter()
            .map(|spec| spec.build(&players))
            .collect::<Result<Vec<Stack>>>()?;
        if !stacks.is_empty() {
            rules.push(GenericStacksRule::new(stacks, kind, total_lineups).into());
        }

        for site_rule in &self.settings.extra_rules {
            let rule: Rule = match site_rule {
                SiteRule::MaxFromOneTeamExcludingPositions {
                    max,
                    excluded_positions,
                } => MaxFromOneTeamExcludingPositionsRule::new(*max, excluded_positions.clone()).into(),
                SiteRule::OnePlayerPerPosition => OnePlayerPerPositionRule.into(),
            };
            rules.push(rule);
        }
        Ok(rules)
    }
}

/// Lazily generated lineups of one run.
///
/// Borrows the optimizer until dropped; the run's context stays available
/// afterwards through [`LineupOptimizer::last_context`].
pub struct LineupIterator<'a, S: Solver> {
    base: S,
    variables: PlayerVariables,
    rules: Vec<Rule>,
    context: &'a mut OptimizationContext,
    slots: Vec<LineupPosition>,
    slot_locks: Vec<LockedPlayer>,
    limit: usize,
    done: bool,
}

impl<S: Solver> LineupIterator<'_, S> {
    pub fn context(&self) -> &OptimizationContext {
        &*self.context
    }

    fn next_lineup(&mut self) -> Result<Lineup> {
        let requested = self.context.total_lineups;
        self.context.start_iteration();
        let previous = self.context.lineups.last().cloned();
        let mut solver = self.base.copy();
        let mut env = RuleEnv {
            players: &self.variables,
            context: &mut *self.context,
        };
        for rule in &mut self.rules {
            rule.apply_for_iteration(&mut solver, &mut env, previous.as_ref())?;
        }

        let started = Instant::now();
        let selected = solver
            .solve()
            .map_err(|source| OptimizerError::GenerateLineup {
                generated: env.context.generated(),
                requested,
                source,
            })?;
        let lineup = assemble(&self.variables, &selected, &*env.context, &self.slots, &self.slot_locks)?;
        debug!(
            iteration = env.context.generated() + 1,
            elapsed_ms = started.elapsed().as_millis() as u64,
            points = lineup.actual_fantasy_points_projection(),
            salary = lineup.salary_costs(),
            "generated lineup"
        );

        for rule in &mut self.rules {
            rule.post_optimize(&selected, &mut env);
        }
        env.context.add_lineup(lineup.clone());
        Ok(lineup)
    }
}

impl<S: Solver> Iterator for LineupIterator<'_, S> {
    type Item = Result<Lineup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.context.generated() >= self.limit {
            return None;
        }
        match self.next_lineup() {
            Ok(lineup) => Some(Ok(lineup)),
            Err(err) => {
                warn!(error = %err, "lineup generation stopped");
                self.done = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        (0, Some(self.limit.saturating_sub(self.context.generated())))
    }
}

/// Map solved variables back to a lineup. Players kept by late swap and
/// players locked into a named slot keep their slot.
fn assemble(
    variables: &PlayerVariables,
    selected: &[Variable],
    context: &OptimizationContext,
    slots: &[LineupPosition],
    slot_locks: &[LockedPlayer],
) -> Result<Lineup> {
    let chosen: Vec<&Player> = variables.selected(selected).collect();
    let mut fixed: Vec<LineupPlayer> = context.unswappable.clone();
    for lock in slot_locks {
        let Some(slot) = &lock.slot else { continue };
        let placed = fixed.iter().any(|lp| lp.player == lock.player);
        if !placed && chosen.contains(&&lock.player) {
            fixed.push(LineupPlayer::new(lock.player.clone(), slot, used_points(context, &lock.player)));
        }
    }
    let rest: Vec<(Player, f64)> = chosen
        .into_iter()
        .filter(|p| !fixed.iter().any(|lp| &lp.player == *p))
        .map(|p| (p.clone(), used_points(context, p)))
        .collect();
    build_lineup(rest, slots, fixed)
}

fn used_points(context: &OptimizationContext, player: &Player) -> f64 {
    context
        .players_used_fppg
        .get(&player.key())
        .copied()
        .unwrap_or(player.fppg)
}
