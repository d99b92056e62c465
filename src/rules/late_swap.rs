use std::collections::{BTreeSet, VecDeque};

use super::{OptimizerRule, RuleEnv};
use crate::error::{OptimizerError, Result};
use crate::models::{GameClock, Lineup, LineupPlayer, LineupPosition};
use crate::positions::{positions_for_optimizer, remaining_positions, PositionCombination};
use crate::solver::{Sign, Solver, Variable};

/// Re-optimizes entered lineups one per iteration.
///
/// Players whose game has started stay in their slot; every other started
/// player is excluded, and the open slots are refilled from players whose
/// games are still ahead.
#[derive(Debug)]
pub struct LateSwapRule {
    lineups: VecDeque<Lineup>,
    slots: Vec<LineupPosition>,
    multi_positions: BTreeSet<PositionCombination>,
    clock: GameClock,
}

impl LateSwapRule {
    pub fn new(
        lineups: Vec<Lineup>,
        slots: Vec<LineupPosition>,
        multi_positions: BTreeSet<PositionCombination>,
        clock: GameClock,
    ) -> Self {
        Self {
            lineups: lineups.into(),
            slots,
            multi_positions,
            clock,
        }
    }
}

impl OptimizerRule for LateSwapRule {
    fn apply_for_iteration<S: Solver>(
        &mut self,
        solver: &mut S,
        env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        let Some(current) = self.lineups.pop_front() else {
            return Ok(());
        };
        let unswappable: Vec<LineupPlayer> = current
            .iter()
            .filter(|lp| lp.player.is_game_started(&self.clock))
            .cloned()
            .collect();

        for lineup_player in &unswappable {
            let variable = env.players.variable(&lineup_player.player).ok_or_else(|| {
                OptimizerError::PlayerNotFound {
                    name: lineup_player.player.name.clone(),
                }
            })?;
            let name = format!("unswappable_{}", lineup_player.player.key());
            solver.add_constraint(&[variable], None, Sign::Eq, 1.0, Some(&name));
        }

        let clock = self.clock;
        let started_elsewhere: Vec<Variable> = env.players.select(|p| {
            p.is_game_started(&clock) && !unswappable.iter().any(|lp| &lp.player == p)
        });
        solver.add_constraint(&started_elsewhere, None, Sign::Eq, 0.0, Some("started_players"));

        let open = remaining_positions(
            &self.slots,
            unswappable.iter().map(|lp| lp.lineup_position.as_str()),
        );
        let free: Vec<Variable> = env.players.select(|p| !p.is_game_started(&clock));
        solver.add_constraint(&free, None, Sign::Eq, open.len() as f64, Some("total_players"));

        for (combination, count) in positions_for_optimizer(&open, &self.multi_positions) {
            let variables = env
                .players
                .select(|p| !p.is_game_started(&clock) && p.is_eligible_for(&combination));
            let name = format!("positions_{}", combination.join("_"));
            solver.add_constraint(&variables, None, Sign::Gte, count as f64, Some(&name));
        }

        env.context.unswappable = unswappable;
        Ok(())
    }
}
