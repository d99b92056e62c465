//! Unit tests for the constraint rules, solved against the good_lp backend

use super::*;
use crate::exposure::{ExposureStrategyKind, ExposureTracker};
use crate::models::{GameClock, GameInfo, LineupPlayer, LineupPosition};
use crate::solver::GoodLpSolver;
use chrono::{FixedOffset, Utc};
use std::collections::HashMap;

fn player(id: &str, positions: &[&str], team: &str, salary: f64, fppg: f64) -> Player {
    Player::new(id, &format!("Player {id}"), positions, team, salary, fppg)
}

/// Base model with one binary per player and fppg as the objective.
struct Model {
    solver: GoodLpSolver,
    players: PlayerVariables,
    context: OptimizationContext,
}

impl Model {
    fn new(players: &[Player]) -> Self {
        let mut solver = GoodLpSolver::new();
        let mut variables = PlayerVariables::new();
        for (i, p) in players.iter().enumerate() {
            let v = solver.add_variable(&format!("p_{i}"), None, None).unwrap();
            variables.push(p.clone(), v);
        }
        let (vars, points): (Vec<Variable>, Vec<f64>) =
            variables.iter().map(|(p, v)| (v, p.fppg)).unzip();
        solver.set_objective(&vars, &points);
        Self {
            solver,
            players: variables,
            context: OptimizationContext::new(1, ExposureStrategyKind::Total, Vec::new()),
        }
    }

    fn env(&mut self) -> (&mut GoodLpSolver, RuleEnv<'_>) {
        (
            &mut self.solver,
            RuleEnv {
                players: &self.players,
                context: &mut self.context,
            },
        )
    }

    fn apply(&mut self, rule: &mut impl OptimizerRule) {
        let (solver, mut env) = self.env();
        rule.apply(solver, &mut env).unwrap();
    }

    /// One engine iteration; returns the sorted ids of the selected players.
    fn iterate(&mut self, rule: &mut impl OptimizerRule) -> Vec<String> {
        self.context.start_iteration();
        let mut solver = self.solver.copy();
        let mut env = RuleEnv {
            players: &self.players,
            context: &mut self.context,
        };
        rule.apply_for_iteration(&mut solver, &mut env, None).unwrap();
        let selected = solver.solve().unwrap();
        rule.post_optimize(&selected, &mut env);
        ids(&self.players, &selected)
    }

    fn solve(&self) -> Vec<String> {
        ids(&self.players, &self.solver.solve().unwrap())
    }
}

fn ids(players: &PlayerVariables, selected: &[Variable]) -> Vec<String> {
    let mut ids: Vec<String> = players.selected(selected).map(|p| p.id.clone()).collect();
    ids.sort();
    ids
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod basic_tests {
    use super::*;

    #[test]
    fn test_total_players_and_budget() {
        let players = vec![
            player("1", &["PG"], "BOS", 5000.0, 30.0),
            player("2", &["PG"], "BOS", 4000.0, 25.0),
            player("3", &["PG"], "NYK", 2000.0, 20.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut BudgetRule::new(7000.0));
        assert_eq!(model.solve(), vec!["1", "3"]);
    }

    #[test]
    fn test_zero_budget_is_ignored() {
        let players = vec![
            player("1", &["PG"], "BOS", 5000.0, 30.0),
            player("2", &["PG"], "BOS", 4000.0, 25.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut BudgetRule::new(0.0));
        assert_eq!(model.solve(), vec!["1", "2"]);
    }

    #[test]
    fn test_min_salary_cap() {
        let players = vec![
            player("1", &["PG"], "BOS", 1000.0, 30.0),
            player("2", &["PG"], "BOS", 9000.0, 5.0),
            player("3", &["PG"], "NYK", 2000.0, 20.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut MinSalaryCapRule::new(9500.0));
        assert_eq!(model.solve(), vec!["1", "2"]);
    }

    #[test]
    fn test_positions_cover_overlapping_slots() {
        // PG, SG and G (PG/SG): three guards needed, at least one SG
        let players = vec![
            player("1", &["PG"], "BOS", 1.0, 40.0),
            player("2", &["PG"], "BOS", 1.0, 39.0),
            player("3", &["PG"], "NYK", 1.0, 38.0),
            player("4", &["SG"], "NYK", 1.0, 5.0),
            player("5", &["C"], "NYK", 1.0, 50.0),
        ];
        let required = BTreeMap::from([
            (strings(&["PG"]), 1),
            (strings(&["SG"]), 1),
            (strings(&["PG", "SG"]), 3),
        ]);
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(3));
        model.apply(&mut PositionsRule::new(required, HashMap::new()));
        assert_eq!(model.solve(), vec!["1", "2", "4"]);
    }

    #[test]
    fn test_positions_extra_allowance() {
        let players = vec![
            player("1", &["PG"], "BOS", 1.0, 1.0),
            player("2", &["PG"], "BOS", 1.0, 2.0),
            player("3", &["C"], "NYK", 1.0, 50.0),
        ];
        let required = BTreeMap::from([(strings(&["PG"]), 1)]);
        let extra = HashMap::from([("PG".to_string(), 1)]);
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut PositionsRule::new(required, extra));
        assert_eq!(model.solve(), vec!["1", "2"]);
    }

    #[test]
    fn test_slot_lock_removes_its_slot_from_covering() {
        use crate::pool::LockedPlayer;
        use crate::positions::positions_for_optimizer;
        use std::collections::BTreeSet;

        let slots = vec![
            LineupPosition::new("PG", &["PG"]),
            LineupPosition::new("SG", &["SG"]),
            LineupPosition::new("G", &["PG", "SG"]),
        ];
        let players = vec![
            player("x", &["PG"], "BOS", 1.0, 5.0),
            player("s1", &["SG"], "BOS", 1.0, 10.0),
            player("s2", &["SG"], "NYK", 1.0, 9.0),
            player("p2", &["PG"], "NYK", 1.0, 1.0),
        ];
        let lock = LockedPlayer {
            player: players[0].clone(),
            slot: Some("G".to_string()),
        };
        let limits = HashMap::from([(players[0].key(), 0.5)]);
        let tracker = ExposureTracker::new(ExposureStrategyKind::Total, 2, limits);
        let required = positions_for_optimizer(&slots, &BTreeSet::new());
        let mut rule = PositionsRule::new(required, HashMap::new()).with_slot_locks(
            slots,
            BTreeSet::new(),
            &[lock],
            tracker,
        );

        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(3));
        model.apply(&mut rule);
        // x sits in G, so the PG slot needs another point guard
        assert_eq!(model.iterate(&mut rule), vec!["p2", "s1", "x"]);
        // exposure reached: the lock lapses and G is open again
        assert_eq!(model.iterate(&mut rule), vec!["s1", "s2", "x"]);
    }

    #[test]
    fn test_max_from_one_team() {
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "BOS", 1.0, 29.0),
            player("3", &["F"], "BOS", 1.0, 28.0),
            player("4", &["F"], "NYK", 1.0, 1.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(3));
        model.apply(&mut MaxFromOneTeamRule::new(2));
        assert_eq!(model.solve(), vec!["1", "2", "4"]);
    }

    #[test]
    fn test_team_quota_is_exact() {
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "BOS", 1.0, 29.0),
            player("3", &["F"], "NYK", 1.0, 5.0),
            player("4", &["F"], "NYK", 1.0, 4.0),
        ];
        let quotas = BTreeMap::from([("NYK".to_string(), 2)]);
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(3));
        model.apply(&mut TeamQuotaRule::new(quotas));
        assert_eq!(model.solve(), vec!["1", "3", "4"]);
    }

    #[test]
    fn test_hitters_cap_ignores_pitchers() {
        let players = vec![
            player("1", &["P"], "BOS", 1.0, 30.0),
            player("2", &["OF"], "BOS", 1.0, 29.0),
            player("3", &["OF"], "BOS", 1.0, 28.0),
            player("4", &["OF"], "NYK", 1.0, 1.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(3));
        model.apply(&mut MaxFromOneTeamExcludingPositionsRule::new(1, strings(&["P"])));
        assert_eq!(model.solve(), vec!["1", "2", "4"]);
    }

    #[test]
    fn test_one_player_per_position() {
        let players = vec![
            player("1", &["T1"], "BOS", 1.0, 30.0),
            player("2", &["T1"], "BOS", 1.0, 29.0),
            player("3", &["T2"], "NYK", 1.0, 5.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut OnePlayerPerPositionRule);
        assert_eq!(model.solve(), vec!["1", "3"]);
    }

    #[test]
    fn test_unique_player_blocks_variants() {
        let base = player("1", &["PG"], "BOS", 1.0, 30.0);
        let mvp = base.variant("MVP", 1.5, 1.0);
        let players = vec![base, mvp, player("2", &["PG"], "NYK", 1.0, 10.0)];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut UniquePlayerRule);
        let selected = model.solve();
        assert_eq!(selected, vec!["1", "2"]);
    }

    #[test]
    fn test_projected_ownership_band() {
        let players = vec![
            player("1", &["G"], "A", 1.0, 50.0).ownership(0.9),
            player("2", &["G"], "B", 1.0, 10.0).ownership(0.5),
            player("3", &["G"], "C", 1.0, 9.0).ownership(0.5),
            player("4", &["G"], "D", 1.0, 40.0).ownership(0.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut ProjectedOwnershipRule::new(Some(0.49), Some(0.51)));
        assert_eq!(model.solve(), vec!["2", "3"]);
    }
}

#[cfg(test)]
mod exposure_tests {
    use super::*;

    fn pool() -> Vec<Player> {
        vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "BOS", 1.0, 20.0),
            player("3", &["F"], "NYK", 1.0, 10.0),
            player("4", &["F"], "NYK", 1.0, 5.0),
        ]
    }

    #[test]
    fn test_locked_player_forced_in() {
        let players = pool();
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        let tracker = ExposureTracker::new(ExposureStrategyKind::Total, 1, HashMap::new());
        let mut rule = LockedPlayersRule::new(vec![players[3].clone()], tracker);
        assert_eq!(model.iterate(&mut rule), vec!["1", "4"]);
    }

    #[test]
    fn test_max_exposure_excludes_player() {
        let players = pool();
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        let limits = HashMap::from([(players[0].key(), 0.5)]);
        let tracker = ExposureTracker::new(ExposureStrategyKind::Total, 2, limits);
        let mut rule = LockedPlayersRule::new(Vec::new(), tracker);
        assert_eq!(model.iterate(&mut rule), vec!["1", "2"]);
        assert_eq!(model.iterate(&mut rule), vec!["2", "3"]);
    }

    #[test]
    fn test_unswappable_players_skip_exposure_gate() {
        let players = pool();
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        let limits = HashMap::from([(players[0].key(), 0.0)]);
        let tracker = ExposureTracker::new(ExposureStrategyKind::Total, 1, limits);
        let mut rule = LockedPlayersRule::new(Vec::new(), tracker);

        model.context.unswappable = vec![LineupPlayer::new(players[0].clone(), "F", 30.0)];
        let mut solver = model.solver.copy();
        let mut env = RuleEnv {
            players: &model.players,
            context: &mut model.context,
        };
        rule.apply_for_iteration(&mut solver, &mut env, None).unwrap();
        let selected = solver.solve().unwrap();
        assert_eq!(ids(&model.players, &selected), vec!["1", "2"]);
    }

    #[test]
    fn test_unique_lineup_changes_every_iteration() {
        let players = pool();
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        let mut rule = {
            let (_, env) = model.env();
            UniqueLineupRule::new(None, &[], &env)
        };
        let first = model.iterate(&mut rule);
        let second = model.iterate(&mut rule);
        let third = model.iterate(&mut rule);
        assert_eq!(first, vec!["1", "2"]);
        assert_eq!(second, vec!["1", "3"]);
        assert_eq!(third, vec!["1", "4"]);
    }

    #[test]
    fn test_max_repeating_players_caps_overlap() {
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "BOS", 1.0, 29.0),
            player("3", &["F"], "NYK", 1.0, 28.0),
            player("4", &["F"], "NYK", 1.0, 5.0),
            player("5", &["F"], "NYK", 1.0, 4.0),
            player("6", &["F"], "NYK", 1.0, 3.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(3));
        let mut rule = {
            let (_, env) = model.env();
            UniqueLineupRule::new(Some(1), &[], &env)
        };
        let first = model.iterate(&mut rule);
        let second = model.iterate(&mut rule);
        let overlap = first.iter().filter(|id| second.contains(id)).count();
        assert_eq!(first, vec!["1", "2", "3"]);
        assert!(overlap <= 1);
    }

    #[test]
    fn test_excluded_lineups_seed_uniqueness() {
        let players = pool();
        let excluded = Lineup::new(vec![
            LineupPlayer::new(players[0].clone(), "F", 30.0),
            LineupPlayer::new(players[1].clone(), "F", 20.0),
        ]);
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        let mut rule = {
            let (_, env) = model.env();
            UniqueLineupRule::new(None, &[excluded], &env)
        };
        assert_eq!(model.iterate(&mut rule), vec!["1", "3"]);
    }

    #[test]
    fn test_min_exposure_schedules_player() {
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "BOS", 1.0, 20.0),
            player("3", &["F"], "NYK", 1.0, 1.0).exposure(Some(1.0), None),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        let mut rule = {
            let (_, env) = model.env();
            MinExposureRule::new(&env, 2, vec![strings(&["F"])])
        };
        assert!(!rule.is_empty());
        assert_eq!(model.iterate(&mut rule), vec!["1", "3"]);
        assert_eq!(model.iterate(&mut rule), vec!["1", "3"]);
    }

    #[test]
    fn test_min_exposure_spreads_need() {
        // two players each need one of two lineups; one lineup can't hold both
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "NYK", 1.0, 1.0).exposure(Some(0.5), None),
            player("3", &["F"], "NYK", 1.0, 1.0).exposure(Some(0.5), None),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(1));
        let mut rule = {
            let (_, env) = model.env();
            MinExposureRule::new(&env, 2, vec![strings(&["F"])])
        };
        let first = model.iterate(&mut rule);
        let second = model.iterate(&mut rule);
        assert_ne!(first, vec!["1"]);
        assert_ne!(second, vec!["1"]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_team_exposure_limits_team() {
        let players = pool();
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        let limits = HashMap::from([("BOS".to_string(), 0.5)]);
        let tracker = ExposureTracker::new(ExposureStrategyKind::Total, 2, limits);
        let mut rule = TeamExposureRule::new(tracker, &BTreeMap::new(), 2);
        assert_eq!(model.iterate(&mut rule), vec!["1", "2"]);
        assert_eq!(model.iterate(&mut rule), vec!["3", "4"]);
    }

    #[test]
    fn test_team_min_exposure_forces_team() {
        let players = pool();
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        let tracker = ExposureTracker::new(ExposureStrategyKind::Total, 1, HashMap::new());
        let mins = BTreeMap::from([("NYK".to_string(), 1.0)]);
        let mut rule = TeamExposureRule::new(tracker, &mins, 1);
        assert_eq!(model.iterate(&mut rule), vec!["1", "3"]);
    }
}

#[cfg(test)]
mod objective_tests {
    use super::*;
    use crate::fantasy_points::{FantasyPointsStrategy, PointsCalculator};

    #[test]
    fn test_static_objective_records_used_points() {
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "BOS", 1.0, 20.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(1));
        let calculator = PointsCalculator::new(FantasyPointsStrategy::Standard, None);
        let mut rule = ObjectiveRule::new(calculator);
        model.apply(&mut rule);
        assert_eq!(model.iterate(&mut rule), vec!["1"]);
        assert_eq!(model.context.players_used_fppg.get(&players[0].key()), Some(&30.0));
    }

    #[test]
    fn test_progressive_objective_rotates_players() {
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 10.0),
            player("2", &["F"], "BOS", 1.0, 10.5),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(1));
        // scale is negative so repeated use makes a player less attractive
        let strategy = FantasyPointsStrategy::Progressive { scale: -0.1 };
        let mut rule = ObjectiveRule::new(PointsCalculator::new(strategy, None));
        model.apply(&mut rule);
        assert_eq!(model.iterate(&mut rule), vec!["2"]);
        assert_eq!(model.iterate(&mut rule), vec!["1"]);
        let used = model.context.players_used_fppg[&players[1].key()];
        assert!((used - 9.45).abs() < 1e-9);
    }
}

#[cfg(test)]
mod team_rule_tests {
    use super::*;

    fn game() -> GameInfo {
        GameInfo::new("BOS", "NYK")
    }

    #[test]
    fn test_restrict_positions_for_opposing_team() {
        let players = vec![
            player("1", &["QB"], "BOS", 1.0, 30.0).game(game()),
            player("2", &["DST"], "NYK", 1.0, 20.0).game(game()),
            player("3", &["DST"], "BOS", 1.0, 5.0).game(game()),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut RestrictPositionsForOpposingTeamRule::new(
            0,
            strings(&["QB"]),
            strings(&["DST"]),
            0,
        ));
        assert_eq!(model.solve(), vec!["1", "3"]);
    }

    #[test]
    fn test_force_positions_for_opposing_team() {
        let players = vec![
            player("1", &["QB"], "BOS", 1.0, 30.0).game(game()),
            player("2", &["WR"], "BOS", 1.0, 20.0).game(game()),
            player("3", &["WR"], "NYK", 1.0, 5.0).game(game()),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut ForcePositionsForOpposingTeamRule::new(vec![(
            "QB".to_string(),
            "WR".to_string(),
        )]));
        assert_eq!(model.solve(), vec!["1", "3"]);
    }

    #[test]
    fn test_restrict_positions_for_same_team() {
        let players = vec![
            player("1", &["QB"], "BOS", 1.0, 30.0),
            player("2", &["RB"], "BOS", 1.0, 20.0),
            player("3", &["RB"], "NYK", 1.0, 5.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut RestrictPositionsForSameTeamRule::new(vec![(
            "QB".to_string(),
            "RB".to_string(),
        )]));
        assert_eq!(model.solve(), vec!["1", "3"]);
    }

    #[test]
    fn test_roster_spacing_forbids_close_orders() {
        let players = vec![
            player("1", &["P"], "BOS", 1.0, 30.0).roster_order(1),
            player("2", &["P"], "BOS", 1.0, 29.0).roster_order(2),
            player("3", &["P"], "BOS", 1.0, 10.0).roster_order(3),
            player("4", &["P"], "BOS", 1.0, 1.0).roster_order(5),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut RosterSpacingRule::new(strings(&["P"]), 2));
        assert_eq!(model.solve(), vec!["1", "3"]);
    }

    #[test]
    fn test_min_starters() {
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "BOS", 1.0, 20.0).confirmed_starter(false),
            player("3", &["F"], "NYK", 1.0, 5.0).confirmed_starter(true),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut MinStartersRule::new(1));
        assert_eq!(model.solve(), vec!["1", "3"]);
    }

    #[test]
    fn test_min_games() {
        let other = GameInfo::new("LAL", "MIA");
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0).game(game()),
            player("2", &["F"], "NYK", 1.0, 20.0).game(game()),
            player("3", &["F"], "LAL", 1.0, 5.0).game(other),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut MinGamesRule::new(2));
        assert_eq!(model.solve(), vec!["1", "3"]);
    }

    #[test]
    fn test_total_teams_bounds() {
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "NYK", 1.0, 29.0),
            player("3", &["F"], "LAL", 1.0, 28.0),
            player("4", &["F"], "BOS", 1.0, 1.0),
        ];
        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(3));
        model.apply(&mut TotalTeamsRule::new(None, Some(2), Vec::new()));
        let selected = model.solve();
        assert!(selected.contains(&"1".to_string()));
        assert!(selected.contains(&"4".to_string()));

        let mut model = Model::new(&players);
        model.apply(&mut TotalPlayersRule::new(2));
        model.apply(&mut TotalTeamsRule::new(Some(2), None, Vec::new()));
        assert_eq!(model.solve(), vec!["1", "2"]);
    }
}

#[cfg(test)]
mod stacking_tests {
    use super::*;
    use crate::stacks::{PlayersGroup, Stack, StackSpec, TeamStack};

    fn roster() -> Vec<Player> {
        vec![
            player("1", &["F"], "BOS", 1.0, 30.0),
            player("2", &["F"], "NYK", 1.0, 29.0),
            player("3", &["F"], "LAL", 1.0, 28.0),
            player("4", &["F"], "BOS", 1.0, 2.0),
            player("5", &["F"], "BOS", 1.0, 1.0),
        ]
    }

    fn stacked(players: &[Player], total: usize, stack: Stack, lineups: usize) -> (Model, GenericStacksRule) {
        let mut model = Model::new(players);
        model.apply(&mut TotalPlayersRule::new(total));
        let mut rule = GenericStacksRule::new(vec![stack], ExposureStrategyKind::Total, lineups);
        model.apply(&mut rule);
        (model, rule)
    }

    #[test]
    fn test_team_stack_takes_three_from_one_team() {
        let players = roster();
        let stack = StackSpec::from(TeamStack::new(3)).build(&players).unwrap();
        let (mut model, mut rule) = stacked(&players, 3, stack, 1);
        assert_eq!(model.iterate(&mut rule), vec!["1", "4", "5"]);
    }

    #[test]
    fn test_group_max_caps_selection() {
        let players = roster();
        let group = PlayersGroup::new("top", players[..3].to_vec(), Some(1), Some(1));
        let (mut model, mut rule) = stacked(&players, 3, Stack::new(vec![group.into()]), 1);
        assert_eq!(model.iterate(&mut rule), vec!["1", "4", "5"]);
    }

    #[test]
    fn test_group_exposure_blocks_after_cap() {
        let players = roster();
        let bos: Vec<Player> = players.iter().filter(|p| p.team == "BOS").cloned().collect();
        let group = PlayersGroup::new("bos", bos, Some(2), None).max_exposure(Some(0.5));
        let (mut model, mut rule) = stacked(&players, 2, Stack::new(vec![group.into()]), 2);
        assert_eq!(model.iterate(&mut rule), vec!["1", "4"]);
        // the group is capped, so its minimum can't fire and the stack has no
        // other group to satisfy it
        let mut solver = model.solver.copy();
        let mut env = RuleEnv {
            players: &model.players,
            context: &mut model.context,
        };
        rule.apply_for_iteration(&mut solver, &mut env, None).unwrap();
        let selected = solver.solve().unwrap();
        let bos = model
            .players
            .selected(&selected)
            .filter(|p| p.team == "BOS")
            .count();
        assert!(bos <= 1);
    }

    #[test]
    fn test_blocked_game_stack_keeps_its_players_available() {
        use crate::stacks::GameStack;

        let first = GameInfo::new("H1", "A1");
        let second = GameInfo::new("H2", "A2");
        let players: Vec<Player> = [
            ("h1", "H1", 10.0),
            ("h2", "H1", 9.0),
            ("a1", "A1", 8.0),
            ("a2", "A1", 1.0),
            ("x1", "H2", 7.0),
            ("y1", "A2", 6.0),
            ("y2", "A2", 5.0),
        ]
        .iter()
        .map(|(id, team, fppg)| {
            let game = if team.ends_with('1') { first.clone() } else { second.clone() };
            player(id, &["F"], team, 1.0, *fppg).game(game)
        })
        .collect();
        let stack = StackSpec::from(GameStack::new(3).max_exposure(0.5))
            .build(&players)
            .unwrap();
        let (mut model, mut rule) = stacked(&players, 3, stack, 2);
        assert_eq!(model.iterate(&mut rule), vec!["a1", "h1", "h2"]);
        // the stack is capped: no three from one game, but both home players
        // still fit
        assert_eq!(model.iterate(&mut rule), vec!["h1", "h2", "x1"]);
    }

    #[test]
    fn test_blocked_positions_stack_keeps_positions_available() {
        use crate::stacks::PositionsStack;

        let players = vec![
            player("apg", &["PG"], "AAA", 1.0, 20.0),
            player("asg", &["SG"], "AAA", 1.0, 1.0),
            player("bpg", &["PG"], "BBB", 1.0, 5.0),
            player("bsg", &["SG"], "BBB", 1.0, 18.0),
            player("c", &["C"], "CCC", 1.0, 10.0),
        ];
        let slots = BTreeMap::from([(strings(&["PG"]), 1), (strings(&["SG"]), 1), (strings(&["C"]), 1)]);
        let stack = StackSpec::from(PositionsStack::new(&["PG", "SG"]).max_exposure(0.5))
            .build(&players)
            .unwrap();
        let (mut model, mut rule) = stacked(&players, 3, stack, 2);
        model.apply(&mut PositionsRule::new(slots, HashMap::new()));
        assert_eq!(model.iterate(&mut rule), vec!["bpg", "bsg", "c"]);
        assert_eq!(model.iterate(&mut rule), vec!["apg", "bsg", "c"]);
    }

    #[test]
    fn test_group_exposure_alternates_groups() {
        let players = roster();
        let first = PlayersGroup::new("a", vec![players[0].clone()], Some(1), None).max_exposure(Some(0.5));
        let second = PlayersGroup::new("b", vec![players[1].clone()], Some(1), None).max_exposure(Some(0.5));
        let stack = Stack::new(vec![first.into(), second.into()]);
        let (mut model, mut rule) = stacked(&players, 1, stack, 2);
        assert_eq!(model.iterate(&mut rule), vec!["1"]);
        assert_eq!(model.iterate(&mut rule), vec!["2"]);
    }

    #[test]
    fn test_strict_dependency_follows_anchor() {
        let players = roster();
        // player 5 plays exactly when player 2 does
        let group = || {
            PlayersGroup::new("dep", vec![players[4].clone()], Some(1), Some(1))
                .depends_on(players[1].clone(), true)
        };
        let (mut model, mut rule) = stacked(&players, 2, Stack::new(vec![group().into()]), 1);
        assert_eq!(model.iterate(&mut rule), vec!["1", "3"]);

        let (mut model, mut rule) = stacked(&players, 2, Stack::new(vec![group().into()]), 1);
        let anchor = model.players.variable(&players[1]).unwrap();
        model.solver.add_constraint(&[anchor], None, Sign::Eq, 1.0, None);
        assert_eq!(model.iterate(&mut rule), vec!["2", "5"]);
    }

    #[test]
    fn test_relaxed_dependency_only_sets_lower_bound() {
        let players = roster();
        let group = PlayersGroup::new("dep", vec![players[0].clone()], Some(1), None)
            .depends_on(players[1].clone(), false);
        let (mut model, mut rule) = stacked(&players, 2, Stack::new(vec![group.into()]), 1);
        assert_eq!(model.iterate(&mut rule), vec!["1", "2"]);
    }

    #[test]
    fn test_non_intersecting_groups_share_player() {
        let players = roster();
        let a = PlayersGroup::new("a", vec![players[0].clone(), players[3].clone()], Some(2), None);
        let b = PlayersGroup::new("b", vec![players[0].clone(), players[4].clone()], Some(2), None);
        let stack = Stack::new(vec![a.into(), b.into()]);
        let (mut model, mut rule) = stacked(&players, 3, stack, 1);
        let selected = model.iterate(&mut rule);
        assert!(selected.contains(&"1".to_string()));
        assert_eq!(selected.len(), 3);
    }
}

#[cfg(test)]
mod late_swap_tests {
    use super::*;
    use crate::positions::multi_position_combinations;

    fn clock() -> GameClock {
        GameClock::new(Utc::now(), FixedOffset::east_opt(0).unwrap())
    }

    #[test]
    fn test_started_players_stay_and_open_slots_refill() {
        let started = GameInfo::new("BOS", "NYK").started(true);
        let later = GameInfo::new("LAL", "MIA");
        let players = vec![
            player("1", &["PG"], "BOS", 1.0, 10.0).game(started.clone()),
            player("2", &["C"], "LAL", 1.0, 10.0).game(later.clone()),
            player("3", &["C"], "MIA", 1.0, 40.0).game(later),
            player("4", &["PG"], "NYK", 1.0, 50.0).game(started),
        ];
        let slots = vec![LineupPosition::new("PG", &["PG"]), LineupPosition::new("C", &["C"])];
        let lineup = Lineup::new(vec![
            LineupPlayer::new(players[0].clone(), "PG", 10.0),
            LineupPlayer::new(players[1].clone(), "C", 10.0),
        ]);
        let multi = multi_position_combinations(&players);
        let mut rule = LateSwapRule::new(vec![lineup], slots, multi, clock());
        let mut model = Model::new(&players);

        assert_eq!(model.iterate(&mut rule), vec!["1", "3"]);
        assert_eq!(model.context.unswappable.len(), 1);
        assert_eq!(model.context.unswappable[0].lineup_position, "PG");
    }

    #[test]
    fn test_unknown_unswappable_player_fails() {
        let started = GameInfo::new("BOS", "NYK").started(true);
        let players = vec![player("1", &["PG"], "BOS", 1.0, 10.0)];
        let missing = player("9", &["PG"], "BOS", 1.0, 10.0).game(started);
        let lineup = Lineup::new(vec![LineupPlayer::new(missing, "PG", 10.0)]);
        let slots = vec![LineupPosition::new("PG", &["PG"])];
        let mut rule = LateSwapRule::new(vec![lineup], slots, Default::default(), clock());
        let mut model = Model::new(&players);
        let mut solver = model.solver.copy();
        let mut env = RuleEnv {
            players: &model.players,
            context: &mut model.context,
        };
        assert!(matches!(
            rule.apply_for_iteration(&mut solver, &mut env, None),
            Err(crate::error::OptimizerError::PlayerNotFound { .. })
        ));
    }
}

#[cfg(test)]
mod player_variables_tests {
    use super::*;

    #[test]
    fn test_lookups() {
        let g = GameInfo::new("BOS", "NYK");
        let players = vec![
            player("1", &["F"], "BOS", 1.0, 1.0).game(g.clone()),
            player("2", &["F"], "NYK", 1.0, 1.0).game(g),
            player("3", &["F"], "BOS", 1.0, 1.0),
        ];
        let model = Model::new(&players);
        let vars = &model.players;
        assert_eq!(vars.len(), 3);
        let v = vars.variable(&players[1]).unwrap();
        assert_eq!(vars.player(v).unwrap().id, "2");
        assert_eq!(vars.by_team()["BOS"].len(), 2);
        assert_eq!(vars.games().len(), 1);
        assert_eq!(vars.select(|p| p.team == "NYK"), vec![v]);
    }

    #[test]
    fn test_rule_names() {
        let rule: Rule = TotalPlayersRule::new(1).into();
        assert_eq!(rule.name(), "TotalPlayers");
        let rule: Rule = UniquePlayerRule.into();
        assert_eq!(rule.name(), "UniquePlayer");
    }
}
