#[cfg(test)]
mod optimizer_tests {
    use std::collections::{BTreeMap, HashMap};

    use crate::config::Settings;
    use crate::error::OptimizerError;
    use crate::models::{Lineup, LineupPosition, Player};
    use crate::optimizer::{LineupOptimizer, OptimizeOptions};
    use crate::stacks::TeamStack;

    fn settings() -> Settings {
        Settings::new(
            Some(100.0),
            vec![
                LineupPosition::new("G", &["PG", "SG"]),
                LineupPosition::new("F", &["SF", "PF"]),
                LineupPosition::new("UTIL", &["PG", "SG", "SF", "PF", "C"]),
            ],
        )
    }

    fn players() -> Vec<Player> {
        vec![
            Player::new("1", "Alpha", &["PG"], "T1", 30.0, 30.0),
            Player::new("2", "Bravo", &["SG"], "T1", 30.0, 25.0),
            Player::new("3", "Charlie", &["SF"], "T2", 30.0, 20.0),
            Player::new("4", "Delta", &["PF"], "T2", 30.0, 15.0),
            Player::new("5", "Echo", &["C"], "T3", 30.0, 10.0),
            Player::new("6", "Foxtrot", &["PG"], "T3", 10.0, 5.0),
        ]
    }

    fn optimizer() -> LineupOptimizer {
        let mut optimizer = LineupOptimizer::new(settings()).unwrap();
        optimizer.load_players(players()).unwrap();
        optimizer
    }

    fn ids(lineup: &Lineup) -> Vec<&str> {
        lineup.player_ids()
    }

    fn generate(optimizer: &mut LineupOptimizer, n: usize, options: OptimizeOptions) -> Vec<Lineup> {
        optimizer
            .optimize(n, options)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let mut bad = settings();
        bad.budget = Some(-1.0);
        assert!(matches!(
            LineupOptimizer::new(bad),
            Err(OptimizerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_setters_validate_eagerly() {
        let mut optimizer = optimizer();
        assert!(optimizer.set_min_salary_cap(200.0).is_err());
        assert!(optimizer.set_min_salary_cap(80.0).is_ok());
        assert!(optimizer.set_max_repeating_players(3).is_err());
        assert!(optimizer.set_max_repeating_players(2).is_ok());
        assert!(matches!(
            optimizer.set_team_exposure("XXX", None, Some(0.5)),
            Err(OptimizerError::InvalidTeam { .. })
        ));
        assert!(matches!(
            optimizer.set_team_exposure("T1", Some(0.8), Some(0.2)),
            Err(OptimizerError::InvalidExposure { .. })
        ));
        assert!(matches!(
            optimizer.set_players_with_same_position(HashMap::from([("QB".to_string(), 1)])),
            Err(OptimizerError::InvalidPosition { .. })
        ));
        assert!(matches!(
            optimizer.restrict_positions_for_opposing_team(&["PG"], &["C"], 0),
            Err(OptimizerError::InvalidConfig { .. })
        ));
        assert!(optimizer.set_total_teams(Some(3), Some(2)).is_err());
        assert!(optimizer.set_total_teams(Some(4), None).is_err());
        assert!(optimizer.set_spacing_for_positions(&["PG"], 0).is_err());
        assert!(optimizer.set_projected_ownership(Some(1.5), None).is_err());
        assert!(optimizer.set_min_games(4).is_err());
        assert!(optimizer
            .set_players_from_one_team(BTreeMap::from([("T1".to_string(), 4)]))
            .is_err());
        assert!(optimizer.add_stack(TeamStack::new(0)).is_err());
        assert!(optimizer.add_stack(TeamStack::new(2).for_teams(&["XXX"])).is_err());
        assert!(optimizer.stacks().is_empty());
    }

    #[test]
    fn test_best_lineup() {
        let mut optimizer = optimizer();
        let lineups = generate(&mut optimizer, 1, OptimizeOptions::new());
        assert_eq!(lineups.len(), 1);
        assert_eq!(ids(&lineups[0]), vec!["1", "2", "3"]);
        assert_eq!(lineups[0].fantasy_points_projection(), 75.0);
        assert_eq!(lineups[0].salary_costs(), 90.0);
        let slots: Vec<&str> = lineups[0].iter().map(|lp| lp.lineup_position.as_str()).collect();
        assert_eq!(slots, vec!["G", "F", "UTIL"]);
    }

    #[test]
    fn test_lineups_are_unique_and_descending() {
        let mut optimizer = optimizer();
        let lineups = generate(&mut optimizer, 3, OptimizeOptions::new());
        assert_eq!(lineups.len(), 3);
        for (i, a) in lineups.iter().enumerate() {
            for b in &lineups[i + 1..] {
                assert_ne!(a, b);
                assert!(a.fantasy_points_projection() >= b.fantasy_points_projection() - 1e-6);
            }
        }
        assert_eq!(lineups[1].fantasy_points_projection(), 70.0);
    }

    #[test]
    fn test_max_exposure_option() {
        let mut optimizer = optimizer();
        let lineups = generate(&mut optimizer, 2, OptimizeOptions::new().max_exposure(0.5));
        assert_eq!(ids(&lineups[0]), vec!["1", "2", "3"]);
        assert_eq!(ids(&lineups[1]), vec!["4", "5", "6"]);
    }

    #[test]
    fn test_invalid_max_exposure_option() {
        let mut optimizer = optimizer();
        assert!(matches!(
            optimizer.optimize(1, OptimizeOptions::new().max_exposure(1.5)),
            Err(OptimizerError::InvalidExposure { .. })
        ));
    }

    #[test]
    fn test_fully_locked_roster_stops_after_one_lineup() {
        let mut optimizer = optimizer();
        let pool = optimizer.player_pool_mut();
        for (id, slot) in [("1", "G"), ("3", "F"), ("5", "UTIL")] {
            let player = pool.get_player_by_id(id).unwrap().clone();
            pool.lock_player(&player, Some(slot)).unwrap();
        }
        let lineups = generate(&mut optimizer, 5, OptimizeOptions::new());
        assert_eq!(lineups.len(), 1);
        assert_eq!(ids(&lineups[0]), vec!["1", "3", "5"]);
        let echo = lineups[0].iter().find(|lp| lp.player.id == "5").unwrap();
        assert_eq!(echo.lineup_position, "UTIL");
    }

    #[test]
    fn test_locked_player_keeps_named_slot() {
        let mut optimizer = optimizer();
        let pool = optimizer.player_pool_mut();
        let alpha = pool.get_player_by_id("1").unwrap().clone();
        pool.lock_player(&alpha, Some("UTIL")).unwrap();

        let lineups = generate(&mut optimizer, 2, OptimizeOptions::new());
        assert_eq!(lineups.len(), 2);
        for lineup in &lineups {
            let slot = |id: &str| {
                lineup
                    .iter()
                    .find(|lp| lp.player.id == id)
                    .map(|lp| lp.lineup_position.clone())
            };
            assert_eq!(slot("1").as_deref(), Some("UTIL"));
        }
        let mut first = ids(&lineups[0]);
        first.sort_unstable();
        assert_eq!(first, vec!["1", "2", "3"]);
        let guard = lineups[0].iter().find(|lp| lp.player.id == "2").unwrap();
        assert_eq!(guard.lineup_position, "G");
    }

    #[test]
    fn test_infeasible_run_reports_progress() {
        let mut optimizer = optimizer();
        optimizer.set_min_salary_cap(95.0).unwrap();
        let mut lineups = optimizer.optimize(2, OptimizeOptions::new()).unwrap();
        let err = lineups.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            OptimizerError::GenerateLineup { generated: 0, requested: 2, .. }
        ));
        assert!(lineups.next().is_none());
    }

    #[test]
    fn test_iterator_is_lazy() {
        let mut optimizer = optimizer();
        let mut lineups = optimizer.optimize(3, OptimizeOptions::new()).unwrap();
        assert_eq!(lineups.context().generated(), 0);
        assert_eq!(lineups.size_hint(), (0, Some(3)));
        lineups.next().unwrap().unwrap();
        assert_eq!(lineups.context().generated(), 1);
        assert_eq!(lineups.context().remaining_lineups, 2);
    }

    #[test]
    fn test_last_context_and_statistics() {
        let mut optimizer = optimizer();
        assert!(optimizer.statistics().is_none());
        generate(&mut optimizer, 2, OptimizeOptions::new());
        let context = optimizer.last_context().unwrap();
        assert_eq!(context.lineups.len(), 2);
        let stats = optimizer.statistics().unwrap();
        assert_eq!(stats.total_lineups, 2);
        assert_eq!(stats.player("1").unwrap().count, 2);
    }

    #[test]
    fn test_excluded_players_and_injuries() {
        let mut optimizer = optimizer();
        let alpha = optimizer.player_pool().get_player_by_id("1").unwrap().clone();
        optimizer.player_pool_mut().remove_player(&alpha).unwrap();
        let lineups = generate(&mut optimizer, 1, OptimizeOptions::new());
        assert!(!lineups[0].contains_id("1"));

        let mut optimizer = LineupOptimizer::new(settings()).unwrap();
        let mut roster = players();
        roster[1] = roster[1].clone().injured(true);
        optimizer.load_players(roster).unwrap();
        let healthy = generate(&mut optimizer, 1, OptimizeOptions::new());
        assert!(!healthy[0].contains_id("2"));
        let all = generate(&mut optimizer, 1, OptimizeOptions::new().with_injured(true));
        assert!(all[0].contains_id("2"));
    }

    #[test]
    fn test_reset_constraints() {
        let mut optimizer = optimizer();
        optimizer.set_min_salary_cap(95.0).unwrap();
        optimizer.add_stack(TeamStack::new(2)).unwrap();
        optimizer.reset_constraints();
        assert!(optimizer.stacks().is_empty());
        let lineups = generate(&mut optimizer, 1, OptimizeOptions::new());
        assert_eq!(ids(&lineups[0]), vec!["1", "2", "3"]);
    }
}
