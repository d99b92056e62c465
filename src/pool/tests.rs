//! Unit tests for the player pool

use super::*;

fn slots() -> Vec<LineupPosition> {
    vec![
        LineupPosition::new("PG", &["PG"]),
        LineupPosition::new("C", &["C"]),
        LineupPosition::new("UTIL", &["PG", "C"]),
    ]
}

fn pool() -> PlayerPool {
    let mut pool = PlayerPool::new(slots(), Some(10_000.0));
    pool.load_players(vec![
        Player::new("1", "Point One", &["PG"], "BOS", 3000.0, 20.0),
        Player::new("2", "Point Two", &["PG"], "NYK", 4000.0, 25.0),
        Player::new("3", "Center One", &["C"], "BOS", 5000.0, 30.0).ownership(0.2),
        Player::new("4", "Center Two", &["C"], "NYK", 6500.0, 35.0).injured(true),
    ])
    .unwrap();
    pool
}

fn get(pool: &PlayerPool, id: &str) -> Player {
    pool.get_player_by_id(id).unwrap().clone()
}

#[cfg(test)]
mod lookup_tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_name() {
        let pool = pool();
        assert_eq!(pool.get_player_by_id("3").unwrap().name, "Center One");
        assert!(pool.get_player_by_id("99").is_none());
        assert_eq!(pool.get_player_by_name("Point Two", None).unwrap().id, "2");
        assert!(pool.get_player_by_name("point two", None).is_none());
        assert!(pool.get_player_by_name("Point Two", Some("C")).is_none());
    }

    #[test]
    fn test_add_player_replaces_same_identity() {
        let mut pool = pool();
        pool.add_player(Player::new("1", "Point One", &["PG"], "BOS", 3000.0, 50.0))
            .unwrap();
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.get_player_by_id("1").unwrap().fppg, 50.0);
    }

    #[test]
    fn test_add_player_rejects_bad_exposure() {
        let mut pool = pool();
        let bad = Player::new("9", "Bad", &["C"], "BOS", 1.0, 1.0).exposure(Some(0.8), Some(0.2));
        assert!(matches!(
            pool.add_player(bad),
            Err(OptimizerError::InvalidExposure { .. })
        ));
        let out_of_range = Player::new("9", "Bad", &["C"], "BOS", 1.0, 1.0).exposure(None, Some(1.5));
        assert!(pool.add_player(out_of_range).is_err());
    }

    #[test]
    fn test_teams_and_games() {
        let mut pool = pool();
        assert_eq!(pool.teams().len(), 2);
        pool.add_player(
            Player::new("5", "X", &["PG"], "MIA", 1.0, 1.0).game(GameInfo::new("MIA", "BOS")),
        )
        .unwrap();
        pool.add_player(
            Player::new("6", "Y", &["PG"], "BOS", 1.0, 1.0).game(GameInfo::new("MIA", "BOS")),
        )
        .unwrap();
        assert_eq!(pool.games().len(), 1);
    }
}

#[cfg(test)]
mod removal_tests {
    use super::*;

    #[test]
    fn test_remove_and_restore() {
        let mut pool = pool();
        let p = get(&pool, "1");
        pool.remove_player(&p).unwrap();
        assert!(pool.is_removed(&p));
        assert_eq!(pool.players().count(), 3);
        pool.restore_player(&p).unwrap();
        assert_eq!(pool.players().count(), 4);
    }

    #[test]
    fn test_remove_unlocks() {
        let mut pool = pool();
        let p = get(&pool, "1");
        pool.lock_player(&p, None).unwrap();
        pool.remove_player(&p).unwrap();
        assert!(!pool.is_locked(&p));
    }

    #[test]
    fn test_exclude_teams() {
        let mut pool = pool();
        pool.exclude_teams(&["NYK"]).unwrap();
        assert!(pool.players().all(|p| p.team == "BOS"));
        assert!(matches!(
            pool.exclude_teams(&["LAL"]),
            Err(OptimizerError::InvalidTeam { .. })
        ));
    }

    #[test]
    fn test_unknown_player() {
        let mut pool = pool();
        let stranger = Player::new("77", "Nobody", &["PG"], "BOS", 1.0, 1.0);
        assert!(matches!(
            pool.remove_player(&stranger),
            Err(OptimizerError::PlayerNotFound { .. })
        ));
    }
}

#[cfg(test)]
mod lock_tests {
    use super::*;

    #[test]
    fn test_lock_reduces_remaining_positions() {
        let mut pool = pool();
        pool.lock_player(&get(&pool, "1"), None).unwrap();
        let remaining: Vec<String> = pool.remaining_positions().into_iter().map(|s| s.name).collect();
        assert_eq!(remaining, vec!["C", "UTIL"]);
        assert_eq!(pool.remaining_budget(), Some(7000.0));
    }

    #[test]
    fn test_lock_into_named_slot() {
        let mut pool = pool();
        pool.lock_player(&get(&pool, "1"), Some("UTIL")).unwrap();
        pool.lock_player(&get(&pool, "2"), None).unwrap();
        assert_eq!(pool.remaining_positions(), vec![LineupPosition::new("C", &["C"])]);
    }

    #[test]
    fn test_lock_twice() {
        let mut pool = pool();
        let p = get(&pool, "1");
        pool.lock_player(&p, None).unwrap();
        assert!(matches!(
            pool.lock_player(&p, None),
            Err(OptimizerError::PlayerAlreadyLocked { .. })
        ));
    }

    #[test]
    fn test_lock_over_budget() {
        let mut pool = pool();
        pool.lock_player(&get(&pool, "3"), None).unwrap();
        let err = pool.lock_player(&get(&pool, "4"), None).unwrap_err();
        assert!(matches!(err, OptimizerError::BudgetExceeded { .. }));
    }

    #[test]
    fn test_lock_without_slot() {
        let mut pool = PlayerPool::new(slots(), None);
        pool.load_players(vec![
            Player::new("1", "A", &["PG"], "BOS", 1.0, 1.0),
            Player::new("2", "B", &["PG"], "BOS", 1.0, 1.0),
            Player::new("3", "C", &["PG"], "BOS", 1.0, 1.0),
        ])
        .unwrap();
        pool.lock_player(&get(&pool, "1"), None).unwrap();
        pool.lock_player(&get(&pool, "2"), None).unwrap();
        assert!(matches!(
            pool.lock_player(&get(&pool, "3"), None),
            Err(OptimizerError::NoSlotAvailable { .. })
        ));
    }

    #[test]
    fn test_lock_into_wrong_slot() {
        let mut pool = pool();
        let err = pool.lock_player(&get(&pool, "1"), Some("C")).unwrap_err();
        assert!(matches!(err, OptimizerError::NoSlotAvailable { .. }));
    }

    #[test]
    fn test_lock_removed_player() {
        let mut pool = pool();
        let p = get(&pool, "1");
        pool.remove_player(&p).unwrap();
        assert!(matches!(
            pool.lock_player(&p, None),
            Err(OptimizerError::PlayerRemoved { .. })
        ));
    }

    #[test]
    fn test_unlock() {
        let mut pool = pool();
        let p = get(&pool, "1");
        assert!(matches!(
            pool.unlock_player(&p),
            Err(OptimizerError::PlayerNotLocked { .. })
        ));
        pool.lock_player(&p, None).unwrap();
        pool.unlock_player(&p).unwrap();
        assert_eq!(pool.remaining_positions().len(), 3);
    }
}

#[cfg(test)]
mod filter_tests {
    use super::*;

    #[test]
    fn test_injured_players_skipped_by_default() {
        let pool = pool();
        assert_eq!(pool.filtered_players(false).len(), 3);
        assert_eq!(pool.filtered_players(true).len(), 4);
    }

    #[test]
    fn test_filters_apply() {
        let mut pool = pool();
        pool.add_filter(PlayerFilter::new(FilterAttribute::Salary, Some(3500.0), None));
        let ids: Vec<String> = pool.filtered_players(true).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["2", "3", "4"]);

        pool.clear_filters();
        pool.add_filter(PlayerFilter::new(
            FilterAttribute::ProjectedOwnership,
            None,
            Some(0.1),
        ));
        // only player 3 has ownership and it is above the cap
        assert_eq!(pool.filtered_players(true).len(), 3);
    }

    #[test]
    fn test_locked_player_survives_filters() {
        let mut pool = pool();
        let p = get(&pool, "1");
        pool.lock_player(&p, None).unwrap();
        pool.add_filter(PlayerFilter::new(FilterAttribute::Fppg, Some(100.0), None));
        assert_eq!(pool.filtered_players(false), vec![p]);
    }

    #[test]
    fn test_efficiency_filter() {
        let filter = PlayerFilter::new(FilterAttribute::Efficiency, Some(6.0), Some(7.0));
        assert!(filter.matches(&Player::new("1", "A", &["C"], "BOS", 5000.0, 32.0)));
        assert!(!filter.matches(&Player::new("2", "B", &["C"], "BOS", 5000.0, 40.0)));
    }
}
