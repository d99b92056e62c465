//! Roster slots and generated lineups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use super::player::Player;
use crate::export::{DefaultLineupPrinter, LineupPrinter};

/// A named roster slot and the positions eligible to fill it.
///
/// Several slots may share a name (two `OF` slots); order and multiplicity
/// both matter when players are assigned to slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupPosition {
    pub name: String,
    pub positions: Vec<String>,
}

impl LineupPosition {
    pub fn new(name: &str, positions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            positions: positions.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Eligible positions, sorted, as used for position combinations.
    pub fn combination(&self) -> Vec<String> {
        let mut positions = self.positions.clone();
        positions.sort();
        positions.dedup();
        positions
    }

    pub fn accepts(&self, player: &Player) -> bool {
        player.is_eligible_for(&self.positions)
    }
}

/// One player in a lineup, with the slot they fill and the points used for
/// them when the lineup was solved.
#[derive(Debug, Clone, Serialize)]
pub struct LineupPlayer {
    pub player: Player,
    pub lineup_position: String,
    pub used_fppg: f64,
}

impl LineupPlayer {
    pub fn new(player: Player, lineup_position: &str, used_fppg: f64) -> Self {
        Self {
            player,
            lineup_position: lineup_position.to_string(),
            used_fppg,
        }
    }
}

/// A complete roster for one contest entry.
///
/// Equality and hashing only look at the set of player ids, so the same
/// players in a different slot order are the same lineup.
#[derive(Debug, Clone, Serialize)]
pub struct Lineup {
    players: Vec<LineupPlayer>,
}

impl Lineup {
    pub fn new(players: Vec<LineupPlayer>) -> Self {
        Self { players }
    }

    pub fn players(&self) -> &[LineupPlayer] {
        &self.players
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineupPlayer> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, player: &Player) -> bool {
        self.players.iter().any(|lp| &lp.player == player)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.players.iter().any(|lp| lp.player.id == id)
    }

    pub fn salary_costs(&self) -> f64 {
        self.players.iter().map(|lp| lp.player.salary).sum()
    }

    /// Sum of the base projections.
    pub fn fantasy_points_projection(&self) -> f64 {
        self.players.iter().map(|lp| lp.player.fppg).sum()
    }

    /// Sum of the points the solver actually optimized for.
    pub fn actual_fantasy_points_projection(&self) -> f64 {
        self.players.iter().map(|lp| lp.used_fppg).sum()
    }

    /// Sorted player ids.
    pub fn player_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.players.iter().map(|lp| lp.player.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl PartialEq for Lineup {
    fn eq(&self, other: &Self) -> bool {
        self.player_ids() == other.player_ids()
    }
}

impl Eq for Lineup {}

impl Hash for Lineup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.player_ids().hash(state);
    }
}

impl fmt::Display for Lineup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DefaultLineupPrinter.print_lineup(self))
    }
}
