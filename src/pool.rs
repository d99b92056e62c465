//! Player pool: loaded players, removals, locks and filters.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::assembly::fit_into_slots;
use crate::error::{OptimizerError, Result};
use crate::models::{GameInfo, LineupPosition, Player};
use crate::positions::{self, PositionCombination};

#[cfg(test)]
mod tests;

/// Player attribute a [`PlayerFilter`] looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAttribute {
    Fppg,
    Salary,
    Efficiency,
    ProjectedOwnership,
}

/// Keeps players whose attribute lies within `[from, to]`.
///
/// Players without a value for the attribute (no projected ownership) are
/// kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFilter {
    pub attribute: FilterAttribute,
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
}

impl PlayerFilter {
    pub fn new(attribute: FilterAttribute, from: Option<f64>, to: Option<f64>) -> Self {
        Self {
            attribute,
            from,
            to,
        }
    }

    pub fn matches(&self, player: &Player) -> bool {
        let value = match self.attribute {
            FilterAttribute::Fppg => Some(player.fppg),
            FilterAttribute::Salary => Some(player.salary),
            FilterAttribute::Efficiency => Some(player.efficiency()),
            FilterAttribute::ProjectedOwnership => player.projected_ownership,
        };
        let Some(value) = value else {
            return true;
        };
        self.from.map_or(true, |from| value >= from) && self.to.map_or(true, |to| value <= to)
    }
}

/// A hand-locked player, optionally bound to a slot name.
#[derive(Debug, Clone, PartialEq)]
pub struct LockedPlayer {
    pub player: Player,
    pub slot: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    players: Vec<Player>,
    removed: HashSet<Player>,
    locked: Vec<LockedPlayer>,
    filters: Vec<PlayerFilter>,
    slots: Vec<LineupPosition>,
    budget: Option<f64>,
}

impl PlayerPool {
    pub fn new(slots: Vec<LineupPosition>, budget: Option<f64>) -> Self {
        Self {
            slots,
            budget,
            ..Default::default()
        }
    }

    pub fn slots(&self) -> &[LineupPosition] {
        &self.slots
    }

    pub fn budget(&self) -> Option<f64> {
        self.budget
    }

    /// Replace the pool contents. Removals and locks are cleared.
    pub fn load_players(&mut self, players: Vec<Player>) -> Result<()> {
        self.players.clear();
        self.removed.clear();
        self.locked.clear();
        for player in players {
            self.add_player(player)?;
        }
        debug!(players = self.players.len(), "loaded player pool");
        Ok(())
    }

    /// Add a player; a record with the same identity replaces the old one.
    pub fn add_player(&mut self, mut player: Player) -> Result<()> {
        validate_exposure(&player)?;
        let mut unique: Vec<String> = Vec::with_capacity(player.positions.len());
        for position in player.positions.drain(..) {
            if !unique.contains(&position) {
                unique.push(position);
            }
        }
        player.positions = unique;

        match self.players.iter_mut().find(|p| **p == player) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
        Ok(())
    }

    /// Every loaded player, removed ones included.
    pub fn all_players(&self) -> &[Player] {
        &self.players
    }

    /// Players not removed from the pool.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !self.removed.contains(*p))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get_player_by_id(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Players with exactly this full name, optionally restricted to those
    /// eligible for `position`.
    pub fn get_players_by_name(&self, name: &str, position: Option<&str>) -> Vec<&Player> {
        self.players
            .iter()
            .filter(|p| p.name == name)
            .filter(|p| position.map_or(true, |pos| p.has_position(pos)))
            .collect()
    }

    pub fn get_player_by_name(&self, name: &str, position: Option<&str>) -> Option<&Player> {
        self.get_players_by_name(name, position).into_iter().next()
    }

    pub fn get_players_by_team(&self, team: &str) -> Vec<&Player> {
        self.players().filter(|p| p.team == team).collect()
    }

    pub fn teams(&self) -> BTreeSet<String> {
        self.players.iter().map(|p| p.team.clone()).collect()
    }

    pub fn has_team(&self, team: &str) -> bool {
        self.players.iter().any(|p| p.team == team)
    }

    /// Distinct games in first-seen order.
    pub fn games(&self) -> Vec<GameInfo> {
        let mut games: Vec<GameInfo> = Vec::new();
        for game in self.players.iter().filter_map(|p| p.game_info.as_ref()) {
            if !games.contains(game) {
                games.push(game.clone());
            }
        }
        games
    }

    /// Position codes used by slots or players.
    pub fn known_positions(&self) -> BTreeSet<String> {
        let mut known = positions::known_positions(&self.slots);
        known.extend(self.players.iter().flat_map(|p| p.positions.iter().cloned()));
        known
    }

    pub fn multi_position_combinations(&self) -> BTreeSet<PositionCombination> {
        positions::multi_position_combinations(self.players())
    }

    pub fn is_removed(&self, player: &Player) -> bool {
        self.removed.contains(player)
    }

    /// Remove a player; a locked player is unlocked first.
    pub fn remove_player(&mut self, player: &Player) -> Result<()> {
        self.ensure_known(player)?;
        self.locked.retain(|l| &l.player != player);
        self.removed.insert(player.clone());
        Ok(())
    }

    pub fn restore_player(&mut self, player: &Player) -> Result<()> {
        self.ensure_known(player)?;
        self.removed.remove(player);
        Ok(())
    }

    /// Remove every player of the given teams.
    pub fn exclude_teams<S: AsRef<str>>(&mut self, teams: &[S]) -> Result<()> {
        for team in teams {
            let team = team.as_ref();
            if !self.has_team(team) {
                return Err(OptimizerError::InvalidTeam {
                    team: team.to_string(),
                });
            }
        }
        let excluded: Vec<Player> = self
            .players
            .iter()
            .filter(|p| teams.iter().any(|t| t.as_ref() == p.team))
            .cloned()
            .collect();
        for player in &excluded {
            self.remove_player(player)?;
        }
        Ok(())
    }

    pub fn locked_players(&self) -> &[LockedPlayer] {
        &self.locked
    }

    pub fn is_locked(&self, player: &Player) -> bool {
        self.locked.iter().any(|l| &l.player == player)
    }

    /// Force `player` into every lineup, optionally into a named slot.
    pub fn lock_player(&mut self, player: &Player, slot: Option<&str>) -> Result<()> {
        self.ensure_known(player)?;
        if self.is_removed(player) {
            return Err(OptimizerError::PlayerRemoved {
                name: player.name.clone(),
            });
        }
        if self.is_locked(player) {
            return Err(OptimizerError::PlayerAlreadyLocked {
                name: player.name.clone(),
            });
        }
        if let Some(budget) = self.budget.filter(|b| *b > 0.0) {
            let salary = self.locked_salary() + player.salary;
            if salary > budget {
                return Err(OptimizerError::BudgetExceeded {
                    name: player.name.clone(),
                    salary,
                    budget,
                });
            }
        }

        let candidate = LockedPlayer {
            player: player.clone(),
            slot: slot.map(str::to_string),
        };
        if !self.slots.is_empty() {
            let mut locked = self.locked.clone();
            locked.push(candidate.clone());
            if open_slots_after(&self.slots, &locked).is_none() {
                return Err(OptimizerError::NoSlotAvailable {
                    name: player.name.clone(),
                });
            }
        }
        debug!(player = %player, slot = ?slot, "locked player");
        self.locked.push(candidate);
        Ok(())
    }

    pub fn unlock_player(&mut self, player: &Player) -> Result<()> {
        let before = self.locked.len();
        self.locked.retain(|l| &l.player != player);
        if self.locked.len() == before {
            return Err(OptimizerError::PlayerNotLocked {
                name: player.name.clone(),
            });
        }
        Ok(())
    }

    pub fn locked_salary(&self) -> f64 {
        self.locked.iter().map(|l| l.player.salary).sum()
    }

    /// Budget left after paying for the locked players.
    pub fn remaining_budget(&self) -> Option<f64> {
        self.budget.map(|b| b - self.locked_salary())
    }

    /// Slots not taken by locked players.
    pub fn remaining_positions(&self) -> Vec<LineupPosition> {
        open_slots_after(&self.slots, &self.locked).unwrap_or_default()
    }

    pub fn add_filter(&mut self, filter: PlayerFilter) {
        self.filters.push(filter);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    /// Players eligible for optimization: not removed, passing every filter
    /// and healthy unless `with_injured`. Locked players are always kept.
    pub fn filtered_players(&self, with_injured: bool) -> Vec<Player> {
        self.players()
            .filter(|p| {
                self.is_locked(p)
                    || ((with_injured || !p.is_injured) && self.filters.iter().all(|f| f.matches(p)))
            })
            .cloned()
            .collect()
    }

    fn ensure_known(&self, player: &Player) -> Result<()> {
        if self.players.contains(player) {
            Ok(())
        } else {
            Err(OptimizerError::PlayerNotFound {
                name: player.name.clone(),
            })
        }
    }
}

/// Slots remaining once every locked player is seated, or `None` when the
/// locks cannot all be seated at once.
fn open_slots_after(
    slots: &[LineupPosition],
    locked: &[LockedPlayer],
) -> Option<Vec<LineupPosition>> {
    let mut open = slots.to_vec();
    for lock in locked {
        if let Some(name) = &lock.slot {
            let i = open
                .iter()
                .position(|s| &s.name == name && s.accepts(&lock.player))?;
            open.remove(i);
        }
    }
    let floating: Vec<Player> = locked
        .iter()
        .filter(|l| l.slot.is_none())
        .map(|l| l.player.clone())
        .collect();
    let mut taken = fit_into_slots(&floating, &open)?;
    taken.sort_unstable_by(|a, b| b.cmp(a));
    for i in taken {
        open.remove(i);
    }
    Some(open)
}

fn validate_exposure(player: &Player) -> Result<()> {
    let invalid = |message: String| OptimizerError::InvalidExposure {
        name: player.name.clone(),
        message,
    };
    for value in [player.min_exposure, player.max_exposure].into_iter().flatten() {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(format!("{value} is outside 0..1")));
        }
    }
    if let (Some(min), Some(max)) = (player.min_exposure, player.max_exposure) {
        if min > max {
            return Err(invalid(format!("min {min} is above max {max}")));
        }
    }
    Ok(())
}
