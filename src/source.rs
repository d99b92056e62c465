//! Player and lineup import.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{OptimizerError, Result};
use crate::models::{Lineup, LineupPlayer, Player};

/// Supplies the players for a slate and, for late swap, previously entered
/// lineups.
pub trait PlayerSource {
    fn import_players(&self) -> Result<Vec<Player>>;

    /// Lineups resolved against `players`. Sources without lineup data
    /// return none.
    fn import_lineups(&self, _players: &[Player]) -> Result<Vec<Lineup>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct LineupRecord {
    players: Vec<SlotRecord>,
}

#[derive(Debug, Deserialize)]
struct SlotRecord {
    slot: String,
    id: String,
}

/// Reads players from a JSON array of player records and lineups from an
/// optional JSON file of `{ "players": [{ "slot", "id" }] }` entries.
#[derive(Debug, Clone)]
pub struct JsonPlayerSource {
    players_path: PathBuf,
    lineups_path: Option<PathBuf>,
}

impl JsonPlayerSource {
    pub fn new(players_path: impl Into<PathBuf>) -> Self {
        Self {
            players_path: players_path.into(),
            lineups_path: None,
        }
    }

    pub fn lineups(mut self, path: impl Into<PathBuf>) -> Self {
        self.lineups_path = Some(path.into());
        self
    }

    pub fn players_path(&self) -> &Path {
        &self.players_path
    }
}

impl PlayerSource for JsonPlayerSource {
    fn import_players(&self) -> Result<Vec<Player>> {
        let json = fs::read_to_string(&self.players_path)?;
        let players: Vec<Player> = serde_json::from_str(&json)?;
        debug!(count = players.len(), path = %self.players_path.display(), "imported players");
        Ok(players)
    }

    fn import_lineups(&self, players: &[Player]) -> Result<Vec<Lineup>> {
        let Some(path) = &self.lineups_path else {
            return Ok(Vec::new());
        };
        let json = fs::read_to_string(path)?;
        let records: Vec<LineupRecord> = serde_json::from_str(&json)?;
        let lineups = records
            .into_iter()
            .map(|record| resolve_lineup(record, players))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = lineups.len(), path = %path.display(), "imported lineups");
        Ok(lineups)
    }
}

fn resolve_lineup(record: LineupRecord, players: &[Player]) -> Result<Lineup> {
    let slots = record
        .players
        .into_iter()
        .map(|slot| {
            let player = players
                .iter()
                .find(|p| p.id == slot.id)
                .ok_or_else(|| OptimizerError::PlayerNotFound { name: slot.id.clone() })?;
            Ok(LineupPlayer::new(player.clone(), &slot.slot, player.fppg))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Lineup::new(slots))
}
