//! Player records and game information.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Scheduled game between two teams.
///
/// Two games are the same game when their home and away teams match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInfo {
    pub home_team: String,
    pub away_team: String,
    /// Local start time in the site's timezone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub game_started: bool,
}

impl GameInfo {
    pub fn new(home_team: &str, away_team: &str) -> Self {
        Self {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            starts_at: None,
            game_started: false,
        }
    }

    pub fn starts_at(mut self, starts_at: NaiveDateTime) -> Self {
        self.starts_at = Some(starts_at);
        self
    }

    pub fn started(mut self, started: bool) -> Self {
        self.game_started = started;
        self
    }

    /// The team playing against `team` in this game, if `team` plays in it.
    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        if self.home_team == team {
            Some(&self.away_team)
        } else if self.away_team == team {
            Some(&self.home_team)
        } else {
            None
        }
    }
}

impl PartialEq for GameInfo {
    fn eq(&self, other: &Self) -> bool {
        self.home_team == other.home_team && self.away_team == other.away_team
    }
}

impl Eq for GameInfo {}

impl Hash for GameInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.home_team.hash(state);
        self.away_team.hash(state);
    }
}

impl fmt::Display for GameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.away_team, self.home_team)
    }
}

/// Decides whether games have started, in an explicit timezone.
#[derive(Debug, Clone, Copy)]
pub struct GameClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl GameClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    /// Clock reading the current system time.
    pub fn system(offset: FixedOffset) -> Self {
        Self::new(Utc::now(), offset)
    }

    pub fn has_started(&self, game: &GameInfo) -> bool {
        if game.game_started {
            return true;
        }
        game.starts_at
            .and_then(|local| self.offset.from_local_datetime(&local).single())
            .map(|start| start <= self.now)
            .unwrap_or(false)
    }
}

/// A player available for selection.
///
/// Identity is `(id, positions)`: a derived record with the same id but a
/// different position set (e.g. an MVP slot variant) is a distinct player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "unique_positions")]
    pub positions: Vec<String>,
    pub team: String,
    pub salary: f64,
    pub fppg: f64,
    #[serde(default)]
    pub is_injured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_exposure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_exposure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_ownership: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_info: Option<GameInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fppg_floor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fppg_ceil: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_deviation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_deviation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive_scale: Option<f64>,
    /// Roster/batting order, used by spacing rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_confirmed_starter: Option<bool>,
    /// Positions of the record this one was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_positions: Option<Vec<String>>,
}

/// Drops repeated position codes, keeping first-seen order.
fn dedup_positions(positions: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for position in positions {
        if !unique.contains(&position) {
            unique.push(position);
        }
    }
    unique
}

fn unique_positions<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer).map(dedup_positions)
}

impl Player {
    pub fn new(
        id: &str,
        name: &str,
        positions: &[&str],
        team: &str,
        salary: f64,
        fppg: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            positions: dedup_positions(positions.iter().map(|p| p.to_string())),
            team: team.to_string(),
            salary,
            fppg,
            is_injured: false,
            min_exposure: None,
            max_exposure: None,
            projected_ownership: None,
            game_info: None,
            fppg_floor: None,
            fppg_ceil: None,
            min_deviation: None,
            max_deviation: None,
            progressive_scale: None,
            roster_order: None,
            is_confirmed_starter: None,
            original_positions: None,
        }
    }

    pub fn injured(mut self, injured: bool) -> Self {
        self.is_injured = injured;
        self
    }

    pub fn exposure(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_exposure = min;
        self.max_exposure = max;
        self
    }

    pub fn ownership(mut self, ownership: f64) -> Self {
        self.projected_ownership = Some(ownership);
        self
    }

    pub fn game(mut self, game: GameInfo) -> Self {
        self.game_info = Some(game);
        self
    }

    pub fn projection_range(mut self, floor: f64, ceil: f64) -> Self {
        self.fppg_floor = Some(floor);
        self.fppg_ceil = Some(ceil);
        self
    }

    pub fn deviation(mut self, min: f64, max: f64) -> Self {
        self.min_deviation = Some(min);
        self.max_deviation = Some(max);
        self
    }

    pub fn progressive(mut self, scale: f64) -> Self {
        self.progressive_scale = Some(scale);
        self
    }

    pub fn roster_order(mut self, order: u32) -> Self {
        self.roster_order = Some(order);
        self
    }

    pub fn confirmed_starter(mut self, starter: bool) -> Self {
        self.is_confirmed_starter = Some(starter);
        self
    }

    /// Stable key for this record, unique per `(id, positions)`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.id, self.positions.join("_"))
    }

    /// Positions of the underlying human, ignoring derived slot tags.
    pub fn original_positions(&self) -> &[String] {
        self.original_positions.as_deref().unwrap_or(&self.positions)
    }

    pub fn has_position(&self, position: &str) -> bool {
        self.positions.iter().any(|p| p == position)
    }

    /// True when any of the player's positions is in `positions`.
    pub fn is_eligible_for(&self, positions: &[String]) -> bool {
        self.positions.iter().any(|p| positions.contains(p))
    }

    /// Fantasy points per 1000 salary.
    pub fn efficiency(&self) -> f64 {
        if self.salary > 0.0 {
            self.fppg / self.salary * 1000.0
        } else {
            0.0
        }
    }

    pub fn game_starts_at(&self) -> Option<NaiveDateTime> {
        self.game_info.as_ref().and_then(|g| g.starts_at)
    }

    pub fn is_game_started(&self, clock: &GameClock) -> bool {
        self.game_info
            .as_ref()
            .map(|g| clock.has_started(g))
            .unwrap_or(false)
    }

    /// Derive an independent record for a special slot (MVP, Captain, ...).
    ///
    /// The variant carries `position_tag` as its only position, scaled
    /// projections and salary, and remembers the original positions.
    pub fn variant(&self, position_tag: &str, fppg_multiplier: f64, salary_multiplier: f64) -> Self {
        let mut derived = self.clone();
        derived.original_positions = Some(self.original_positions().to_vec());
        derived.positions = vec![position_tag.to_string()];
        derived.fppg *= fppg_multiplier;
        derived.salary *= salary_multiplier;
        derived.fppg_floor = self.fppg_floor.map(|v| v * fppg_multiplier);
        derived.fppg_ceil = self.fppg_ceil.map(|v| v * fppg_multiplier);
        derived
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.positions == other.positions
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.positions.hash(state);
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.positions.join("/"), self.team)
    }
}
