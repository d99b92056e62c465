//! Site settings: budget, roster slots and always-on rules, loaded from JSON.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{OptimizerError, Result};
use crate::models::LineupPosition;


/// Environment variable naming the settings file.
pub const SETTINGS_ENV_VAR: &str = "DFS_OPTIMIZER_SETTINGS";

/// Rules a site always enforces in addition to the user's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SiteRule {
    /// At most `max` players from one team among those with none of
    /// `excluded_positions` (hitters in baseball).
    MaxFromOneTeamExcludingPositions {
        max: usize,
        excluded_positions: Vec<String>,
    },
    /// At most one player per position code (tier contests).
    OnePlayerPerPosition,
}

/// Configuration bundle for one site and sport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub budget: Option<f64>,
    pub positions: Vec<LineupPosition>,
    #[serde(default)]
    pub max_from_one_team: Option<usize>,
    #[serde(default)]
    pub min_teams: Option<usize>,
    #[serde(default)]
    pub min_games: Option<usize>,
    #[serde(default)]
    pub total_teams_exclude_positions: Vec<String>,
    #[serde(default)]
    pub extra_rules: Vec<SiteRule>,
    /// Offset of the site's local time from UTC, used for game starts.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Settings {
    pub fn new(budget: Option<f64>, positions: Vec<LineupPosition>) -> Self {
        Self {
            site: String::new(),
            sport: String::new(),
            budget,
            positions,
            max_from_one_team: None,
            min_teams: None,
            min_games: None,
            total_teams_exclude_positions: Vec::new(),
            extra_rules: Vec::new(),
            utc_offset_minutes: 0,
        }
    }

    pub fn max_from_one_team(mut self, max: usize) -> Self {
        self.max_from_one_team = Some(max);
        self
    }

    pub fn min_teams(mut self, min: usize) -> Self {
        self.min_teams = Some(min);
        self
    }

    pub fn min_games(mut self, min: usize) -> Self {
        self.min_games = Some(min);
        self
    }

    pub fn extra_rule(mut self, rule: SiteRule) -> Self {
        self.extra_rules.push(rule);
        self
    }

    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn total_players(&self) -> usize {
        self.positions.len()
    }

    pub fn timezone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            OptimizerError::config(format!(
                "utc offset of {} minutes is out of range",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(budget) = self.budget {
            if budget < 0.0 {
                return Err(OptimizerError::config(format!("negative budget {budget}")));
            }
        }
        if let Some(slot) = self.positions.iter().find(|s| s.positions.is_empty()) {
            return Err(OptimizerError::config(format!(
                "slot {} accepts no positions",
                slot.name
            )));
        }
        if self.max_from_one_team == Some(0) {
            return Err(OptimizerError::config("max_from_one_team must be positive"));
        }
        self.timezone()?;
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// `<config_dir>/dfs-optimizer/settings.json`
pub fn default_settings_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| {
        let mut home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.push(".config");
        home
    });
    base.join("dfs-optimizer").join("settings.json")
}

/// Resolve the settings file from an explicit path, then the environment,
/// then the default location.
pub fn resolve_settings_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var(SETTINGS_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(default_settings_path)
}
