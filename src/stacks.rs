//! Stack declarations and their expansion into player groups.
//!
//! A [`Stack`] is a list of groups of which at least one must "fire" in
//! every lineup. Built-in kinds ([`TeamStack`], [`PositionsStack`],
//! [`GameStack`]) expand into groups against the players of a run; custom
//! stacks are declared directly from [`PlayersGroup`]s.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::Settings;
use crate::error::{OptimizerError, Result};
use crate::models::{GameInfo, Player};


/// Players from which between `min_from_group` and `max_from_group` must be
/// selected when the group fires.
#[derive(Debug, Clone)]
pub struct PlayersGroup {
    pub id: String,
    pub players: Vec<Player>,
    pub min_from_group: Option<usize>,
    pub max_from_group: Option<usize>,
    pub max_exposure: Option<f64>,
    /// Anchor player whose selection drives this group.
    pub depends_on: Option<Player>,
    /// Strict dependency also caps the group at zero when the anchor is out.
    pub strict_depend: bool,
    /// Exposure roll-up key shared with sibling groups.
    pub parent: Option<String>,
}

impl PlayersGroup {
    pub fn new(
        id: &str,
        players: Vec<Player>,
        min_from_group: Option<usize>,
        max_from_group: Option<usize>,
    ) -> Self {
        Self {
            id: id.to_string(),
            players,
            min_from_group,
            max_from_group,
            max_exposure: None,
            depends_on: None,
            strict_depend: true,
            parent: None,
        }
    }

    pub fn max_exposure(mut self, max_exposure: Option<f64>) -> Self {
        self.max_exposure = max_exposure;
        self
    }

    pub fn depends_on(mut self, anchor: Player, strict: bool) -> Self {
        self.depends_on = Some(anchor);
        self.strict_depend = strict;
        self
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }
}

/// Sibling groups that fire together through one shared indicator.
#[derive(Debug, Clone)]
pub struct NestedPlayersGroup {
    pub id: String,
    pub groups: Vec<PlayersGroup>,
    pub max_exposure: Option<f64>,
    pub parent: Option<String>,
}

impl NestedPlayersGroup {
    pub fn new(id: &str, groups: Vec<PlayersGroup>) -> Self {
        Self {
            id: id.to_string(),
            groups,
            max_exposure: None,
            parent: None,
        }
    }

    pub fn max_exposure(mut self, max_exposure: Option<f64>) -> Self {
        self.max_exposure = max_exposure;
        self
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub enum StackGroup {
    Players(PlayersGroup),
    Nested(NestedPlayersGroup),
}

/// Flattened view of one constrained player set.
#[derive(Debug, Clone, Copy)]
pub struct Leaf<'a> {
    pub players: &'a [Player],
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub depends_on: Option<&'a Player>,
    pub strict_depend: bool,
}

impl StackGroup {
    pub fn id(&self) -> &str {
        match self {
            StackGroup::Players(group) => &group.id,
            StackGroup::Nested(group) => &group.id,
        }
    }

    pub fn max_exposure(&self) -> Option<f64> {
        match self {
            StackGroup::Players(group) => group.max_exposure,
            StackGroup::Nested(group) => group.max_exposure,
        }
    }

    pub fn parent(&self) -> Option<&str> {
        match self {
            StackGroup::Players(group) => group.parent.as_deref(),
            StackGroup::Nested(group) => group.parent.as_deref(),
        }
    }

    /// Nested children lose their own dependency; only a top-level group
    /// can hang off an anchor player.
    pub fn leaves(&self) -> Vec<Leaf<'_>> {
        match self {
            StackGroup::Players(group) => vec![leaf(group, true)],
            StackGroup::Nested(nested) => nested.groups.iter().map(|g| leaf(g, false)).collect(),
        }
    }
}

fn leaf(group: &PlayersGroup, with_dependency: bool) -> Leaf<'_> {
    Leaf {
        players: &group.players,
        min: group.min_from_group,
        max: group.max_from_group,
        depends_on: group.depends_on.as_ref().filter(|_| with_dependency),
        strict_depend: group.strict_depend,
    }
}

impl From<PlayersGroup> for StackGroup {
    fn from(group: PlayersGroup) -> Self {
        StackGroup::Players(group)
    }
}

impl From<NestedPlayersGroup> for StackGroup {
    fn from(group: NestedPlayersGroup) -> Self {
        StackGroup::Nested(group)
    }
}

/// Groups of which at least one fires per lineup.
#[derive(Debug, Clone)]
pub struct Stack {
    pub groups: Vec<StackGroup>,
    /// Whether one player may count towards several fired groups.
    pub can_intersect: bool,
    /// Cap shared by every group of the stack.
    pub max_exposure: Option<f64>,
    /// Caps for the `parent` keys referenced by groups.
    pub parent_exposures: HashMap<String, f64>,
}

impl Stack {
    pub fn new(groups: Vec<StackGroup>) -> Self {
        Self {
            groups,
            can_intersect: false,
            max_exposure: None,
            parent_exposures: HashMap::new(),
        }
    }

    pub fn can_intersect(mut self, can_intersect: bool) -> Self {
        self.can_intersect = can_intersect;
        self
    }

    pub fn max_exposure(mut self, max_exposure: Option<f64>) -> Self {
        self.max_exposure = max_exposure;
        self
    }

    pub fn parent_exposure(mut self, parent: &str, max_exposure: f64) -> Self {
        self.parent_exposures.insert(parent.to_string(), max_exposure);
        self
    }

    pub fn has_exposure_caps(&self) -> bool {
        self.max_exposure.is_some()
            || !self.parent_exposures.is_empty()
            || self.groups.iter().any(|g| g.max_exposure().is_some())
    }
}

/// `size` players from one team, optionally restricted by team, position
/// or a roster-order window.
#[derive(Debug, Clone, Default)]
pub struct TeamStack {
    pub size: usize,
    pub for_teams: Option<Vec<String>>,
    pub for_positions: Option<Vec<String>>,
    pub spacing: Option<u32>,
    pub max_exposure: Option<f64>,
    pub max_exposure_per_team: HashMap<String, f64>,
}

impl TeamStack {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn for_teams(mut self, teams: &[&str]) -> Self {
        self.for_teams = Some(teams.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn for_positions(mut self, positions: &[&str]) -> Self {
        self.for_positions = Some(positions.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn spacing(mut self, spacing: u32) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn max_exposure(mut self, max_exposure: f64) -> Self {
        self.max_exposure = Some(max_exposure);
        self
    }

    pub fn team_exposure(mut self, team: &str, max_exposure: f64) -> Self {
        self.max_exposure_per_team.insert(team.to_string(), max_exposure);
        self
    }

    fn build(&self, players: &[Player]) -> Result<Stack> {
        let teams = selected_teams(players, self.for_teams.as_deref());
        let max_order = players.iter().filter_map(|p| p.roster_order).max().unwrap_or(0);
        let mut stack = Stack::new(Vec::new())
            .can_intersect(self.spacing.is_some())
            .max_exposure(self.max_exposure);

        for team in teams {
            let team_players: Vec<Player> = players
                .iter()
                .filter(|p| p.team == team)
                .filter(|p| {
                    self.for_positions
                        .as_ref()
                        .map_or(true, |positions| p.is_eligible_for(positions))
                })
                .cloned()
                .collect();
            let team_exposure = self.max_exposure_per_team.get(&team).copied();

            let Some(spacing) = self.spacing else {
                if team_players.len() >= self.size {
                    let group = PlayersGroup::new(
                        &format!("team_{team}"),
                        team_players,
                        Some(self.size),
                        None,
                    )
                    .max_exposure(team_exposure);
                    stack.groups.push(group.into());
                }
                continue;
            };

            let parent = format!("team_{team}");
            let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
            let mut added = false;
            for start in 1..=max_order {
                let window = cyclic_window(start, spacing, max_order);
                let members: Vec<Player> = team_players
                    .iter()
                    .filter(|p| p.roster_order.is_some_and(|order| window.contains(&order)))
                    .cloned()
                    .collect();
                if members.len() < self.size {
                    continue;
                }
                let keys: Vec<String> = members.iter().map(Player::key).collect();
                if !seen.insert(keys) {
                    continue;
                }
                let group = PlayersGroup::new(
                    &format!("team_{team}_{start}"),
                    members,
                    Some(self.size),
                    None,
                )
                .parent(&parent);
                stack.groups.push(group.into());
                added = true;
            }
            if let (true, Some(max_exposure)) = (added, team_exposure) {
                stack = stack.parent_exposure(&parent, max_exposure);
            }
        }
        Ok(stack)
    }

    fn validate(&self, settings: &Settings, known_teams: &BTreeSet<String>) -> Result<()> {
        if self.size == 0 {
            return Err(OptimizerError::config("team stack size must be positive"));
        }
        if let Some(max) = settings.max_from_one_team {
            if self.size > max {
                return Err(OptimizerError::config(format!(
                    "team stack of {} exceeds max {max} players from one team",
                    self.size
                )));
            }
        }
        if self.spacing == Some(0) {
            return Err(OptimizerError::config("spacing must be at least 1"));
        }
        let teams = self.for_teams.iter().flatten().chain(self.max_exposure_per_team.keys());
        validate_teams(teams, known_teams)?;
        validate_fraction("team stack", self.max_exposure)?;
        for (team, value) in &self.max_exposure_per_team {
            validate_fraction(team, Some(*value))?;
        }
        Ok(())
    }
}

/// Same-team players filling a list of positions, e.g. QB + WR + WR.
#[derive(Debug, Clone)]
pub struct PositionsStack {
    /// Each entry is one player slot of the stack; an entry with several
    /// codes accepts a player eligible for any of them.
    pub positions: Vec<Vec<String>>,
    pub for_teams: Option<Vec<String>>,
    pub max_exposure: Option<f64>,
    pub max_exposure_per_team: HashMap<String, f64>,
}

impl PositionsStack {
    pub fn new(positions: &[&str]) -> Self {
        Self::with_combinations(positions.iter().map(|p| vec![p.to_string()]).collect())
    }

    pub fn with_combinations(positions: Vec<Vec<String>>) -> Self {
        let positions = positions
            .into_iter()
            .map(|mut combination| {
                combination.sort();
                combination.dedup();
                combination
            })
            .collect();
        Self {
            positions,
            for_teams: None,
            max_exposure: None,
            max_exposure_per_team: HashMap::new(),
        }
    }

    pub fn for_teams(mut self, teams: &[&str]) -> Self {
        self.for_teams = Some(teams.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn max_exposure(mut self, max_exposure: f64) -> Self {
        self.max_exposure = Some(max_exposure);
        self
    }

    pub fn team_exposure(mut self, team: &str, max_exposure: f64) -> Self {
        self.max_exposure_per_team.insert(team.to_string(), max_exposure);
        self
    }

    fn build(&self, players: &[Player]) -> Result<Stack> {
        let mut counts: BTreeMap<&[String], usize> = BTreeMap::new();
        for combination in &self.positions {
            *counts.entry(combination.as_slice()).or_default() += 1;
        }
        let all_positions: Vec<String> = self
            .positions
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let total = self.positions.len();

        let mut stack = Stack::new(Vec::new()).max_exposure(self.max_exposure);
        'teams: for team in selected_teams(players, self.for_teams.as_deref()) {
            let team_players: Vec<&Player> = players.iter().filter(|p| p.team == team).collect();
            let mut leaves = Vec::with_capacity(counts.len() + 1);
            for (combination, count) in &counts {
                let eligible: Vec<Player> = team_players
                    .iter()
                    .filter(|p| p.is_eligible_for(combination))
                    .map(|p| (*p).clone())
                    .collect();
                if eligible.len() < *count {
                    continue 'teams;
                }
                let id = format!("{team}_{}", combination.join("_"));
                leaves.push(PlayersGroup::new(&id, eligible, Some(*count), None));
            }
            let combined: Vec<Player> = team_players
                .iter()
                .filter(|p| p.is_eligible_for(&all_positions))
                .map(|p| (*p).clone())
                .collect();
            if combined.len() < total {
                continue;
            }
            leaves.push(PlayersGroup::new(&format!("{team}_all"), combined, Some(total), None));

            let nested = NestedPlayersGroup::new(&format!("positions_{team}"), leaves)
                .max_exposure(self.max_exposure_per_team.get(&team).copied());
            stack.groups.push(nested.into());
        }
        Ok(stack)
    }

    fn validate(
        &self,
        settings: &Settings,
        known_teams: &BTreeSet<String>,
        known_positions: &BTreeSet<String>,
    ) -> Result<()> {
        if self.positions.is_empty() || self.positions.iter().any(|c| c.is_empty()) {
            return Err(OptimizerError::config("positions stack needs positions"));
        }
        if let Some(position) = self.positions.iter().flatten().find(|p| !known_positions.contains(*p)) {
            return Err(OptimizerError::InvalidPosition {
                position: position.clone(),
            });
        }
        if let Some(max) = settings.max_from_one_team {
            if self.positions.len() > max {
                return Err(OptimizerError::config(format!(
                    "positions stack of {} exceeds max {max} players from one team",
                    self.positions.len()
                )));
            }
        }
        let teams = self.for_teams.iter().flatten().chain(self.max_exposure_per_team.keys());
        validate_teams(teams, known_teams)?;
        validate_fraction("positions stack", self.max_exposure)
    }
}

/// `size` players from the two teams of one game.
#[derive(Debug, Clone)]
pub struct GameStack {
    pub size: usize,
    pub max_exposure: Option<f64>,
    pub min_from_team: usize,
}

impl GameStack {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            max_exposure: None,
            min_from_team: 1,
        }
    }

    pub fn max_exposure(mut self, max_exposure: f64) -> Self {
        self.max_exposure = Some(max_exposure);
        self
    }

    pub fn min_from_team(mut self, min_from_team: usize) -> Self {
        self.min_from_team = min_from_team;
        self
    }

    fn build(&self, players: &[Player]) -> Result<Stack> {
        let mut games: Vec<&GameInfo> = Vec::new();
        for game in players.iter().filter_map(|p| p.game_info.as_ref()) {
            if !games.contains(&game) {
                games.push(game);
            }
        }

        let mut stack = Stack::new(Vec::new()).max_exposure(self.max_exposure);
        for game in games {
            let in_game = |team: &str| -> Vec<Player> {
                players
                    .iter()
                    .filter(|p| p.team == team && p.game_info.as_ref() == Some(game))
                    .cloned()
                    .collect()
            };
            let home = in_game(&game.home_team);
            let away = in_game(&game.away_team);
            if home.len() < self.min_from_team
                || away.len() < self.min_from_team
                || home.len() + away.len() < self.size
            {
                continue;
            }
            let both: Vec<Player> = home.iter().chain(away.iter()).cloned().collect();
            let id = format!("game_{}_{}", game.away_team, game.home_team);
            let mut leaves = Vec::with_capacity(3);
            if self.min_from_team > 0 {
                leaves.push(PlayersGroup::new(&format!("{id}_home"), home, Some(self.min_from_team), None));
                leaves.push(PlayersGroup::new(&format!("{id}_away"), away, Some(self.min_from_team), None));
            }
            leaves.push(PlayersGroup::new(&format!("{id}_all"), both, Some(self.size), None));
            stack.groups.push(NestedPlayersGroup::new(&id, leaves).into());
        }
        Ok(stack)
    }

    fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(OptimizerError::config("game stack size must be positive"));
        }
        if 2 * self.min_from_team > self.size {
            return Err(OptimizerError::config(format!(
                "min_from_team {} can't be satisfied by a game stack of {}",
                self.min_from_team, self.size
            )));
        }
        validate_fraction("game stack", self.max_exposure)
    }
}

/// A stack as configured on the optimizer.
#[derive(Debug, Clone)]
pub enum StackSpec {
    Team(TeamStack),
    Positions(PositionsStack),
    Game(GameStack),
    Custom(Stack),
}

impl StackSpec {
    /// Expand the declaration against the players of a run.
    pub fn build(&self, players: &[Player]) -> Result<Stack> {
        let stack = match self {
            StackSpec::Team(stack) => stack.build(players)?,
            StackSpec::Positions(stack) => stack.build(players)?,
            StackSpec::Game(stack) => stack.build(players)?,
            StackSpec::Custom(stack) => stack.clone(),
        };
        if stack.groups.is_empty() {
            return Err(OptimizerError::config(format!(
                "{} has no eligible players to stack",
                self.kind()
            )));
        }
        Ok(stack)
    }

    pub fn validate(
        &self,
        settings: &Settings,
        known_teams: &BTreeSet<String>,
        known_positions: &BTreeSet<String>,
    ) -> Result<()> {
        match self {
            StackSpec::Team(stack) => {
                stack.validate(settings, known_teams)?;
                if let Some(position) = stack
                    .for_positions
                    .iter()
                    .flatten()
                    .find(|p| !known_positions.contains(*p))
                {
                    return Err(OptimizerError::InvalidPosition {
                        position: position.clone(),
                    });
                }
                Ok(())
            }
            StackSpec::Positions(stack) => stack.validate(settings, known_teams, known_positions),
            StackSpec::Game(stack) => stack.validate(),
            StackSpec::Custom(stack) => validate_custom(stack),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            StackSpec::Team(_) => "team stack",
            StackSpec::Positions(_) => "positions stack",
            StackSpec::Game(_) => "game stack",
            StackSpec::Custom(_) => "stack",
        }
    }
}

impl From<TeamStack> for StackSpec {
    fn from(stack: TeamStack) -> Self {
        StackSpec::Team(stack)
    }
}

impl From<PositionsStack> for StackSpec {
    fn from(stack: PositionsStack) -> Self {
        StackSpec::Positions(stack)
    }
}

impl From<GameStack> for StackSpec {
    fn from(stack: GameStack) -> Self {
        StackSpec::Game(stack)
    }
}

impl From<Stack> for StackSpec {
    fn from(stack: Stack) -> Self {
        StackSpec::Custom(stack)
    }
}

/// Roster orders `start, start + 1, ...` wrapping past `max_order`.
fn cyclic_window(start: u32, width: u32, max_order: u32) -> Vec<u32> {
    (0..width.min(max_order))
        .map(|offset| (start - 1 + offset) % max_order + 1)
        .collect()
}

fn selected_teams(players: &[Player], for_teams: Option<&[String]>) -> Vec<String> {
    let present: BTreeSet<&str> = players.iter().map(|p| p.team.as_str()).collect();
    match for_teams {
        Some(teams) => teams
            .iter()
            .filter(|t| present.contains(t.as_str()))
            .cloned()
            .collect(),
        None => present.into_iter().map(str::to_string).collect(),
    }
}

fn validate_teams<'a>(
    teams: impl Iterator<Item = &'a String>,
    known_teams: &BTreeSet<String>,
) -> Result<()> {
    for team in teams {
        if !known_teams.contains(team) {
            return Err(OptimizerError::InvalidTeam { team: team.clone() });
        }
    }
    Ok(())
}

fn validate_fraction(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(OptimizerError::InvalidExposure {
            name: name.to_string(),
            message: format!("{v} is outside 0..1"),
        }),
        _ => Ok(()),
    }
}

fn validate_custom(stack: &Stack) -> Result<()> {
    if stack.groups.is_empty() {
        return Err(OptimizerError::config("stack needs at least one group"));
    }
    let mut ids = BTreeSet::new();
    for group in &stack.groups {
        if !ids.insert(group.id()) {
            return Err(OptimizerError::config(format!("duplicate group id {}", group.id())));
        }
        validate_fraction(group.id(), group.max_exposure())?;
        for leaf in group.leaves() {
            if let (Some(min), Some(max)) = (leaf.min, leaf.max) {
                if min > max {
                    return Err(OptimizerError::config(format!(
                        "group {} needs {min} players but allows only {max}",
                        group.id()
                    )));
                }
            }
            if leaf.min.is_some_and(|min| min > leaf.players.len()) {
                return Err(OptimizerError::config(format!(
                    "group {} has fewer players than its minimum",
                    group.id()
                )));
            }
        }
    }
    validate_fraction("stack", stack.max_exposure)
}
