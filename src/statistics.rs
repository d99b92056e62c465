//! Usage statistics over a batch of generated lineups.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::models::Lineup;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerUsage {
    pub id: String,
    pub name: String,
    pub team: String,
    pub count: usize,
    /// Share of lineups containing the player, 0..=1.
    pub exposure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamUsage {
    pub team: String,
    /// Player slots filled from this team across all lineups.
    pub players: usize,
    /// Lineups with at least one player from this team.
    pub lineups: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_lineups: usize,
    pub average_salary: f64,
    pub average_points: f64,
    pub max_points: f64,
    pub min_points: f64,
    /// Sorted by count, most used first.
    pub players: Vec<PlayerUsage>,
    pub teams: Vec<TeamUsage>,
}

impl Statistics {
    pub fn from_lineups(lineups: &[Lineup]) -> Self {
        let total = lineups.len();
        let mut players: HashMap<&str, PlayerUsage> = HashMap::new();
        let mut teams: HashMap<&str, TeamUsage> = HashMap::new();
        let mut salary = 0.0;
        let mut points = Vec::with_capacity(total);

        for lineup in lineups {
            salary += lineup.salary_costs();
            points.push(lineup.actual_fantasy_points_projection());
            let mut seen_teams: Vec<&str> = Vec::new();
            for lp in lineup.iter() {
                let p = &lp.player;
                players
                    .entry(p.id.as_str())
                    .or_insert_with(|| PlayerUsage {
                        id: p.id.clone(),
                        name: p.name.clone(),
                        team: p.team.clone(),
                        count: 0,
                        exposure: 0.0,
                    })
                    .count += 1;
                let usage = teams.entry(p.team.as_str()).or_insert_with(|| TeamUsage {
                    team: p.team.clone(),
                    players: 0,
                    lineups: 0,
                });
                usage.players += 1;
                if !seen_teams.contains(&p.team.as_str()) {
                    seen_teams.push(&p.team);
                    usage.lineups += 1;
                }
            }
        }

        let mut players: Vec<PlayerUsage> = players
            .into_values()
            .map(|mut usage| {
                usage.exposure = usage.count as f64 / total as f64;
                usage
            })
            .collect();
        players.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        let mut teams: Vec<TeamUsage> = teams.into_values().collect();
        teams.sort_by(|a, b| b.players.cmp(&a.players).then_with(|| a.team.cmp(&b.team)));

        let (average_salary, average_points) = if total == 0 {
            (0.0, 0.0)
        } else {
            (salary / total as f64, points.iter().sum::<f64>() / total as f64)
        };

        Self {
            total_lineups: total,
            average_salary,
            average_points,
            max_points: points.iter().copied().fold(0.0, f64::max),
            min_points: points.iter().copied().reduce(f64::min).unwrap_or(0.0),
            players,
            teams,
        }
    }

    pub fn player(&self, id: &str) -> Option<&PlayerUsage> {
        self.players.iter().find(|p| p.id == id)
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lineups: {}", self.total_lineups)?;
        writeln!(f, "Average salary: {:.0}", self.average_salary)?;
        writeln!(
            f,
            "Fantasy points: avg {:.2}, min {:.2}, max {:.2}",
            self.average_points, self.min_points, self.max_points
        )?;
        writeln!(f)?;
        writeln!(f, "{:<28} {:<5} {:>6} {:>8}", "Player", "Team", "Used", "Exposure")?;
        for p in &self.players {
            writeln!(
                f,
                "{:<28} {:<5} {:>6} {:>7.1}%",
                p.name,
                p.team,
                p.count,
                p.exposure * 100.0
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:<5} {:>8} {:>8}", "Team", "Players", "Lineups")?;
        for t in &self.teams {
            writeln!(f, "{:<5} {:>8} {:>8}", t.team, t.players, t.lineups)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineupPlayer, Player};

    fn lp(id: &str, team: &str, salary: f64, fppg: f64) -> LineupPlayer {
        LineupPlayer::new(Player::new(id, &format!("P{id}"), &["F"], team, salary, fppg), "F", fppg)
    }

    #[test]
    fn test_empty() {
        let stats = Statistics::from_lineups(&[]);
        assert_eq!(stats.total_lineups, 0);
        assert_eq!(stats.average_points, 0.0);
        assert!(stats.players.is_empty());
    }

    #[test]
    fn test_usage_counts() {
        let lineups = vec![
            Lineup::new(vec![lp("1", "A", 100.0, 10.0), lp("2", "A", 200.0, 20.0)]),
            Lineup::new(vec![lp("1", "A", 100.0, 10.0), lp("3", "B", 300.0, 5.0)]),
        ];
        let stats = Statistics::from_lineups(&lineups);
        assert_eq!(stats.total_lineups, 2);
        assert_eq!(stats.average_salary, 350.0);
        assert_eq!(stats.average_points, 22.5);
        assert_eq!(stats.max_points, 30.0);
        assert_eq!(stats.min_points, 15.0);

        let first = stats.player("1").unwrap();
        assert_eq!(first.count, 2);
        assert_eq!(first.exposure, 1.0);
        assert_eq!(stats.players[0].id, "1");
        assert_eq!(stats.player("3").unwrap().exposure, 0.5);

        assert_eq!(stats.teams[0], TeamUsage { team: "A".into(), players: 3, lineups: 2 });
        assert_eq!(stats.teams[1], TeamUsage { team: "B".into(), players: 1, lineups: 1 });
        assert!(stats.to_string().contains("Lineups: 2"));
    }
}
