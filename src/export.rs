//! Lineup rendering: console printing and file export.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::models::{Lineup, LineupPosition};

/// Renders a lineup as text.
pub trait LineupPrinter {
    fn print_lineup(&self, lineup: &Lineup) -> String;

    fn print_lineups(&self, lineups: &[Lineup]) -> String {
        lineups
            .iter()
            .enumerate()
            .map(|(i, lineup)| format!("Lineup {}\n{}", i + 1, self.print_lineup(lineup)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One row per player followed by the lineup totals.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLineupPrinter;

impl LineupPrinter for DefaultLineupPrinter {
    fn print_lineup(&self, lineup: &Lineup) -> String {
        let mut out = String::new();
        for (i, lp) in lineup.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>2}. {:<6} {:<28} {:<8} {:<5} {:>8.3} {:>8.0}",
                i + 1,
                lp.lineup_position,
                lp.player.name,
                lp.player.positions.join("/"),
                lp.player.team,
                lp.used_fppg,
                lp.player.salary,
            );
        }
        let _ = writeln!(
            out,
            "Fantasy Points {:.3}",
            lineup.actual_fantasy_points_projection()
        );
        let _ = writeln!(out, "Salary {:.0}", lineup.salary_costs());
        out
    }
}

/// Writes lineups to a file or stream.
pub trait LineupExporter {
    fn export<W: Write>(&self, lineups: &[Lineup], writer: W) -> Result<()>;

    fn export_to_file(&self, lineups: &[Lineup], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.export(lineups, BufWriter::new(file))
    }
}

/// CSV with one column per slot and trailing salary and points columns.
/// Cells read `Name(id)`.
#[derive(Debug, Clone)]
pub struct CsvLineupExporter {
    slots: Vec<LineupPosition>,
}

impl CsvLineupExporter {
    pub fn new(slots: Vec<LineupPosition>) -> Self {
        Self { slots }
    }

    fn header(&self, lineups: &[Lineup]) -> Vec<String> {
        let mut header: Vec<String> = if self.slots.is_empty() {
            lineups
                .first()
                .map(|l| l.iter().map(|lp| lp.lineup_position.clone()).collect())
                .unwrap_or_default()
        } else {
            self.slots.iter().map(|s| s.name.clone()).collect()
        };
        header.push("Budget Used".to_string());
        header.push("Fantasy Points".to_string());
        header
    }
}

impl LineupExporter for CsvLineupExporter {
    fn export<W: Write>(&self, lineups: &[Lineup], mut writer: W) -> Result<()> {
        writeln!(writer, "{}", csv_row(self.header(lineups)))?;
        for lineup in lineups {
            let mut row: Vec<String> = lineup
                .iter()
                .map(|lp| format!("{}({})", lp.player.name, lp.player.id))
                .collect();
            row.push(format!("{:.0}", lineup.salary_costs()));
            row.push(format!("{:.3}", lineup.actual_fantasy_points_projection()));
            writeln!(writer, "{}", csv_row(row))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonSlot<'a> {
    slot: &'a str,
    id: &'a str,
    name: &'a str,
    team: &'a str,
    salary: f64,
    fppg: f64,
}

#[derive(Serialize)]
struct JsonLineup<'a> {
    players: Vec<JsonSlot<'a>>,
    salary: f64,
    fantasy_points: f64,
}

/// Pretty JSON array. The `slot`/`id` pairs can be read back as late-swap
/// input.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLineupExporter;

impl LineupExporter for JsonLineupExporter {
    fn export<W: Write>(&self, lineups: &[Lineup], mut writer: W) -> Result<()> {
        let rows: Vec<JsonLineup<'_>> = lineups
            .iter()
            .map(|lineup| JsonLineup {
                players: lineup
                    .iter()
                    .map(|lp| JsonSlot {
                        slot: &lp.lineup_position,
                        id: &lp.player.id,
                        name: &lp.player.name,
                        team: &lp.player.team,
                        salary: lp.player.salary,
                        fppg: lp.used_fppg,
                    })
                    .collect(),
                salary: lineup.salary_costs(),
                fantasy_points: lineup.actual_fantasy_points_projection(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut writer, &rows)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn csv_row(cells: Vec<String>) -> String {
    cells
        .into_iter()
        .map(|cell| {
            if cell.contains(&[',', '"', '\n'][..]) {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
