//! Shared setup and output for the command handlers.

use anyhow::{Context, Result};
use tracing::warn;

use crate::cli::{InputArgs, OutputArgs};
use crate::config::{resolve_settings_path, Settings};
use crate::export::{CsvLineupExporter, DefaultLineupPrinter, JsonLineupExporter, LineupExporter, LineupPrinter};
use crate::models::{Lineup, Player};
use crate::optimizer::{LineupIterator, LineupOptimizer, OptimizeOptions};
use crate::solver::Solver;
use crate::source::{JsonPlayerSource, PlayerSource};

/// Settings, players and run options resolved from the command line.
pub struct CommandContext {
    pub settings: Settings,
    pub source: JsonPlayerSource,
    pub players: Vec<Player>,
    pub options: OptimizeOptions,
}

impl CommandContext {
    pub fn new(input: &InputArgs) -> Result<Self> {
        let settings_path = resolve_settings_path(input.settings.clone());
        let settings = Settings::load(&settings_path)
            .with_context(|| format!("loading settings from {}", settings_path.display()))?;

        let source = JsonPlayerSource::new(&input.players);
        let players = source
            .import_players()
            .with_context(|| format!("loading players from {}", input.players.display()))?;

        let mut options = OptimizeOptions::new()
            .with_injured(input.with_injured)
            .exposure_strategy(input.exposure_strategy);
        if let Some(max_exposure) = input.max_exposure {
            options = options.max_exposure(max_exposure);
        }

        Ok(Self {
            settings,
            source,
            players,
            options,
        })
    }

    pub fn optimizer(&self) -> Result<LineupOptimizer> {
        let mut optimizer =
            LineupOptimizer::new(self.settings.clone()).context("invalid site settings")?;
        optimizer
            .load_players(self.players.clone())
            .context("loading player pool")?;
        Ok(optimizer)
    }
}

/// Drain a run. Lineups generated before a failure are kept; a run that
/// produced nothing is an error.
pub fn collect_lineups<S: Solver>(lineups: LineupIterator<'_, S>) -> Result<Vec<Lineup>> {
    let mut generated = Vec::new();
    for lineup in lineups {
        match lineup {
            Ok(lineup) => generated.push(lineup),
            Err(err) if !generated.is_empty() => {
                warn!(error = %err, generated = generated.len(), "stopping early");
                eprintln!("Warning: {err}");
                break;
            }
            Err(err) => return Err(err).context("no lineups generated"),
        }
    }
    Ok(generated)
}

/// Print lineups to stdout and write the optional export file.
pub fn emit_lineups(lineups: &[Lineup], settings: &Settings, output: &OutputArgs) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(lineups)?);
    } else {
        println!("{}", DefaultLineupPrinter.print_lineups(lineups));
    }

    if let Some(path) = &output.export {
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let written = if is_json {
            JsonLineupExporter.export_to_file(lineups, path)
        } else {
            CsvLineupExporter::new(settings.positions.clone()).export_to_file(lineups, path)
        };
        written.with_context(|| format!("exporting lineups to {}", path.display()))?;
        if !output.json {
            println!("Exported {} lineups to {}", lineups.len(), path.display());
        }
    }
    Ok(())
}
