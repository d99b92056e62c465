//! Entry point: parse CLI and dispatch to command handlers.

use clap::Parser;
use dfs_optimizer::{
    cli::{Cli, Commands},
    commands::{
        late_swap::handle_late_swap,
        optimize::{handle_optimize, OptimizeParams},
    },
    logging::LoggingConfig,
};

/// Run the CLI.
fn main() -> anyhow::Result<()> {
    let app = Cli::parse();

    let level = if app.verbose { "debug" } else { "warn" };
    LoggingConfig::new(level, app.log_format.as_str()).init();

    match app.command {
        Commands::Optimize {
            input,
            output,
            count,
            random,
            seed,
            max_repeating_players,
            min_salary,
            team_stack,
            stats,
        } => handle_optimize(OptimizeParams {
            input,
            output,
            count,
            random,
            seed,
            max_repeating_players,
            min_salary,
            team_stack,
            stats,
        })?,

        Commands::LateSwap {
            input,
            output,
            lineups,
        } => handle_late_swap(input, output, lineups)?,
    }

    Ok(())
}
