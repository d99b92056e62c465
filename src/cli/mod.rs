//! CLI argument definitions and parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::exposure::ExposureStrategyKind;

/// Player and settings inputs shared between commands.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// JSON file with the player pool.
    #[clap(long, short = 'p')]
    pub players: PathBuf,

    /// Site settings JSON (or set `DFS_OPTIMIZER_SETTINGS` env var).
    #[clap(long, short = 's')]
    pub settings: Option<PathBuf>,

    /// Default max exposure for players without their own (0..1).
    #[clap(long)]
    pub max_exposure: Option<f64>,

    /// How max exposure is enforced across the run.
    #[clap(long, value_enum, default_value_t = ExposureStrategyKind::Total)]
    pub exposure_strategy: ExposureStrategyKind,

    /// Keep injured players in the pool.
    #[clap(long)]
    pub with_injured: bool,
}

/// Output selection shared between commands.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output lineups as JSON instead of text tables.
    #[clap(long)]
    pub json: bool,

    /// Also write lineups to a file (`.json` for JSON, anything else CSV).
    #[clap(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate lineups for a slate.
    Optimize {
        #[clap(flatten)]
        input: InputArgs,

        #[clap(flatten)]
        output: OutputArgs,

        /// Number of lineups to generate.
        #[clap(long = "count", short = 'n', default_value_t = 1)]
        count: usize,

        /// Randomize projections within each player's deviation.
        #[clap(long)]
        random: bool,

        /// Seed for randomized projections.
        #[clap(long)]
        seed: Option<u64>,

        /// Largest number of players two lineups may share.
        #[clap(long)]
        max_repeating_players: Option<usize>,

        /// Minimum total salary of a lineup.
        #[clap(long)]
        min_salary: Option<f64>,

        /// Require this many players from one team.
        #[clap(long)]
        team_stack: Option<usize>,

        /// Print player and team usage after the lineups.
        #[clap(long)]
        stats: bool,
    },

    /// Re-optimize entered lineups, keeping players whose games started.
    LateSwap {
        #[clap(flatten)]
        input: InputArgs,

        #[clap(flatten)]
        output: OutputArgs,

        /// JSON file with the entered lineups.
        #[clap(long, short = 'l')]
        lineups: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "dfs-optimizer", about = "Daily fantasy sports lineup optimizer")]
pub struct Cli {
    /// Log at debug level (`RUST_LOG` takes precedence).
    #[clap(long, short, global = true)]
    pub verbose: bool,

    /// Log line format on stderr.
    #[clap(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[clap(subcommand)]
    pub command: Commands,
}
