//! Optimize command implementation

use anyhow::{Context, Result};

use super::common::{collect_lineups, emit_lineups, CommandContext};
use crate::cli::{InputArgs, OutputArgs};
use crate::fantasy_points::FantasyPointsStrategy;
use crate::stacks::TeamStack;

/// Parameters for the optimize command
#[derive(Debug)]
pub struct OptimizeParams {
    pub input: InputArgs,
    pub output: OutputArgs,
    pub count: usize,
    pub random: bool,
    pub seed: Option<u64>,
    pub max_repeating_players: Option<usize>,
    pub min_salary: Option<f64>,
    pub team_stack: Option<usize>,
    pub stats: bool,
}

/// Handle the optimize command
pub fn handle_optimize(params: OptimizeParams) -> Result<()> {
    let ctx = CommandContext::new(&params.input)?;
    let mut optimizer = ctx.optimizer()?;

    if params.random {
        optimizer.set_fantasy_points_strategy(FantasyPointsStrategy::random())?;
    }
    if let Some(seed) = params.seed {
        optimizer.set_seed(seed);
    }
    if let Some(max_repeating) = params.max_repeating_players {
        optimizer.set_max_repeating_players(max_repeating)?;
    }
    if let Some(min_salary) = params.min_salary {
        optimizer.set_min_salary_cap(min_salary)?;
    }
    if let Some(size) = params.team_stack {
        optimizer
            .add_stack(TeamStack::new(size))
            .with_context(|| format!("adding a team stack of {size}"))?;
    }

    let lineups = collect_lineups(optimizer.optimize(params.count, ctx.options.clone())?)?;
    emit_lineups(&lineups, &ctx.settings, &params.output)?;

    if params.stats {
        if let Some(stats) = optimizer.statistics() {
            if params.output.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{stats}");
            }
        }
    }
    Ok(())
}
