//! Late swap command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::common::{collect_lineups, emit_lineups, CommandContext};
use crate::cli::{InputArgs, OutputArgs};
use crate::source::PlayerSource;

/// Handle the late-swap command
pub fn handle_late_swap(input: InputArgs, output: OutputArgs, lineups: PathBuf) -> Result<()> {
    let mut ctx = CommandContext::new(&input)?;
    ctx.source = ctx.source.clone().lineups(&lineups);
    let entered = ctx
        .source
        .import_lineups(&ctx.players)
        .with_context(|| format!("loading lineups from {}", lineups.display()))?;
    if entered.is_empty() {
        println!("No lineups to swap.");
        return Ok(());
    }

    let mut optimizer = ctx.optimizer()?;
    let swapped = collect_lineups(optimizer.optimize_lineups(entered, ctx.options.clone())?)?;
    emit_lineups(&swapped, &ctx.settings, &output)
}
