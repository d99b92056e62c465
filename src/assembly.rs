//! Lineup assembly: mapping selected players back onto roster slots.

use itertools::Itertools;

use crate::error::{OptimizerError, Result};
use crate::models::{Lineup, LineupPlayer, LineupPosition, Player};


/// Assign every player to exactly one slot they are eligible for.
///
/// Returns, for each slot, the index of the player filling it. Slots with a
/// single eligible candidate are settled first; whatever is left is solved
/// by trying permutations of the remaining players (earliest game first)
/// against the remaining slots with a greedy left-to-right fit.
pub fn link_players_with_positions(
    players: &[Player],
    slots: &[LineupPosition],
) -> Result<Vec<usize>> {
    if players.len() != slots.len() {
        return Err(OptimizerError::LineupAssembly {
            message: format!("{} players for {} slots", players.len(), slots.len()),
        });
    }

    let mut owners: Vec<Option<usize>> = vec![None; slots.len()];
    let mut free: Vec<usize> = (0..players.len())
        .sorted_by_key(|&i| {
            let start = players[i].game_starts_at();
            (start.is_none(), start)
        })
        .collect();

    loop {
        let mut changed = false;
        for slot in 0..slots.len() {
            if owners[slot].is_some() {
                continue;
            }
            let candidates: Vec<usize> = free
                .iter()
                .copied()
                .filter(|&p| slots[slot].accepts(&players[p]))
                .collect();
            if candidates.len() == 1 {
                let only = candidates[0];
                owners[slot] = Some(only);
                free.retain(|&p| p != only);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let open: Vec<usize> = (0..slots.len()).filter(|&s| owners[s].is_none()).collect();
    if !free.is_empty() {
        let Some(picks) = first_fit(players, &free, slots, &open) else {
            return Err(OptimizerError::LineupAssembly {
                message: "no valid player-to-slot assignment".to_string(),
            });
        };
        for (slot, player) in picks {
            owners[slot] = Some(player);
        }
    }

    owners
        .into_iter()
        .map(|owner| {
            owner.ok_or_else(|| OptimizerError::LineupAssembly {
                message: "slot left unfilled".to_string(),
            })
        })
        .collect()
}

/// Place `players` into some of `slots`, leaving extra slots empty.
///
/// Returns the slot index taken by each player, or `None` when the
/// players cannot all be seated.
pub fn fit_into_slots(players: &[Player], slots: &[LineupPosition]) -> Option<Vec<usize>> {
    if players.len() > slots.len() {
        return None;
    }
    let order: Vec<usize> = (0..players.len()).collect();
    let open: Vec<usize> = (0..slots.len()).collect();
    let picks = first_fit(players, &order, slots, &open)?;
    let mut taken = vec![0; players.len()];
    for (slot, player) in picks {
        taken[player] = slot;
    }
    Some(taken)
}

/// Try every ordering of `free` players, seating each in the first open
/// slot that accepts them. Returns `(slot, player)` pairs.
fn first_fit(
    players: &[Player],
    free: &[usize],
    slots: &[LineupPosition],
    open: &[usize],
) -> Option<Vec<(usize, usize)>> {
    free.iter().copied().permutations(free.len()).find_map(|order| {
        let mut remaining = open.to_vec();
        let mut picks = Vec::with_capacity(order.len());
        for p in order {
            let i = remaining
                .iter()
                .position(|&s| slots[s].accepts(&players[p]))?;
            picks.push((remaining.remove(i), p));
        }
        Some(picks)
    })
}

/// Build a lineup from solved players.
///
/// `fixed` players keep the slot they already hold (late swap, hand
/// locks); everyone else is linked onto the remaining slots. Without a
/// slot structure each player fills their first position.
pub fn build_lineup(
    selected: Vec<(Player, f64)>,
    slots: &[LineupPosition],
    fixed: Vec<LineupPlayer>,
) -> Result<Lineup> {
    if slots.is_empty() {
        let players = fixed
            .into_iter()
            .chain(selected.into_iter().map(|(player, fppg)| {
                let slot = player.positions.first().cloned().unwrap_or_default();
                LineupPlayer::new(player, &slot, fppg)
            }))
            .collect();
        return Ok(Lineup::new(players));
    }

    let mut taken = vec![false; slots.len()];
    let mut placed: Vec<Option<LineupPlayer>> = vec![None; slots.len()];
    for lineup_player in fixed {
        let Some(i) = (0..slots.len())
            .find(|&i| !taken[i] && slots[i].name == lineup_player.lineup_position)
        else {
            return Err(OptimizerError::LineupAssembly {
                message: format!(
                    "no {} slot left for {}",
                    lineup_player.lineup_position, lineup_player.player
                ),
            });
        };
        taken[i] = true;
        placed[i] = Some(lineup_player);
    }

    let open: Vec<usize> = (0..slots.len()).filter(|&i| !taken[i]).collect();
    let open_slots: Vec<LineupPosition> = open.iter().map(|&i| slots[i].clone()).collect();
    let (players, points): (Vec<Player>, Vec<f64>) = selected.into_iter().unzip();
    let owners = link_players_with_positions(&players, &open_slots)?;
    for (k, owner) in owners.into_iter().enumerate() {
        let slot = open[k];
        placed[slot] = Some(LineupPlayer::new(
            players[owner].clone(),
            &slots[slot].name,
            points[owner],
        ));
    }

    Ok(Lineup::new(placed.into_iter().flatten().collect()))
}
