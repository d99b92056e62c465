//! Position-combination covering.
//!
//! Turns declared roster slots into "at least M selected players must be
//! eligible for some position in U" requirements. Slots with overlapping
//! eligibility (G = PG/SG, UTIL = everything) and players eligible for
//! several positions make a plain per-slot count insufficient, so the
//! requirements are computed over a lattice of position unions.

use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{LineupPosition, Player};


/// Sorted, de-duplicated set of position codes.
pub type PositionCombination = Vec<String>;

/// Largest combination handled by the partition search.
const MAX_PARTITION_WIDTH: usize = 20;

/// Distinct multi-position eligibility sets present among `players`.
pub fn multi_position_combinations<'a>(
    players: impl IntoIterator<Item = &'a Player>,
) -> BTreeSet<PositionCombination> {
    players
        .into_iter()
        .filter(|p| p.positions.len() > 1)
        .map(|p| {
            let mut combination = p.positions.clone();
            combination.sort();
            combination.dedup();
            combination
        })
        .collect()
}

/// Minimum number of players required for every position combination.
///
/// A declared combination needs its own slots plus every slot whose
/// position set is a strict subset of it. Multi-position player
/// combinations not covered by a declared slot extend the universe: it is
/// closed under pairwise unions and each new combination gets the best
/// sum over disjoint partitions into already known combinations.
pub fn positions_for_optimizer(
    slots: &[LineupPosition],
    multi_positions: &BTreeSet<PositionCombination>,
) -> BTreeMap<PositionCombination, usize> {
    let mut slot_counter: BTreeMap<PositionCombination, usize> = BTreeMap::new();
    for slot in slots {
        *slot_counter.entry(slot.combination()).or_default() += 1;
    }

    let mut required: BTreeMap<PositionCombination, usize> = slot_counter
        .iter()
        .map(|(combination, count)| {
            let narrower: usize = slot_counter
                .iter()
                .filter(|(other, _)| is_strict_subset(other, combination))
                .map(|(_, c)| c)
                .sum();
            (combination.clone(), count + narrower)
        })
        .collect();

    let extra: Vec<PositionCombination> = multi_positions
        .iter()
        .filter(|c| c.len() > 1 && !slot_counter.contains_key(*c))
        .cloned()
        .collect();
    if extra.is_empty() {
        return required;
    }

    let mut universe: BTreeSet<PositionCombination> =
        slot_counter.keys().cloned().chain(extra).collect();
    loop {
        let current: Vec<PositionCombination> = universe.iter().cloned().collect();
        let unions: Vec<PositionCombination> = current
            .iter()
            .tuple_combinations()
            .map(|(a, b)| union(a, b))
            .filter(|u| !universe.contains(u))
            .collect();
        if unions.is_empty() {
            break;
        }
        universe.extend(unions);
    }

    let mut pending: Vec<PositionCombination> = universe
        .into_iter()
        .filter(|c| !slot_counter.contains_key(c))
        .collect();
    pending.sort_by_key(|c| c.len());
    for combination in pending {
        if let Some(best) = best_partition(&combination, &required) {
            if best > 0 {
                required.insert(combination, best);
            }
        }
    }
    required
}

/// Slots left after removing one slot per filled slot name.
pub fn remaining_positions<'a>(
    slots: &[LineupPosition],
    filled: impl IntoIterator<Item = &'a str>,
) -> Vec<LineupPosition> {
    let mut remaining = slots.to_vec();
    for name in filled {
        if let Some(i) = remaining.iter().position(|slot| slot.name == name) {
            remaining.remove(i);
        }
    }
    remaining
}

/// Every position code any slot accepts.
pub fn known_positions(slots: &[LineupPosition]) -> BTreeSet<String> {
    slots
        .iter()
        .flat_map(|slot| slot.positions.iter().cloned())
        .collect()
}

fn is_strict_subset(a: &[String], b: &[String]) -> bool {
    a.len() < b.len() && a.iter().all(|p| b.contains(p))
}

fn union(a: &[String], b: &[String]) -> PositionCombination {
    let mut merged: Vec<String> = a.iter().chain(b.iter()).cloned().collect();
    merged.sort();
    merged.dedup();
    merged
}

/// Largest total requirement over partitions of `combination` into
/// disjoint known combinations, or `None` when no exact partition exists.
fn best_partition(
    combination: &[String],
    known: &BTreeMap<PositionCombination, usize>,
) -> Option<usize> {
    if combination.len() > MAX_PARTITION_WIDTH {
        return None;
    }
    let bit: HashMap<&str, u32> = combination
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), 1u32 << i))
        .collect();
    let parts: Vec<(u32, usize)> = known
        .iter()
        .filter(|(k, _)| k.len() < combination.len())
        .filter_map(|(k, count)| {
            k.iter()
                .try_fold(0u32, |mask, p| bit.get(p.as_str()).map(|b| mask | b))
                .map(|mask| (mask, *count))
        })
        .collect();

    let full = (1u32 << combination.len()) - 1;
    let mut best: Vec<Option<usize>> = vec![None; full as usize + 1];
    best[0] = Some(0);
    for mask in 1..=full {
        let lowest = mask & mask.wrapping_neg();
        best[mask as usize] = parts
            .iter()
            .filter(|(part, _)| part & lowest != 0 && part & !mask == 0)
            .filter_map(|(part, count)| best[(mask ^ part) as usize].map(|rest| rest + count))
            .max();
    }
    best[full as usize]
}
