//! Generic stacking: turns [`Stack`] groups into indicator constraints.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{OptimizerRule, RuleEnv};
use crate::error::Result;
use crate::exposure::{ExposureStrategyKind, ExposureTracker};
use crate::models::Lineup;
use crate::solver::{Sign, Solver, Variable};
use crate::stacks::{Leaf, Stack};

/// Every stack must fire at least one of its groups per lineup.
///
/// A group with minimums gets a binary "fired" variable `y` and leaf
/// constraints `sum(leaf) >= min * y`; maximums are plain caps. Groups
/// hanging off an anchor player are bound to that player's variable
/// instead. A group whose exposure (or its parent's, or the stack's) is
/// reached is blocked for the iteration.
#[derive(Debug)]
pub struct GenericStacksRule {
    stacks: Vec<Stack>,
    tracker: ExposureTracker,
    /// Exposure keys to mark when a fired variable is selected.
    fired: HashMap<Variable, Vec<String>>,
}

impl GenericStacksRule {
    pub fn new(stacks: Vec<Stack>, kind: ExposureStrategyKind, total_lineups: usize) -> Self {
        let mut limits = HashMap::new();
        for (s, stack) in stacks.iter().enumerate() {
            if let Some(max_exposure) = stack.max_exposure {
                limits.insert(stack_key(s), max_exposure);
            }
            for (parent, max_exposure) in &stack.parent_exposures {
                limits.insert(group_key(s, parent), *max_exposure);
            }
            for group in &stack.groups {
                if let Some(max_exposure) = group.max_exposure() {
                    limits.insert(group_key(s, group.id()), max_exposure);
                }
            }
        }
        Self {
            stacks,
            tracker: ExposureTracker::new(kind, total_lineups, limits),
            fired: HashMap::new(),
        }
    }

    fn create_constraints<S: Solver>(&mut self, solver: &mut S, env: &RuleEnv<'_>) -> Result<()> {
        self.fired.clear();
        for (s, stack) in self.stacks.iter().enumerate() {
            let mut fired_variables = Vec::new();
            let mut player_groups: BTreeMap<Variable, BTreeSet<Variable>> = BTreeMap::new();

            for group in &stack.groups {
                let mut keys = vec![group_key(s, group.id())];
                if let Some(parent) = group.parent() {
                    keys.push(group_key(s, parent));
                }
                keys.push(stack_key(s));

                let leaves: Vec<(Leaf<'_>, Vec<Variable>)> = group
                    .leaves()
                    .into_iter()
                    .map(|leaf| {
                        let variables =
                            leaf.players.iter().filter_map(|p| env.players.variable(p)).collect();
                        (leaf, variables)
                    })
                    .collect();

                if keys.iter().any(|key| self.tracker.is_reached(key)) {
                    block_group(solver, &leaves);
                    continue;
                }

                let needs_indicator = leaves
                    .iter()
                    .any(|(leaf, _)| leaf.min.is_some() && leaf.depends_on.is_none());
                let indicator = if needs_indicator {
                    let name = format!("stack_{s}_{}", group.id());
                    let y = solver.add_variable(&name, None, None)?;
                    fired_variables.push(y);
                    self.fired.insert(y, keys.clone());
                    Some(y)
                } else {
                    None
                };

                for (leaf, variables) in &leaves {
                    if let Some(anchor) = leaf.depends_on {
                        let anchor = env.players.variable(anchor);
                        add_dependency(solver, leaf, variables, anchor);
                        continue;
                    }
                    if let (Some(min), Some(y)) = (leaf.min, indicator) {
                        // sum(leaf) - min * y >= 0
                        let mut with_y = variables.clone();
                        with_y.push(y);
                        let mut coefficients = vec![1.0; variables.len()];
                        coefficients.push(-(min as f64));
                        solver.add_constraint(&with_y, Some(&coefficients), Sign::Gte, 0.0, None);

                        if !stack.can_intersect {
                            for variable in variables {
                                player_groups.entry(*variable).or_default().insert(y);
                            }
                        }
                    }
                    if let Some(max) = leaf.max {
                        solver.add_constraint(variables, None, Sign::Lte, max as f64, None);
                    }
                }
            }

            if !fired_variables.is_empty() {
                let name = format!("stack_{s}");
                solver.add_constraint(&fired_variables, None, Sign::Gte, 1.0, Some(&name));
            }
            for groups in player_groups.values() {
                if groups.len() > 1 {
                    let groups: Vec<Variable> = groups.iter().copied().collect();
                    solver.add_constraint(&groups, None, Sign::Lte, 1.0, None);
                }
            }
        }
        Ok(())
    }
}

impl OptimizerRule for GenericStacksRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        if !self.tracker.has_limits() {
            self.create_constraints(solver, env)?;
        }
        Ok(())
    }

    fn apply_for_iteration<S: Solver>(
        &mut self,
        solver: &mut S,
        env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        if self.tracker.has_limits() {
            self.create_constraints(solver, env)?;
        }
        Ok(())
    }

    fn post_optimize(&mut self, selected: &[Variable], _env: &mut RuleEnv<'_>) {
        let keys: BTreeSet<&String> = selected
            .iter()
            .filter_map(|v| self.fired.get(v))
            .flatten()
            .collect();
        let keys: Vec<String> = keys.into_iter().cloned().collect();
        self.tracker.set_used(keys);
    }
}

/// Keep a group from firing: cap its largest-minimum leaf one below the
/// minimum, or drop every player when no leaf has a minimum. For nested
/// groups that is the combined leaf, so players from the group can still be
/// picked outside the stack.
fn block_group<S: Solver>(solver: &mut S, leaves: &[(Leaf<'_>, Vec<Variable>)]) {
    let largest = leaves
        .iter()
        .filter_map(|(leaf, variables)| leaf.min.map(|min| (min, variables)))
        .max_by_key(|(min, _)| *min);
    match largest {
        Some((min, variables)) => {
            let cap = min.saturating_sub(1) as f64;
            solver.add_constraint(variables, None, Sign::Lte, cap, None);
        }
        None => {
            for (_, variables) in leaves {
                solver.add_constraint(variables, None, Sign::Lte, 0.0, None);
            }
        }
    }
}

/// Bind a group to its anchor: `sum >= min * anchor`, and in strict mode
/// `sum <= max * anchor`. A missing anchor counts as unselected.
fn add_dependency<S: Solver>(
    solver: &mut S,
    leaf: &Leaf<'_>,
    variables: &[Variable],
    anchor: Option<Variable>,
) {
    let max = leaf.max.unwrap_or(variables.len());
    let Some(anchor) = anchor else {
        if leaf.strict_depend {
            solver.add_constraint(variables, None, Sign::Lte, 0.0, None);
        }
        return;
    };
    let mut with_anchor = variables.to_vec();
    with_anchor.push(anchor);
    let mut coefficients = vec![1.0; variables.len()];
    coefficients.push(0.0);
    let last = coefficients.len() - 1;

    if let Some(min) = leaf.min {
        coefficients[last] = -(min as f64);
        solver.add_constraint(&with_anchor, Some(&coefficients), Sign::Gte, 0.0, None);
    }
    if leaf.strict_depend {
        coefficients[last] = -(max as f64);
        solver.add_constraint(&with_anchor, Some(&coefficients), Sign::Lte, 0.0, None);
    } else if leaf.max.is_some() {
        solver.add_constraint(variables, None, Sign::Lte, max as f64, None);
    }
}

fn stack_key(stack: usize) -> String {
    format!("{stack}:stack")
}

fn group_key(stack: usize, id: &str) -> String {
    format!("{stack}:{id}")
}
