use super::{OptimizerRule, RuleEnv};
use crate::error::Result;
use crate::fantasy_points::PointsCalculator;
use crate::models::Lineup;
use crate::solver::{Solver, Variable};

/// Maximizes the sum of per-player points.
///
/// Static projections are installed once on the base model; randomized or
/// progressive ones are recomputed before every solve.
#[derive(Debug)]
pub struct ObjectiveRule {
    calculator: PointsCalculator,
}

impl ObjectiveRule {
    pub fn new(calculator: PointsCalculator) -> Self {
        Self { calculator }
    }

    fn install<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) {
        let mut variables = Vec::with_capacity(env.players.len());
        let mut coefficients = Vec::with_capacity(env.players.len());
        for (player, variable) in env.players.iter() {
            let points = self.calculator.points(player);
            env.context.players_used_fppg.insert(player.key(), points);
            variables.push(variable);
            coefficients.push(points);
        }
        solver.set_objective(&variables, &coefficients);
    }
}

impl OptimizerRule for ObjectiveRule {
    fn apply<S: Solver>(&mut self, solver: &mut S, env: &mut RuleEnv<'_>) -> Result<()> {
        if self.calculator.is_static() {
            self.install(solver, env);
        }
        Ok(())
    }

    fn apply_for_iteration<S: Solver>(
        &mut self,
        solver: &mut S,
        env: &mut RuleEnv<'_>,
        _previous: Option<&Lineup>,
    ) -> Result<()> {
        if self.calculator.is_static() {
            for (player, _) in env.players.iter() {
                env.context.players_used_fppg.insert(player.key(), player.fppg);
            }
        } else {
            self.install(solver, env);
        }
        Ok(())
    }

    fn post_optimize(&mut self, selected: &[Variable], env: &mut RuleEnv<'_>) {
        self.calculator.set_used(env.players.selected(selected));
    }
}
