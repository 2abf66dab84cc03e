//! Direct `minilp` backend
//!
//! Rows are handed to the simplex one by one, mirroring how a commercial
//! solver API is driven. Cheap re-solves make it suitable for IIS probing.

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

use crate::optimizer::backend::{LpBackend, LpFailure, LpSolution, SolverBackend};
use crate::optimizer::model::{LinearProgram, Sense};

pub struct MinilpBackend;

impl LpBackend for MinilpBackend {
    fn kind(&self) -> SolverBackend {
        SolverBackend::Minilp
    }

    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution, LpFailure> {
        let mut costs = vec![0.0; lp.variables().len()];
        for &(v, coeff) in lp.objective() {
            costs[v.0] += coeff;
        }

        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let handles: Vec<minilp::Variable> = lp
            .variables()
            .iter()
            .zip(costs)
            .map(|(def, cost)| problem.add_var(cost, (def.lower, def.upper)))
            .collect();

        for row in lp.constraints() {
            let mut expr = LinearExpr::empty();
            for &(v, coeff) in &row.terms {
                expr.add(handles[v.0], coeff);
            }
            let op = match row.sense {
                Sense::Eq => ComparisonOp::Eq,
                Sense::Le => ComparisonOp::Le,
                Sense::Ge => ComparisonOp::Ge,
            };
            problem.add_constraint(expr, op, row.rhs);
        }

        match problem.solve() {
            Ok(solution) => LpSolution::bounded(
                solution.objective(),
                handles.iter().map(|&v| solution[v]).collect(),
            ),
            Err(minilp::Error::Infeasible) => Err(LpFailure::Infeasible),
            Err(minilp::Error::Unbounded) => Err(LpFailure::Unbounded),
        }
    }

    fn supports_iis(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_lp_matches_modeler() {
        use crate::optimizer::strategies::GoodLpBackend;

        let mut lp = LinearProgram::new();
        let x = lp.add_var("x", 0.0, 4.0);
        let y = lp.add_var("y", 0.0, 4.0);
        lp.add_constraint("mix", vec![(x, 1.0), (y, 2.0)], Sense::Eq, 6.0);
        lp.add_constraint("cap", vec![(x, 1.0), (y, -1.0)], Sense::Le, 1.5);
        lp.set_objective(vec![(x, -3.0), (y, -1.0)]);

        let direct = MinilpBackend.solve(&lp).unwrap();
        let modeled = GoodLpBackend.solve(&lp).unwrap();
        assert!((direct.objective - modeled.objective).abs() < 1e-6);
        // x - y = 1.5 and x + 2y = 6 => x = 3, y = 1.5
        assert!((direct.values[0] - 3.0).abs() < 1e-6);
        assert!((direct.objective - (-10.5)).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_row_pair() {
        let mut lp = LinearProgram::new();
        let x = lp.add_var("x", 0.0, f64::INFINITY);
        lp.add_constraint("low", vec![(x, 1.0)], Sense::Le, 1.0);
        lp.add_constraint("high", vec![(x, 1.0)], Sense::Ge, 2.0);
        assert_eq!(MinilpBackend.solve(&lp), Err(LpFailure::Infeasible));
    }

    #[test]
    fn test_uncapped_arbitrage_is_unbounded() {
        let mut lp = LinearProgram::new();
        let import = lp.add_var("import", 0.0, f64::INFINITY);
        let export = lp.add_var("export", 0.0, f64::INFINITY);
        lp.add_constraint("balance", vec![(import, 1.0), (export, -1.0)], Sense::Eq, 1.0);
        lp.set_objective(vec![(import, 0.2), (export, -0.5)]);
        assert_eq!(MinilpBackend.solve(&lp), Err(LpFailure::Unbounded));
    }
}
