//! `good_lp` backend
//!
//! Builds the model through good_lp's algebraic layer (variables, expressions,
//! `constraint!`) and solves it with the bundled pure-Rust minilp solver, so no
//! system solver library is needed. good_lp does not expose IIS queries.

use good_lp::solvers::minilp::minilp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};

use crate::optimizer::backend::{LpBackend, LpFailure, LpSolution, SolverBackend};
use crate::optimizer::model::{LinearProgram, Sense, VarId};

pub struct GoodLpBackend;

fn linear_expression(handles: &[Variable], terms: &[(VarId, f64)]) -> Expression {
    terms
        .iter()
        .map(|&(v, coeff)| coeff * handles[v.0])
        .sum::<Expression>()
}

impl LpBackend for GoodLpBackend {
    fn kind(&self) -> SolverBackend {
        SolverBackend::GoodLp
    }

    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution, LpFailure> {
        let mut problem = ProblemVariables::new();
        let handles: Vec<Variable> = lp
            .variables()
            .iter()
            .map(|def| {
                let mut definition = variable().min(def.lower).name(def.name.clone());
                if def.upper.is_finite() {
                    definition = definition.max(def.upper);
                }
                problem.add(definition)
            })
            .collect();

        let objective = linear_expression(&handles, lp.objective());
        let mut model = problem.minimise(objective).using(minilp);

        for row in lp.constraints() {
            let lhs = linear_expression(&handles, &row.terms);
            let rhs = row.rhs;
            model = model.with(match row.sense {
                Sense::Eq => constraint!(lhs == rhs),
                Sense::Le => constraint!(lhs <= rhs),
                Sense::Ge => constraint!(lhs >= rhs),
            });
        }

        match model.solve() {
            Ok(solution) => {
                let values: Vec<f64> = handles.iter().map(|&v| solution.value(v)).collect();
                LpSolution::bounded(lp.objective_value(&values), values)
            }
            Err(ResolutionError::Infeasible) => Err(LpFailure::Infeasible),
            Err(ResolutionError::Unbounded) => Err(LpFailure::Unbounded),
            Err(other) => Err(LpFailure::Other(other.to_string())),
        }
    }
}
