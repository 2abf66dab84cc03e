use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use super::model::LinearProgram;
use super::strategies::{GoodLpBackend, MinilpBackend};

/// Backend selector accepted on the command line and in configuration.
///
/// `pulp` and `gurobi` are the historical selector names; `good_lp` and
/// `minilp` name the crates that actually carry the solve.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum SolverBackend {
    /// Algebraic modeling through `good_lp`.
    #[default]
    #[serde(rename = "pulp", alias = "good_lp")]
    #[strum(to_string = "pulp", serialize = "good_lp")]
    GoodLp,
    /// Row-wise construction on the `minilp` simplex, with IIS support.
    #[serde(rename = "gurobi", alias = "minilp")]
    #[strum(to_string = "gurobi", serialize = "minilp")]
    Minilp,
}

impl SolverBackend {
    pub fn instance(self) -> Box<dyn LpBackend> {
        match self {
            SolverBackend::GoodLp => Box::new(GoodLpBackend),
            SolverBackend::Minilp => Box::new(MinilpBackend),
        }
    }
}

/// Primal solution: objective plus one value per model variable, in `VarId` order.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub objective: f64,
    pub values: Vec<f64>,
}

impl LpSolution {
    /// Accepts a primal point only if every number in it is finite; a
    /// diverging simplex reports `inf`/`NaN` instead of an unbounded status.
    pub fn bounded(objective: f64, values: Vec<f64>) -> Result<Self, LpFailure> {
        if objective.is_finite() && values.iter().all(|v| v.is_finite()) {
            Ok(Self { objective, values })
        } else {
            Err(LpFailure::Unbounded)
        }
    }

    pub fn is_finite(&self) -> bool {
        self.objective.is_finite() && self.values.iter().all(|v| v.is_finite())
    }
}

/// Terminal non-optimal outcome reported by a backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LpFailure {
    #[error("infeasible")]
    Infeasible,
    #[error("unbounded")]
    Unbounded,
    /// Any other terminal status; the string is the backend's own wording.
    #[error("solver status: {0}")]
    Other(String),
    /// The backend itself failed (bad model, licensing, numerical breakdown).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Capability an LP/MILP engine exposes to the solver adapter.
pub trait LpBackend: Send + Sync {
    fn kind(&self) -> SolverBackend;

    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution, LpFailure>;

    /// Whether infeasible models may be probed for an irreducible infeasible subsystem.
    fn supports_iis(&self) -> bool {
        false
    }
}
