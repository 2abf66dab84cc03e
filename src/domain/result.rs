use serde::{Deserialize, Serialize};
use strum::Display;

use crate::optimizer::SolverBackend;

/// Normalised terminal status of a solve, independent of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Other,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Constraint names of an irreducible infeasible subsystem (best effort).
    #[serde(default)]
    pub conflicting_constraints: Vec<String>,
    /// Raw backend status kept for statuses that map to `other`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_status: Option<String>,
}

/// Per-step decision values of an optimal solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub grid_import: Vec<f64>,
    pub grid_export: Vec<f64>,
    pub charge: Vec<f64>,
    pub discharge: Vec<f64>,
    pub soc: Vec<f64>,
}

impl Dispatch {
    pub fn total_import(&self) -> f64 {
        self.grid_import.iter().sum()
    }

    pub fn total_export(&self) -> f64 {
        self.grid_export.iter().sum()
    }
}

/// Outcome of one solve call. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub status: SolveStatus,
    /// Solver objective for optimal solves, `+inf` otherwise (`null` in JSON).
    #[serde(with = "objective_serde")]
    pub objective: f64,
    pub backend: SolverBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<Dispatch>,
}

impl OptimizationResult {
    pub fn optimal(backend: SolverBackend, objective: f64, dispatch: Dispatch) -> Self {
        Self {
            status: SolveStatus::Optimal,
            objective,
            backend,
            diagnostics: None,
            error: None,
            dispatch: Some(dispatch),
        }
    }

    pub fn infeasible(backend: SolverBackend, conflicting_constraints: Vec<String>) -> Self {
        Self {
            diagnostics: Some(Diagnostics {
                conflicting_constraints,
                backend_status: None,
            }),
            ..Self::non_optimal(backend, SolveStatus::Infeasible)
        }
    }

    pub fn unbounded(backend: SolverBackend) -> Self {
        Self::non_optimal(backend, SolveStatus::Unbounded)
    }

    pub fn other(backend: SolverBackend, backend_status: String) -> Self {
        Self {
            diagnostics: Some(Diagnostics {
                conflicting_constraints: Vec::new(),
                backend_status: Some(backend_status),
            }),
            ..Self::non_optimal(backend, SolveStatus::Other)
        }
    }

    pub fn error(backend: SolverBackend, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::non_optimal(backend, SolveStatus::Error)
        }
    }

    fn non_optimal(backend: SolverBackend, status: SolveStatus) -> Self {
        Self {
            status,
            objective: f64::INFINITY,
            backend,
            diagnostics: None,
            error: None,
            dispatch: None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

mod objective_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
