//! Backend-neutral linear program.
//!
//! Variables and constraint rows carry names so that backends and the IIS
//! search can report them. The objective is always minimised.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Eq,
    Le,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub lower: f64,
    /// `f64::INFINITY` when unbounded above.
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    variables: Vec<VariableDef>,
    constraints: Vec<ConstraintRow>,
    objective: Vec<(VarId, f64)>,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.variables.push(VariableDef {
            name: name.into(),
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(ConstraintRow {
            name: name.into(),
            terms,
            sense,
            rhs,
        });
    }

    pub fn set_objective(&mut self, terms: Vec<(VarId, f64)>) {
        self.objective = terms;
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn constraints(&self) -> &[ConstraintRow] {
        &self.constraints
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.iter().map(|(v, c)| c * values[v.0]).sum()
    }

    /// Same variables and bounds, only the rows at `keep`, zero objective.
    pub fn feasibility_subproblem(&self, keep: &[usize]) -> Self {
        Self {
            variables: self.variables.clone(),
            constraints: keep.iter().map(|&i| self.constraints[i].clone()).collect(),
            objective: Vec::new(),
        }
    }

    /// Reject models a solver cannot be trusted with: non-finite
    /// coefficients, NaN bounds or crossed bounds.
    pub fn check(&self) -> Result<(), String> {
        for var in &self.variables {
            if var.lower.is_nan() || var.upper.is_nan() || var.lower > var.upper {
                return Err(format!(
                    "variable {} has invalid bounds [{}, {}]",
                    var.name, var.lower, var.upper
                ));
            }
        }
        for row in &self.constraints {
            if !row.rhs.is_finite() || row.terms.iter().any(|(_, c)| !c.is_finite()) {
                return Err(format!("constraint {} has a non-finite coefficient", row.name));
            }
            if let Some((v, _)) = row.terms.iter().find(|(v, _)| v.0 >= self.variables.len()) {
                return Err(format!("constraint {} references unknown variable {}", row.name, v.0));
            }
        }
        if self.objective.iter().any(|(_, c)| !c.is_finite()) {
            return Err("objective has a non-finite coefficient".to_string());
        }
        Ok(())
    }
}
