//! Irreducible infeasible subsystem search (deletion filter).
//!
//! Variable bounds are held fixed; only named rows are candidates. Each row is
//! dropped in turn and the remainder re-solved for feasibility: if it stays
//! infeasible the row is not needed and is discarded for good. What survives is
//! minimal, since removing any single remaining row makes the set feasible.

use tracing::debug;

use super::backend::{LpBackend, LpFailure};
use super::model::LinearProgram;

/// Names of an IIS of `lp`'s rows, or `None` when the search cannot run
/// (backend errors mid-search, or the full row set turns out feasible).
pub fn deletion_filter(lp: &LinearProgram, backend: &dyn LpBackend) -> Option<Vec<String>> {
    let mut keep: Vec<usize> = (0..lp.constraints().len()).collect();
    if is_feasible(lp, &keep, backend)? {
        return None;
    }

    let mut i = 0;
    while i < keep.len() {
        let candidate = keep.remove(i);
        if is_feasible(lp, &keep, backend)? {
            keep.insert(i, candidate);
            i += 1;
        }
    }

    let names: Vec<String> = keep
        .iter()
        .map(|&row| lp.constraints()[row].name.clone())
        .collect();
    debug!(rows = names.len(), "irreducible infeasible subsystem found");
    Some(names)
}

fn is_feasible(lp: &LinearProgram, rows: &[usize], backend: &dyn LpBackend) -> Option<bool> {
    match backend.solve(&lp.feasibility_subproblem(rows)) {
        Ok(_) | Err(LpFailure::Unbounded) => Some(true),
        Err(LpFailure::Infeasible) => Some(false),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::model::Sense;
    use crate::optimizer::strategies::MinilpBackend;

    #[test]
    fn test_finds_the_conflicting_pair() {
        let mut lp = LinearProgram::new();
        let x = lp.add_var("x", 0.0, f64::INFINITY);
        let y = lp.add_var("y", 0.0, f64::INFINITY);
        lp.add_constraint("y_small", vec![(y, 1.0)], Sense::Le, 5.0);
        lp.add_constraint("x_small", vec![(x, 1.0)], Sense::Le, 1.0);
        lp.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], Sense::Ge, 1.0);
        lp.add_constraint("x_large", vec![(x, 1.0)], Sense::Ge, 3.0);

        let iis = deletion_filter(&lp, &MinilpBackend).unwrap();
        assert_eq!(iis, vec!["x_small".to_string(), "x_large".to_string()]);
    }

    #[test]
    fn test_feasible_model_has_no_iis() {
        let mut lp = LinearProgram::new();
        let x = lp.add_var("x", 0.0, 10.0);
        lp.add_constraint("ok", vec![(x, 1.0)], Sense::Le, 1.0);
        assert!(deletion_filter(&lp, &MinilpBackend).is_none());
    }
}
