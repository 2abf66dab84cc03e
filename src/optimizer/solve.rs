//! Solver adapter: dataset in, normalised [`OptimizationResult`] out.
//!
//! Never returns an error and never lets a backend panic escape; every
//! outcome is folded into one of the five result statuses.

use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

use crate::domain::{Dataset, OptimizationResult};

use super::backend::{LpBackend, LpFailure, SolverBackend};
use super::formulation::MicrogridModel;
use super::iis::deletion_filter;

pub fn solve(dataset: &Dataset, backend: SolverBackend) -> OptimizationResult {
    solve_with(dataset, backend.instance().as_ref())
}

pub fn solve_with(dataset: &Dataset, backend: &dyn LpBackend) -> OptimizationResult {
    let kind = backend.kind();

    if dataset.load.len() != dataset.horizon || dataset.pv.len() != dataset.horizon {
        return OptimizationResult::error(
            kind,
            format!(
                "malformed model: series lengths ({}, {}) do not match horizon {}",
                dataset.load.len(),
                dataset.pv.len(),
                dataset.horizon
            ),
        );
    }

    let model = MicrogridModel::build(dataset);
    if let Err(reason) = model.lp.check() {
        warn!(backend = %kind, %reason, "refusing to solve malformed model");
        return OptimizationResult::error(kind, format!("malformed model: {reason}"));
    }

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| backend.solve(&model.lp))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(LpFailure::Backend(panic_message(payload.as_ref()))),
    };

    let result = match outcome {
        Ok(solution) if !solution.is_finite() => {
            warn!(backend = %kind, "non-finite solution reported as unbounded");
            OptimizationResult::unbounded(kind)
        }
        Ok(solution) => OptimizationResult::optimal(
            kind,
            solution.objective,
            model.dispatch(&solution.values),
        ),
        Err(LpFailure::Infeasible) => {
            let conflicting = if backend.supports_iis() {
                panic::catch_unwind(AssertUnwindSafe(|| deletion_filter(&model.lp, backend)))
                    .ok()
                    .flatten()
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            OptimizationResult::infeasible(kind, conflicting)
        }
        Err(LpFailure::Unbounded) => OptimizationResult::unbounded(kind),
        Err(LpFailure::Other(status)) => OptimizationResult::other(kind, status),
        Err(LpFailure::Backend(message)) => {
            warn!(backend = %kind, error = %message, "solver backend failed");
            OptimizationResult::error(kind, message)
        }
    };

    info!(
        backend = %kind,
        status = %result.status,
        objective = result.objective,
        "solve finished"
    );
    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "solver backend panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SolveStatus;
    use crate::optimizer::model::LinearProgram;
    use crate::optimizer::LpSolution;
    use rstest::rstest;

    const TOL: f64 = 1e-6;

    struct PanickingBackend;

    impl LpBackend for PanickingBackend {
        fn kind(&self) -> SolverBackend {
            SolverBackend::Minilp
        }

        fn solve(&self, _lp: &LinearProgram) -> Result<LpSolution, LpFailure> {
            panic!("license check failed");
        }
    }

    struct StatusBackend(LpFailure);

    impl LpBackend for StatusBackend {
        fn kind(&self) -> SolverBackend {
            SolverBackend::GoodLp
        }

        fn solve(&self, _lp: &LinearProgram) -> Result<LpSolution, LpFailure> {
            Err(self.0.clone())
        }
    }

    struct DivergingBackend;

    impl LpBackend for DivergingBackend {
        fn kind(&self) -> SolverBackend {
            SolverBackend::Minilp
        }

        fn solve(&self, lp: &LinearProgram) -> Result<LpSolution, LpFailure> {
            Ok(LpSolution {
                objective: f64::NAN,
                values: vec![f64::INFINITY; lp.variables().len()],
            })
        }
    }

    #[rstest]
    #[case(SolverBackend::GoodLp)]
    #[case(SolverBackend::Minilp)]
    fn test_baseline_is_optimal_and_deterministic(#[case] backend: SolverBackend) {
        let data = Dataset::default();
        let first = solve(&data, backend);
        let second = solve(&data, backend);
        assert_eq!(first.status, SolveStatus::Optimal);
        assert!(first.objective.is_finite() && first.objective > 0.0);
        assert_eq!(first.objective, second.objective);
    }

    #[test]
    fn test_backends_agree_on_objective() {
        let data = Dataset::default();
        let a = solve(&data, SolverBackend::GoodLp);
        let b = solve(&data, SolverBackend::Minilp);
        assert!((a.objective - b.objective).abs() < TOL);
    }

    #[rstest]
    #[case(SolverBackend::GoodLp)]
    #[case(SolverBackend::Minilp)]
    fn test_energy_balance_and_soc_recursion_hold(#[case] backend: SolverBackend) {
        let data = Dataset::default();
        let result = solve(&data, backend);
        let d = result.dispatch.expect("optimal solve carries dispatch");
        let eff = data.battery_efficiency;

        for t in 0..data.horizon {
            let supply = data.pv[t] + d.discharge[t] + d.grid_import[t] - d.charge[t] - d.grid_export[t];
            assert!((data.load[t] - supply).abs() < TOL, "balance violated at {t}");

            let prev = if t == 0 { data.initial_soc() } else { d.soc[t - 1] };
            let expected = prev + eff * d.charge[t] - d.discharge[t] / eff;
            assert!((d.soc[t] - expected).abs() < TOL, "soc recursion violated at {t}");
            assert!(d.soc[t] >= -TOL && d.soc[t] <= data.battery_capacity + TOL);
            assert!(d.charge[t] <= data.battery_power_limit + TOL);
            assert!(d.discharge[t] <= data.battery_power_limit + TOL);
        }

        let cost: f64 = (0..data.horizon)
            .map(|t| data.price_import * d.grid_import[t] - data.price_export * d.grid_export[t])
            .sum();
        assert!((cost - result.objective).abs() < TOL);
    }

    #[rstest]
    #[case(SolverBackend::GoodLp)]
    #[case(SolverBackend::Minilp)]
    fn test_capped_import_without_storage_is_infeasible(#[case] backend: SolverBackend) {
        let data = Dataset {
            battery_capacity: 0.0,
            import_limit: Some(0.0),
            ..Dataset::default()
        };
        let result = solve(&data, backend);
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.objective.is_infinite() && result.objective > 0.0);
        assert!(result.dispatch.is_none());
    }

    #[test]
    fn test_infeasible_diagnostics_name_balance_and_soc_rows() {
        let data = Dataset {
            battery_capacity: 0.0,
            import_limit: Some(0.0),
            ..Dataset::default()
        };
        let result = solve(&data, SolverBackend::Minilp);
        let iis = result.diagnostics.unwrap().conflicting_constraints;
        assert!(!iis.is_empty());
        assert!(iis.iter().any(|n| n.starts_with("balance_")));
        assert!(iis.iter().any(|n| n.starts_with("soc_")));

        let result = solve(&data, SolverBackend::GoodLp);
        assert!(result.diagnostics.unwrap().conflicting_constraints.is_empty());
    }

    #[rstest]
    #[case(SolverBackend::GoodLp)]
    #[case(SolverBackend::Minilp)]
    fn test_export_price_above_import_is_unbounded(#[case] backend: SolverBackend) {
        let data = Dataset {
            price_export: 0.5,
            ..Dataset::default()
        };
        let result = solve(&data, backend);
        assert_eq!(result.status, SolveStatus::Unbounded);
        assert!(result.objective.is_infinite());
    }

    #[test]
    fn test_non_finite_solution_is_unbounded_not_optimal() {
        let result = solve_with(&Dataset::default(), &DivergingBackend);
        assert_eq!(result.status, SolveStatus::Unbounded);
        assert!(result.objective.is_infinite() && result.objective > 0.0);
        assert!(result.dispatch.is_none());
    }

    #[test]
    fn test_bounded_rejects_inf_and_nan() {
        assert_eq!(LpSolution::bounded(f64::NAN, vec![1.0]), Err(LpFailure::Unbounded));
        assert_eq!(LpSolution::bounded(1.0, vec![f64::INFINITY]), Err(LpFailure::Unbounded));
        assert!(LpSolution::bounded(2.5, vec![0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_backend_panic_becomes_error_status() {
        let result = solve_with(&Dataset::default(), &PanickingBackend);
        assert_eq!(result.status, SolveStatus::Error);
        assert_eq!(result.error.as_deref(), Some("license check failed"));
        assert!(result.objective.is_infinite());
    }

    #[test]
    fn test_other_status_is_preserved() {
        let backend = StatusBackend(LpFailure::Other("iteration limit".into()));
        let result = solve_with(&Dataset::default(), &backend);
        assert_eq!(result.status, SolveStatus::Other);
        assert_eq!(
            result.diagnostics.unwrap().backend_status.as_deref(),
            Some("iteration limit")
        );
    }

    #[test]
    fn test_malformed_dataset_is_an_error_not_a_panic() {
        let data = Dataset {
            battery_efficiency: 0.0,
            ..Dataset::default()
        };
        let result = solve(&data, SolverBackend::GoodLp);
        assert_eq!(result.status, SolveStatus::Error);
        assert!(result.error.unwrap().starts_with("malformed model"));

        let mut data = Dataset::default();
        data.load.truncate(10);
        assert_eq!(solve(&data, SolverBackend::Minilp).status, SolveStatus::Error);
    }

    #[test]
    fn test_more_pv_lowers_cost() {
        let baseline = solve(&Dataset::default(), SolverBackend::GoodLp);
        let mut sunny = Dataset::default();
        crate::scenario::apply(
            &mut sunny,
            &[crate::domain::Operation::ScaleSeries {
                target: crate::domain::SeriesTarget::Pv,
                scale_pct: 20.0,
            }],
        )
        .unwrap();
        let result = solve(&sunny, SolverBackend::GoodLp);
        assert!(result.objective < baseline.objective);
    }
}
