//! Modification engine: applies an ordered operation list to a dataset in place.

use tracing::debug;

use crate::domain::{Dataset, Operation, SeriesTarget};
use crate::error::ModificationError;

/// Apply `ops` sequentially; each operation sees the output of the previous one.
///
/// Hour indices are checked against the horizon before any series is touched
/// by that operation. Operations already applied are not rolled back on error.
pub fn apply(dataset: &mut Dataset, ops: &[Operation]) -> Result<(), ModificationError> {
    for (index, op) in ops.iter().enumerate() {
        match *op {
            Operation::ScaleSeries { target, scale_pct } => {
                let factor = Operation::scale_factor(scale_pct);
                let series = match target {
                    SeriesTarget::Pv | SeriesTarget::Pexp => &mut dataset.pv,
                    SeriesTarget::Load | SeriesTarget::Pimp => &mut dataset.load,
                };
                series.iter_mut().for_each(|v| *v *= factor);
                debug!(index, %target, factor, "scaled series");
            }
            Operation::ShiftLoad {
                percentage,
                from_hour,
                to_hour,
            } => {
                for hour in [from_hour, to_hour] {
                    if hour >= dataset.horizon || hour >= dataset.load.len() {
                        return Err(ModificationError::HourOutOfRange {
                            index,
                            hour,
                            horizon: dataset.horizon,
                        });
                    }
                }
                // No clamping: percentages above 100 may drive the source hour negative.
                let amount = dataset.load[from_hour] * percentage / 100.0;
                dataset.load[from_hour] -= amount;
                dataset.load[to_hour] += amount;
                debug!(index, from_hour, to_hour, amount, "shifted load");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scale(target: SeriesTarget, scale_pct: f64) -> Operation {
        Operation::ScaleSeries { target, scale_pct }
    }

    fn shift(percentage: f64, from_hour: usize, to_hour: usize) -> Operation {
        Operation::ShiftLoad {
            percentage,
            from_hour,
            to_hour,
        }
    }

    #[test]
    fn test_pv_scale_applies_factor_everywhere() {
        let mut data = Dataset::default();
        let before = data.pv.clone();
        apply(&mut data, &[scale(SeriesTarget::Pv, 20.0)]).unwrap();
        for (a, b) in data.pv.iter().zip(before.iter()) {
            assert!((a - b * 1.2).abs() < 1e-12);
        }
        assert_eq!(data.load, Dataset::default().load);
    }

    #[test]
    fn test_import_and_export_targets_are_reinterpreted() {
        let mut data = Dataset::default();
        apply(&mut data, &[scale(SeriesTarget::Pimp, 10.0)]).unwrap();
        assert!(data.load.iter().all(|&l| (l - 2.2).abs() < 1e-12));
        assert_eq!(data.pv, Dataset::default().pv);

        let mut data = Dataset::default();
        apply(&mut data, &[scale(SeriesTarget::Pexp, -50.0)]).unwrap();
        assert!((data.pv[9] - 1.1).abs() < 1e-12);
        assert_eq!(data.load, Dataset::default().load);
    }

    #[test]
    fn test_full_shift_empties_source_hour() {
        let mut data = Dataset::default();
        apply(&mut data, &[shift(100.0, 3, 20)]).unwrap();
        assert_eq!(data.load[3], 0.0);
        assert!((data.load[20] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_shift_over_hundred_percent_goes_negative() {
        let mut data = Dataset::default();
        apply(&mut data, &[shift(150.0, 0, 1)]).unwrap();
        assert!((data.load[0] + 1.0).abs() < 1e-12);
        assert!((data.load[1] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_sequential_shifts_differ_from_summed_shift() {
        let mut two_step = Dataset::default();
        apply(&mut two_step, &[shift(25.0, 13, 14), shift(25.0, 13, 14)]).unwrap();

        let mut one_step = Dataset::default();
        apply(&mut one_step, &[shift(50.0, 13, 14)]).unwrap();

        // 2.0 * 0.75 * 0.75 = 1.125 vs 2.0 * 0.5 = 1.0
        assert!((two_step.load[13] - 1.125).abs() < 1e-12);
        assert!((two_step.load[13] - one_step.load[13]).abs() > 1e-6);
    }

    #[test]
    fn test_out_of_range_hour_is_rejected() {
        let mut data = Dataset::default();
        let err = apply(
            &mut data,
            &[scale(SeriesTarget::Load, 10.0), shift(10.0, 5, 24)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModificationError::HourOutOfRange {
                index: 1,
                hour: 24,
                horizon: 24
            }
        );
    }

    proptest! {
        #[test]
        fn prop_pv_scale_preserves_total_ratio(p in -100.0f64..300.0) {
            let mut data = Dataset::default();
            let before: f64 = data.pv.iter().sum();
            apply(&mut data, &[scale(SeriesTarget::Pv, p)]).unwrap();
            let after: f64 = data.pv.iter().sum();
            prop_assert!((after - before * (100.0 + p) / 100.0).abs() < 1e-9);
        }

        #[test]
        fn prop_shift_conserves_total_load(p in 0.0f64..200.0, a in 0usize..24, b in 0usize..24) {
            let mut data = Dataset::default();
            let before: f64 = data.load.iter().sum();
            apply(&mut data, &[shift(p, a, b)]).unwrap();
            let after: f64 = data.load.iter().sum();
            prop_assert!((after - before).abs() < 1e-9);
        }

        #[test]
        fn prop_two_shifts_are_not_additive(p1 in 1.0f64..90.0, p2 in 1.0f64..90.0) {
            let mut two_step = Dataset::default();
            apply(&mut two_step, &[shift(p1, 13, 14), shift(p2, 13, 14)]).unwrap();
            let mut summed = Dataset::default();
            apply(&mut summed, &[shift(p1 + p2, 13, 14)]).unwrap();
            prop_assert!((two_step.load[13] - summed.load[13]).abs() > 1e-9);
        }
    }
}
