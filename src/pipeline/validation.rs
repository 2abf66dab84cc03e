use crate::domain::Operation;
use crate::error::ScenarioError;

/// Reject empty or oversized questions before any collaborator sees them.
pub fn validate_question(question: &str, max_chars: usize) -> Result<(), ScenarioError> {
    if question.trim().is_empty() {
        return Err(ScenarioError::InvalidInput(
            "Question cannot be empty".to_string(),
        ));
    }
    let chars = question.chars().count();
    if chars > max_chars {
        return Err(ScenarioError::InvalidInput(format!(
            "Question is too long ({chars} characters, max {max_chars})"
        )));
    }
    Ok(())
}

/// Range checks the closed `Operation` type cannot express by itself.
pub fn validate_operations(ops: &[Operation], horizon: usize) -> Result<(), ScenarioError> {
    for (i, op) in ops.iter().enumerate() {
        match *op {
            Operation::ScaleSeries { scale_pct, .. } => {
                if !scale_pct.is_finite() {
                    return Err(ScenarioError::InvalidInput(format!(
                        "scale_pct must be a finite number at index {i}"
                    )));
                }
            }
            Operation::ShiftLoad {
                percentage,
                from_hour,
                to_hour,
            } => {
                if !percentage.is_finite() {
                    return Err(ScenarioError::InvalidInput(format!(
                        "percentage must be a finite number at index {i}"
                    )));
                }
                for (field, hour) in [("from_hour", from_hour), ("to_hour", to_hour)] {
                    if hour >= horizon {
                        return Err(ScenarioError::InvalidInput(format!(
                            "{field} must be between 0 and {} at index {i}, got {hour}",
                            horizon.saturating_sub(1)
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesTarget;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   \n\t")]
    fn test_blank_questions_are_invalid(#[case] q: &str) {
        assert!(matches!(
            validate_question(q, 1000),
            Err(ScenarioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_length_limit_counts_characters() {
        let q = "é".repeat(1000);
        assert!(validate_question(&q, 1000).is_ok());
        let q = "x".repeat(1001);
        assert!(validate_question(&q, 1000).is_err());
    }

    #[test]
    fn test_operation_ranges() {
        let ok = [
            Operation::ScaleSeries {
                target: SeriesTarget::Load,
                scale_pct: -30.0,
            },
            Operation::ShiftLoad {
                percentage: 150.0,
                from_hour: 0,
                to_hour: 23,
            },
        ];
        assert!(validate_operations(&ok, 24).is_ok());

        let bad_hour = [Operation::ShiftLoad {
            percentage: 10.0,
            from_hour: 13,
            to_hour: 24,
        }];
        let err = validate_operations(&bad_hour, 24).unwrap_err();
        assert!(err.to_string().contains("to_hour"));

        let bad_pct = [Operation::ScaleSeries {
            target: SeriesTarget::Pv,
            scale_pct: f64::NAN,
        }];
        assert!(validate_operations(&bad_pct, 24).is_err());
    }
}
