use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Series a `scale_series` operation targets.
///
/// `Pimp` and `Pexp` have no capacity parameter in the LP; they scale the
/// load and PV series respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum SeriesTarget {
    #[serde(rename = "PV")]
    #[strum(serialize = "PV")]
    Pv,
    Load,
    Pimp,
    Pexp,
}

/// One declarative dataset mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Operation {
    ScaleSeries {
        target: SeriesTarget,
        scale_pct: f64,
    },
    ShiftLoad {
        percentage: f64,
        from_hour: usize,
        to_hour: usize,
    },
}

impl Operation {
    /// Multiplier applied by a `scale_series` of `pct` percent.
    pub fn scale_factor(pct: f64) -> f64 {
        (100.0 + pct) / 100.0
    }

    /// Plain-language description used by the rule-based explanation.
    pub fn describe(&self) -> String {
        match self {
            Operation::ScaleSeries { target, scale_pct } => {
                let subject = match target {
                    SeriesTarget::Pv => "PV generation",
                    SeriesTarget::Load => "Load demand",
                    SeriesTarget::Pimp => "Grid imports",
                    SeriesTarget::Pexp => "Grid exports",
                };
                let direction = if *scale_pct >= 0.0 { "increased" } else { "decreased" };
                format!("{subject} {direction} by {:.1}%", scale_pct.abs())
            }
            Operation::ShiftLoad {
                percentage,
                from_hour,
                to_hour,
            } => format!("{percentage:.1}% of load shifted from hour {from_hour} to hour {to_hour}"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ScaleSeries { target, scale_pct } => {
                write!(f, "scale_series(target={target}, scale_pct={scale_pct})")
            }
            Operation::ShiftLoad {
                percentage,
                from_hour,
                to_hour,
            } => write!(
                f,
                "shift_load(percentage={percentage}, from_hour={from_hour}, to_hour={to_hour})"
            ),
        }
    }
}

/// How an operation list was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ParseMethod {
    #[serde(rename = "llm-with-icl")]
    #[strum(serialize = "llm-with-icl")]
    LlmWithIcl,
    #[serde(rename = "rule-based")]
    #[strum(serialize = "rule-based")]
    RuleBased,
    /// Operations supplied directly by the caller.
    #[serde(rename = "provided")]
    #[strum(serialize = "provided")]
    Provided,
}

/// Ordered operation list plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationBundle {
    pub ops: Vec<Operation>,
    pub method: ParseMethod,
}

impl OperationBundle {
    pub fn new(ops: Vec<Operation>, method: ParseMethod) -> Self {
        Self { ops, method }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
