//! Deterministic keyword parser and explanation template.
//!
//! Used whenever no external collaborator is configured or it returns nothing
//! usable. Both are pure functions of their input.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Operation, SeriesTarget, SolveStatus};
use crate::error::CollaboratorError;

use super::collaborators::{ExplanationRequest, Explainer, OperationProposer};

static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*%").expect("valid percent pattern"));

static HOUR_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:from|at)\s+(\d{1,2}).*?(?:to)\s+(\d{1,2})").expect("valid hour pattern")
});

static DECIMAL_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d$").expect("valid digit pattern"));

/// Hours used by a shift question that names none.
pub const DEFAULT_SHIFT_HOURS: (usize, usize) = (13, 14);

/// Keyword parser. Produces zero or one operation per question.
///
/// Keywords are checked in order `import`, `export`, `pv`, `shift`, each as a
/// plain substring of the lower-cased question, and only when a percentage
/// token is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedParser;

impl RuleBasedParser {
    pub fn parse(&self, question: &str) -> Vec<Operation> {
        let q = question.to_lowercase();
        let Some(pct) = first_percentage(&q) else {
            return Vec::new();
        };

        let op = if q.contains("import") {
            scale(SeriesTarget::Pimp, pct)
        } else if q.contains("export") {
            scale(SeriesTarget::Pexp, pct)
        } else if q.contains("pv") {
            scale(SeriesTarget::Pv, pct)
        } else if q.contains("shift") {
            let (from_hour, to_hour) = hour_pair(&q).unwrap_or(DEFAULT_SHIFT_HOURS);
            Operation::ShiftLoad {
                percentage: pct,
                from_hour,
                to_hour,
            }
        } else {
            return Vec::new();
        };
        vec![op]
    }
}

fn scale(target: SeriesTarget, scale_pct: f64) -> Operation {
    Operation::ScaleSeries { target, scale_pct }
}

fn first_percentage(q: &str) -> Option<f64> {
    PERCENT
        .captures(q)
        .and_then(|caps| caps.get(1))
        .and_then(|m| ascii_digits(m.as_str()).parse().ok())
}

fn hour_pair(q: &str) -> Option<(usize, usize)> {
    let caps = HOUR_PAIR.captures(q)?;
    let from = ascii_digits(caps.get(1)?.as_str()).parse().ok()?;
    let to = ascii_digits(caps.get(2)?.as_str()).parse().ok()?;
    Some((from, to))
}

/// Rewrites every decimal digit `\d` accepts, in any script, as its ASCII form.
fn ascii_digits(token: &str) -> String {
    token
        .chars()
        .map(|c| {
            decimal_value(c)
                .and_then(|d| char::from_digit(d, 10))
                .unwrap_or(c)
        })
        .collect()
}

/// Decimal digits occupy contiguous zero-to-nine runs of code points, so the
/// value is the distance from the start of the run, modulo ten.
fn decimal_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    let is_digit = |ch: char| DECIMAL_DIGIT.is_match(ch.encode_utf8(&mut [0u8; 4]));
    if !is_digit(c) {
        return None;
    }
    let offset = (1..)
        .map_while(|back| (c as u32).checked_sub(back).and_then(char::from_u32))
        .take_while(|&prev| is_digit(prev))
        .count();
    Some((offset % 10) as u32)
}

impl OperationProposer for RuleBasedParser {
    fn propose(&self, question: &str) -> Result<Vec<Operation>, CollaboratorError> {
        Ok(self.parse(question))
    }
}

/// Template explanation: what changed, how the solve ended, and the cost
/// relative to the baseline when one is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedExplainer;

impl RuleBasedExplainer {
    pub fn render(&self, request: &ExplanationRequest<'_>) -> String {
        let change = if request.operations.is_empty() {
            "No modification was applied (baseline scenario).".to_string()
        } else {
            format!(
                "{}.",
                request.operations.iter().map(Operation::describe).join("; ")
            )
        };

        let result = request.result;
        let currency = request.currency;
        let outcome = match result.status {
            SolveStatus::Optimal => {
                let mut text = format!("Optimal total cost: {currency} {:.2}.", result.objective);
                if let Some(base) = request.baseline_objective.filter(|b| b.is_finite()) {
                    text.push(' ');
                    text.push_str(&baseline_comparison(result.objective, base, currency));
                }
                text
            }
            SolveStatus::Infeasible => {
                let mut text = "The optimization could not find a feasible solution (status: infeasible).".to_string();
                let conflicts = result
                    .diagnostics
                    .as_ref()
                    .map(|d| d.conflicting_constraints.as_slice())
                    .unwrap_or_default();
                if !conflicts.is_empty() {
                    text.push_str(&format!(" Conflicting constraints: {}.", conflicts.join(", ")));
                }
                text
            }
            SolveStatus::Unbounded => {
                "The optimization problem is unbounded (status: unbounded); cost can decrease without limit.".to_string()
            }
            SolveStatus::Other => {
                let detail = result
                    .diagnostics
                    .as_ref()
                    .and_then(|d| d.backend_status.as_deref())
                    .map(|s| format!(", solver reported: {s}"))
                    .unwrap_or_default();
                format!("The solver stopped without an optimal solution (status: other{detail}).")
            }
            SolveStatus::Error => format!(
                "The solver failed (status: error): {}.",
                result.error.as_deref().unwrap_or("unknown error")
            ),
        };

        format!("{change} {outcome}")
    }
}

fn baseline_comparison(objective: f64, base: f64, currency: &str) -> String {
    if base.abs() < 1e-9 {
        return format!("The baseline cost is {currency} {base:.2}.");
    }
    let pct = (objective - base) / base.abs() * 100.0;
    if pct.abs() < 0.05 {
        format!("This is the same as the baseline cost of {currency} {base:.2}.")
    } else {
        let direction = if pct > 0.0 { "higher" } else { "lower" };
        format!(
            "This is {:.1}% {direction} than the baseline cost of {currency} {base:.2}.",
            pct.abs()
        )
    }
}

impl Explainer for RuleBasedExplainer {
    fn explain(&self, request: &ExplanationRequest<'_>) -> Result<String, CollaboratorError> {
        Ok(self.render(request))
    }
}
