//! Sequential batch evaluation over JSONL question files.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use strum::Display;
use tracing::{info, warn};

use crate::domain::ParseMethod;
use crate::optimizer::SolverBackend;
use crate::pipeline::{ScenarioOutcome, ScenarioPipeline};

/// One input line. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
struct QuestionLine {
    #[serde(default)]
    question: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Error,
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub question: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ScenarioOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl BatchRecord {
    fn is_optimal(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.result.is_optimal())
    }

    fn parse_method(&self) -> Option<ParseMethod> {
        self.outcome.as_ref().map(|o| o.operations.method)
    }
}

/// Share of questions (percent) parsed by each method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingShares {
    pub total: usize,
    pub llm_parsing: f64,
    pub rule_based_parsing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total_questions: usize,
    /// Percent of questions that ended in an optimal solve.
    pub success_rate: f64,
    pub parsing_accuracy: ParsingShares,
    /// Mean objective over optimal solves, 0 when there are none.
    pub average_cost: f64,
    pub successful_count: usize,
    pub failed_count: usize,
}

impl EvaluationReport {
    pub fn from_records(records: &[BatchRecord]) -> Self {
        let total = records.len();
        let percent = |n: usize| {
            if total == 0 {
                0.0
            } else {
                n as f64 / total as f64 * 100.0
            }
        };
        let parsed_by =
            |m: ParseMethod| records.iter().filter(|r| r.parse_method() == Some(m)).count();

        let costs: Vec<f64> = records
            .iter()
            .filter(|r| r.is_optimal())
            .filter_map(|r| r.outcome.as_ref().map(|o| o.result.objective))
            .collect();
        let successful = costs.len();
        let average_cost = if costs.is_empty() {
            0.0
        } else {
            costs.iter().sum::<f64>() / costs.len() as f64
        };

        Self {
            total_questions: total,
            success_rate: percent(successful),
            parsing_accuracy: ParsingShares {
                total,
                llm_parsing: percent(parsed_by(ParseMethod::LlmWithIcl)),
                rule_based_parsing: percent(parsed_by(ParseMethod::RuleBased)),
            },
            average_cost,
            successful_count: successful,
            failed_count: total - successful,
        }
    }
}

/// Run every question in `input` through the pipeline, one JSON record per
/// line to `output`. A pipeline rejection becomes an `error` record; an
/// unreadable input line aborts the batch.
pub fn run_batch<R: BufRead, W: Write>(
    pipeline: &ScenarioPipeline,
    backend: SolverBackend,
    input: R,
    mut output: W,
) -> Result<EvaluationReport> {
    let mut records = Vec::new();

    for (n, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("reading input line {}", n + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let QuestionLine { question } = serde_json::from_str(&line)
            .with_context(|| format!("parsing input line {}", n + 1))?;

        let record = match pipeline.run_question(&question, backend) {
            Ok(outcome) => {
                info!(
                    line = n + 1,
                    status = %outcome.result.status,
                    objective = outcome.result.objective,
                    "question processed"
                );
                BatchRecord {
                    question,
                    status: RecordStatus::Success,
                    outcome: Some(outcome),
                    error: None,
                    evaluated_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!(line = n + 1, error = %e, "question rejected");
                BatchRecord {
                    question,
                    status: RecordStatus::Error,
                    outcome: None,
                    error: Some(e.to_string()),
                    evaluated_at: Utc::now(),
                }
            }
        };

        serde_json::to_writer(&mut output, &record).context("writing result record")?;
        output.write_all(b"\n").context("writing result record")?;
        records.push(record);
    }
    output.flush().context("flushing results")?;

    let report = EvaluationReport::from_records(&records);
    info!(
        total = report.total_questions,
        success_rate = report.success_rate,
        "batch finished"
    );
    Ok(report)
}
