//! Command-line surface of the `whatif` binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use itertools::{izip, Itertools};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

use crate::batch::{run_batch, EvaluationReport};
use crate::config::Config;
use crate::domain::{Dispatch, OptimizationResult};
use crate::optimizer::SolverBackend;
use crate::pipeline::{ScenarioOutcome, ScenarioPipeline};

#[derive(Parser, Debug)]
#[command(name = "whatif")]
#[command(author, version, about = "Answer what-if questions about a microgrid schedule")]
#[command(
    long_about = "Translate a what-if question into data modifications, re-optimize the \
    24h microgrid dispatch and explain the cost impact.\n\
    \nExamples:\n  \
    whatif ask -q \"What happens if PV generation increases by 20%?\"\n  \
    whatif --solver gurobi --format text ask -q \"Shift 25% of load from 13 to 14\"\n  \
    whatif --output results.jsonl batch --input questions.jsonl\n  \
    whatif baseline --format yaml"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Solver backend: pulp (default) or gurobi
    #[arg(long, global = true)]
    pub solver: Option<SolverBackend>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(long, short, global = true)]
    pub output: Option<PathBuf>,

    /// Log prompts, collaborator responses and solver details
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question
    Ask {
        #[arg(short, long)]
        question: String,
    },

    /// Answer every question of a JSONL file (`{"question": ...}` per line)
    Batch {
        #[arg(long)]
        input: PathBuf,
    },

    /// Solve the unmodified scenario
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Text,
}

pub fn run(cli: Cli, config: Config) -> Result<()> {
    let pipeline = ScenarioPipeline::from_config(config);
    let backend = cli.solver.unwrap_or_else(|| pipeline.default_backend());

    match &cli.command {
        Commands::Ask { question } => {
            let outcome = pipeline.run_question(question, backend)?;
            let rendered = render(&outcome, cli.format, || outcome_text(&outcome))?;
            emit(cli.output.as_ref(), &rendered)
        }
        Commands::Batch { input } => {
            let reader = BufReader::new(
                File::open(input).with_context(|| format!("opening {}", input.display()))?,
            );
            let report = match &cli.output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let report = run_batch(&pipeline, backend, reader, BufWriter::new(file))?;
                    info!(path = %path.display(), "batch results written");
                    report
                }
                None => run_batch(&pipeline, backend, reader, io::stdout().lock())?,
            };
            let rendered = render(&report, cli.format, || report_text(&report))?;
            if cli.output.is_some() {
                emit(None, &rendered)
            } else {
                eprintln!("{rendered}");
                Ok(())
            }
        }
        Commands::Baseline => {
            let result = pipeline.baseline(backend)?;
            let currency = &pipeline.config().prices.currency;
            let rendered = render(&result, cli.format, || result_text(&result, currency))?;
            emit(cli.output.as_ref(), &rendered)
        }
    }
}

fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: impl FnOnce() -> String,
) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Text => text(),
    })
}

fn emit(path: Option<&PathBuf>, rendered: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, format!("{rendered}\n"))
            .with_context(|| format!("writing {}", path.display())),
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{rendered}")?;
            Ok(())
        }
    }
}

fn outcome_text(outcome: &ScenarioOutcome) -> String {
    let mut lines = Vec::new();
    if let Some(q) = &outcome.question {
        lines.push(format!("Question:    {q}"));
    }
    let ops = if outcome.operations.is_empty() {
        "none".to_string()
    } else {
        outcome.operations.ops.iter().map(|op| op.describe()).join("; ")
    };
    lines.push(format!("Operations:  {ops} ({})", outcome.operations.method));
    lines.push(format!("Status:      {}", outcome.result.status));
    if outcome.result.is_optimal() {
        lines.push(format!("Objective:   {:.4}", outcome.result.objective));
    }
    if let Some(base) = outcome.baseline_objective {
        lines.push(format!("Baseline:    {base:.4}"));
    }
    lines.push(String::new());
    lines.push(format!(
        "{} ({})",
        outcome.explanation.text, outcome.explanation.method
    ));
    if let Some(dispatch) = &outcome.result.dispatch {
        lines.push(String::new());
        lines.push(dispatch_table(dispatch));
    }
    lines.join("\n")
}

fn result_text(result: &OptimizationResult, currency: &str) -> String {
    let mut text = format!("Status: {} (backend {})", result.status, result.backend);
    if result.is_optimal() {
        text.push_str(&format!("\nTotal cost: {currency} {:.2}", result.objective));
    }
    if let Some(err) = &result.error {
        text.push_str(&format!("\nError: {err}"));
    }
    if let Some(d) = &result.diagnostics {
        if !d.conflicting_constraints.is_empty() {
            text.push_str(&format!(
                "\nConflicting constraints: {}",
                d.conflicting_constraints.join(", ")
            ));
        }
    }
    if let Some(dispatch) = &result.dispatch {
        text.push_str("\n\n");
        text.push_str(&dispatch_table(dispatch));
    }
    text
}

fn dispatch_table(d: &Dispatch) -> String {
    let header = format!(
        "{:>4} {:>8} {:>8} {:>8} {:>9} {:>8}",
        "t", "import", "export", "charge", "discharge", "soc"
    );
    let rows = izip!(&d.grid_import, &d.grid_export, &d.charge, &d.discharge, &d.soc)
        .enumerate()
        .map(|(t, (imp, exp, c, dis, soc))| {
            format!("{t:>4} {imp:>8.3} {exp:>8.3} {c:>8.3} {dis:>9.3} {soc:>8.3}")
        });
    std::iter::once(header).chain(rows).join("\n")
}

fn report_text(report: &EvaluationReport) -> String {
    format!(
        "Questions:     {}\n\
         Optimal:       {} ({:.1}%)\n\
         Failed:        {}\n\
         Parsing:       {:.1}% llm, {:.1}% rule-based\n\
         Average cost:  {:.4}",
        report.total_questions,
        report.successful_count,
        report.success_rate,
        report.failed_count,
        report.parsing_accuracy.llm_parsing,
        report.parsing_accuracy.rule_based_parsing,
        report.average_cost,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Dataset;
    use crate::optimizer::solve;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "whatif",
            "ask",
            "-q",
            "PV up 20%",
            "--solver",
            "gurobi",
            "--format",
            "text",
        ])
        .unwrap();
        assert_eq!(cli.solver, Some(SolverBackend::Minilp));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(matches!(cli.command, Commands::Ask { ref question } if question == "PV up 20%"));
    }

    #[test]
    fn test_cli_rejects_unknown_solver() {
        assert!(Cli::try_parse_from(["whatif", "--solver", "cplex", "baseline"]).is_err());
    }

    #[test]
    fn test_result_text_includes_dispatch_rows() {
        let result = solve(&Dataset::default(), SolverBackend::GoodLp);
        let text = result_text(&result, "EUR");
        assert!(text.starts_with("Status: optimal (backend pulp)"));
        assert!(text.contains("Total cost: EUR"));
        // header plus one row per step
        let table = text.split("\n\n").nth(1).unwrap();
        assert_eq!(table.lines().count(), 25);
    }

    #[test]
    fn test_yaml_rendering_of_non_optimal_result() {
        let result = OptimizationResult::unbounded(SolverBackend::GoodLp);
        let yaml = render(&result, OutputFormat::Yaml, String::new).unwrap();
        assert!(yaml.contains("status: unbounded"));
        assert!(yaml.contains("objective: null"));
    }
}
