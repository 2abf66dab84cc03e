//! Scenario pipeline
//!
//! One request walks `validate -> obtain operations -> mutate dataset -> solve
//! -> explain`. Only invalid input and a modification contract violation stop
//! it; collaborator failures degrade to the rule-based path and solver
//! failures come back as a non-optimal result.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::domain::{Dataset, Operation, OperationBundle, OptimizationResult, ParseMethod};
use crate::error::ScenarioError;
use crate::optimizer::{solve, SolverBackend};
use crate::scenario;

use super::collaborators::{
    Explainer, Explanation, ExplanationMethod, ExplanationRequest, OperationProposer,
};
use super::llm::{load_icl_examples, LlmExplainer, LlmOperationParser, OpenAiChat};
use super::rule_based::{RuleBasedExplainer, RuleBasedParser};
use super::validation::{validate_operations, validate_question};

/// Everything a caller gets back for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub operations: OperationBundle,
    pub result: OptimizationResult,
    pub explanation: Explanation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_objective: Option<f64>,
}

pub struct ScenarioPipeline {
    config: Config,
    parser: Option<Box<dyn OperationProposer>>,
    explainer: Option<Box<dyn Explainer>>,
}

impl ScenarioPipeline {
    /// Pipeline with no external collaborators: fully deterministic.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            parser: None,
            explainer: None,
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn OperationProposer>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_explainer(mut self, explainer: Box<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    /// Wire the LLM collaborators when an API key is configured.
    pub fn from_config(config: Config) -> Self {
        let chat = match OpenAiChat::from_config(&config.llm) {
            Ok(chat) => chat,
            Err(e) => {
                warn!(error = %e, "LLM client unavailable, using rule-based collaborators");
                None
            }
        };

        let mut pipeline = Self::new(config);
        if let Some(chat) = chat {
            let examples = load_icl_examples(&pipeline.config.llm.icl_path);
            info!(
                model = %pipeline.config.llm.model,
                icl_examples = examples.len(),
                "LLM collaborators enabled"
            );
            let horizon = pipeline.config.optimization.horizon;
            pipeline = pipeline
                .with_parser(Box::new(LlmOperationParser::new(
                    chat.clone(),
                    examples,
                    horizon,
                )))
                .with_explainer(Box::new(LlmExplainer::new(chat)));
        }
        pipeline
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn default_backend(&self) -> SolverBackend {
        self.config.optimization.default_backend
    }

    /// A new dataset built from configuration; never shared between requests.
    pub fn fresh_dataset(&self) -> Result<Dataset, ScenarioError> {
        let dataset = Dataset::from_config(&self.config);
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn run_question(
        &self,
        question: &str,
        backend: SolverBackend,
    ) -> Result<ScenarioOutcome, ScenarioError> {
        let span = info_span!("scenario", request_id = %Uuid::new_v4(), %backend);
        let _guard = span.enter();

        validate_question(question, self.config.pipeline.max_question_chars)?;
        let operations = self.obtain_operations(question)?;
        info!(
            method = %operations.method,
            ops = operations.ops.len(),
            "operations obtained"
        );
        self.execute(Some(question.to_string()), operations, backend)
    }

    /// Run already-structured operations, skipping the parsing step.
    pub fn run_operations(
        &self,
        ops: Vec<Operation>,
        backend: SolverBackend,
    ) -> Result<ScenarioOutcome, ScenarioError> {
        let span = info_span!("scenario", request_id = %Uuid::new_v4(), %backend);
        let _guard = span.enter();

        validate_operations(&ops, self.config.optimization.horizon)?;
        self.execute(None, OperationBundle::new(ops, ParseMethod::Provided), backend)
    }

    /// Solve the unmodified dataset.
    pub fn baseline(&self, backend: SolverBackend) -> Result<OptimizationResult, ScenarioError> {
        Ok(solve(&self.fresh_dataset()?, backend))
    }

    fn obtain_operations(&self, question: &str) -> Result<OperationBundle, ScenarioError> {
        let horizon = self.config.optimization.horizon;

        if let Some(parser) = &self.parser {
            match parser.propose(question) {
                Ok(ops) => match validate_operations(&ops, horizon) {
                    Ok(()) => return Ok(OperationBundle::new(ops, ParseMethod::LlmWithIcl)),
                    Err(e) => warn!(error = %e, "parser output rejected, using rule-based parser"),
                },
                Err(e) => warn!(error = %e, "parser failed, using rule-based parser"),
            }
        }

        let ops = RuleBasedParser.parse(question);
        validate_operations(&ops, horizon)?;
        Ok(OperationBundle::new(ops, ParseMethod::RuleBased))
    }

    fn execute(
        &self,
        question: Option<String>,
        operations: OperationBundle,
        backend: SolverBackend,
    ) -> Result<ScenarioOutcome, ScenarioError> {
        let mut dataset = self.fresh_dataset()?;
        scenario::apply(&mut dataset, &operations.ops)?;
        debug!(ops = ?operations.ops, "dataset mutated");

        let result = solve(&dataset, backend);

        let baseline_objective = if self.config.pipeline.compare_baseline && result.is_optimal() {
            if operations.is_empty() {
                Some(result.objective)
            } else {
                let baseline = self.baseline(backend)?;
                baseline.is_optimal().then_some(baseline.objective)
            }
        } else {
            None
        };

        let request = ExplanationRequest {
            summary: dataset.summary(),
            result: &result,
            operations: &operations.ops,
            baseline_objective,
            currency: &self.config.prices.currency,
        };
        let explanation = self.explain(&request);

        Ok(ScenarioOutcome {
            question,
            operations,
            result,
            explanation,
            baseline_objective,
        })
    }

    fn explain(&self, request: &ExplanationRequest<'_>) -> Explanation {
        if let Some(explainer) = &self.explainer {
            match explainer.explain(request) {
                Ok(text) if !text.trim().is_empty() => {
                    return Explanation {
                        text,
                        method: ExplanationMethod::Llm,
                    }
                }
                Ok(_) => warn!("explainer returned nothing, using template"),
                Err(e) => warn!(error = %e, "explainer failed, using template"),
            }
        }
        Explanation {
            text: RuleBasedExplainer.render(request),
            method: ExplanationMethod::RuleBased,
        }
    }
}
