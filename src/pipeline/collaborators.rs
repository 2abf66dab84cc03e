//! Seams to the external natural-language services.
//!
//! The pipeline only depends on these traits; the LLM-backed implementations
//! live in [`super::llm`], the deterministic ones in [`super::rule_based`].

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::domain::{DatasetSummary, Operation, OptimizationResult};
use crate::error::CollaboratorError;

/// Question text in, operation list out.
pub trait OperationProposer: Send + Sync {
    fn propose(&self, question: &str) -> Result<Vec<Operation>, CollaboratorError>;
}

/// Everything an explainer is allowed to look at.
#[derive(Debug, Clone, Serialize)]
pub struct ExplanationRequest<'a> {
    pub summary: DatasetSummary,
    pub result: &'a OptimizationResult,
    pub operations: &'a [Operation],
    pub baseline_objective: Option<f64>,
    pub currency: &'a str,
}

pub trait Explainer: Send + Sync {
    fn explain(&self, request: &ExplanationRequest<'_>) -> Result<String, CollaboratorError>;
}

/// Single-prompt text completion.
#[cfg_attr(test, mockall::automock)]
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ExplanationMethod {
    #[serde(rename = "llm")]
    #[strum(serialize = "llm")]
    Llm,
    #[serde(rename = "rule-based")]
    #[strum(serialize = "rule-based")]
    RuleBased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub text: String,
    pub method: ExplanationMethod,
}
