use thiserror::Error;

/// Failures that abort a scenario request.
///
/// Solver outcomes (infeasible, unbounded, backend errors) are not errors here;
/// they come back as a non-optimal [`crate::domain::OptimizationResult`].
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Modification error: {0}")]
    Modification(#[from] ModificationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// An operation reached the modification engine with an index outside the horizon.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModificationError {
    #[error("operation {index}: hour {hour} outside horizon 0..{horizon}")]
    HourOutOfRange {
        index: usize,
        hour: usize,
        horizon: usize,
    },
}

/// An external parser/explainer produced nothing usable.
///
/// Always recoverable: the pipeline falls back to the rule-based path.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable")]
    Unavailable,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("empty response")]
    Empty,
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(error: reqwest::Error) -> Self {
        CollaboratorError::Transport(error.to_string())
    }
}

impl From<validator::ValidationErrors> for ScenarioError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ScenarioError::Config(errors.to_string())
    }
}

impl From<figment::Error> for ScenarioError {
    fn from(error: figment::Error) -> Self {
        ScenarioError::Config(error.to_string())
    }
}
