pub mod batch;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod optimizer;
pub mod pipeline;
pub mod scenario;
pub mod telemetry;

pub use error::{CollaboratorError, ModificationError, ScenarioError};
