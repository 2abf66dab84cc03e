pub mod collaborators;
pub mod llm;
pub mod orchestrator;
pub mod rule_based;
pub mod validation;

pub use collaborators::*;
pub use orchestrator::*;
pub use rule_based::*;
pub use validation::*;
