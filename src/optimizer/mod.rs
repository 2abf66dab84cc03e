pub mod backend;
pub mod formulation;
pub mod iis;
pub mod model;
pub mod solve;
pub mod strategies;

pub use backend::*;
pub use formulation::*;
pub use model::*;
pub use solve::*;
pub use strategies::*;
