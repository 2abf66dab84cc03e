//! LP backends
//!
//! - modeler: algebraic modeling through `good_lp` (default, `pulp` selector)
//! - simplex: direct `minilp` rows with IIS support (`gurobi` selector)

pub mod modeler;
pub mod simplex;

pub use modeler::*;
pub use simplex::*;
