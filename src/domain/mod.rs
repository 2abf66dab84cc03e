pub mod dataset;
pub mod operation;
pub mod result;

pub use dataset::*;
pub use operation::*;
pub use result::*;
