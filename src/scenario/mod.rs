pub mod modifications;

pub use modifications::apply;
