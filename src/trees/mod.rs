//! Succinct tree representations.
//!
//! - [`BpVector`] - balanced parentheses with matching and range min-excess
//! - [`CartesianTree`] - constant-time range minimum queries over a sequence

mod bp;
mod cartesian;

pub use bp::BpVector;
pub use cartesian::CartesianTree;
