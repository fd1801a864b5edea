//! Input/output helpers.
//!
//! - file-system seam for artifacts and charts (`store`)
//! - CSV time-series loading + normalization (`series`)

pub mod series;
pub mod store;

pub use series::*;
pub use store::*;
