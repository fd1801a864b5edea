//! Terminal reporting for sweeps and analyses.
//!
//! All user-facing stdout text is built here so:
//! - the sweep and analysis code stays free of printing
//! - output changes are localized and testable as plain strings

pub mod format;

pub use format::*;
