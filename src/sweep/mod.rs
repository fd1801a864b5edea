//! The Δ/T sweep: parameter derivation, bounded dispatch, aggregation.
//!
//! - `params`: sweep inputs → `RunSpec`s (pure, fails before any dispatch)
//! - `dispatch`: bounded worker pool running the external simulator
//! - `summary`: successes/failures partition

pub mod dispatch;
pub mod params;
pub mod summary;

pub use dispatch::{Launcher, ProcessLauncher, RunDispatcher};
pub use params::{ProtocolTable, artifact_path, build_run_specs, compute_delay};
pub use summary::{SweepSummary, summarize};
