//! Domain types used throughout the sweep and analysis pipelines.
//!
//! This module defines:
//!
//! - sweep inputs and per-run descriptors (`SweepConfig`, `RunSpec`)
//! - dispatch results (`ProcessOutput`, `RunOutcome`)
//! - time-series rows and derived series (`TimeSeriesRecord`, `DerivedSeries`)
//! - chart inputs (`ChartSpec`, `RenderOptions`)
//! - analysis bookkeeping (`ArtifactRef`, `SkippedArtifact`)

pub mod types;

pub use types::*;
