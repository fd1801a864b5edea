//! Shared domain types.
//!
//! These types are plain values: they are built once (by the parameter space,
//! the dispatcher, or the loader) and passed by reference afterwards.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Resolved inputs for one sweep invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Protocol tag passed verbatim to the simulator (`bitcoin`, `ethereum`, ...).
    pub protocol: String,
    /// Δ/T values to sweep, in submission order.
    pub delta_values: Vec<f64>,
    pub num_nodes: u32,
    pub end_round: u64,
    /// Overrides the protocol table's generation time (ms) when set.
    pub generation_time: Option<u64>,
    /// Directory the simulator writes its CSV artifacts into.
    pub output_dir: PathBuf,
    /// Worker pool size `W`.
    pub max_workers: usize,
}

/// Fully resolved descriptor for one simulator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub protocol: String,
    pub delta_t: f64,
    /// `trunc(delta_t * generation_time)`, in the same unit as `generation_time`.
    pub delay: u64,
    pub generation_time: u64,
    pub num_nodes: u32,
    pub end_round: u64,
    pub output_path: PathBuf,
}

/// Buffered result of one finished external process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Terminal state of one dispatched [`RunSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Position of the originating spec in the submitted list.
    pub index: usize,
    pub delta_t: f64,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub failure: Option<String>,
}

/// One raw artifact row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub round: u64,
    pub mining_time_ms: f64,
    pub difficulty: f64,
}

/// One derived row: seconds, smoothed seconds and raw difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedPoint {
    pub round: u64,
    pub mining_time_sec: f64,
    pub mining_time_ma: f64,
    pub difficulty: f64,
}

/// A smoothed series ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    /// Display label (legend text).
    pub label: String,
    /// The Δ/T this series was produced with, when known.
    pub delta_t: Option<f64>,
    /// False when the artifact had no mining-time column.
    pub has_mining_time: bool,
    pub points: Vec<DerivedPoint>,
}

/// An artifact location threaded together with the Δ/T that produced it.
///
/// `label` is for display only; it is never parsed back into a Δ/T.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRef {
    pub path: PathBuf,
    pub delta_t: Option<f64>,
    pub label: String,
}

/// Theoretical value that difficulty is expected to approach for one Δ/T.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceRef {
    pub delta_t: f64,
    pub value: f64,
}

/// Everything the renderer draws.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub series: Vec<DerivedSeries>,
    /// One entry per distinct Δ/T in `series`.
    pub references: Vec<ConvergenceRef>,
}

/// Rendering options, built once per chart.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Moving-average window, shown in legend labels.
    pub window: usize,
    /// Log-scale the mining-time axis.
    pub log_scale: bool,
    pub output: PathBuf,
    /// Draw the mining-time axis at all.
    pub mining_time: bool,
    /// Draw dashed convergence reference lines.
    pub reference_lines: bool,
    pub title: String,
}

/// An artifact left out of a comparison, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedArtifact {
    pub path: PathBuf,
    pub delta_t: Option<f64>,
    pub reason: String,
}
