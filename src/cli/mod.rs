//! Command-line parsing for the Δ/T sweep orchestrator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! sweep and analysis code. Values are turned into domain types by `app`.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Δ/T values swept when `--delta-values` is not given.
pub const DEFAULT_DELTAS: &str = "0.001,0.01,0.05,0.1,0.25,0.5,0.75,1.0";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "dsweep",
    version,
    about = "Δ/T sweep orchestrator for a blockchain simulator, with difficulty charts"
)]
pub struct Cli {
    /// More diagnostic output on stderr (repeatable).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less diagnostic output on stderr (repeatable).
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Net verbosity: `-v` raises, `-q` lowers.
    pub fn verbosity(&self) -> i8 {
        let v = i16::from(self.verbose) - i16::from(self.quiet);
        v.clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the simulator once per Δ/T value on a bounded worker pool.
    Run(RunArgs),
    /// Chart mining time and difficulty for one artifact and print statistics.
    Plot(PlotArgs),
    /// Overlay the difficulty of several artifacts with exp(-Δ/T) references.
    Compare(CompareArgs),
}

/// Options for `dsweep run`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Protocol tag passed to the simulator (bitcoin, ethereum, or a `--protocols` entry).
    #[arg(long, default_value = "ethereum")]
    pub protocol: String,

    /// Comma-separated Δ/T values.
    #[arg(long, default_value = DEFAULT_DELTAS)]
    pub delta_values: String,

    /// Number of simulated nodes.
    #[arg(long, default_value_t = 100)]
    pub num_nodes: u32,

    /// Override the protocol's block generation time (ms).
    #[arg(long)]
    pub generation_time: Option<u64>,

    /// Last simulated round.
    #[arg(long, default_value_t = 80_000)]
    pub end_round: u64,

    /// Worker pool size (defaults to available parallelism).
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Run one simulation at a time, in input order.
    #[arg(long, conflicts_with = "max_workers")]
    pub serial: bool,

    /// Simulator binary (env: DSWEEP_SIMULATOR).
    #[arg(long, value_name = "PATH")]
    pub simulator: Option<PathBuf>,

    /// Directory for CSV artifacts (env: DSWEEP_DATA_DIR).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON file with extra `{ "name", "generation_time" }` protocol rows.
    #[arg(long, value_name = "JSON")]
    pub protocols: Option<PathBuf>,
}

/// Options for `dsweep plot`.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Artifact CSV produced by the simulator.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Moving-average window (blocks).
    #[arg(short = 'w', long, default_value_t = 1000)]
    pub window: usize,

    /// Log-scale the mining-time axis.
    #[arg(short = 'l', long)]
    pub log_scale: bool,

    /// Output SVG (default: plot-mining-<stem>.svg).
    #[arg(short = 'o', long, value_name = "SVG")]
    pub output: Option<PathBuf>,
}

/// Options for `dsweep compare`.
#[derive(Debug, Args, Clone)]
pub struct CompareArgs {
    /// Protocol whose artifacts are compared.
    #[arg(long, default_value = "ethereum")]
    pub protocol: String,

    /// Comma-separated Δ/T values to overlay.
    #[arg(long, default_value = DEFAULT_DELTAS)]
    pub deltas: String,

    /// Directory holding the artifacts (env: DSWEEP_DATA_DIR).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Moving-average window (blocks).
    #[arg(short = 'w', long, default_value_t = 1000)]
    pub window: usize,

    /// Log-scale the mining-time axis.
    #[arg(short = 'l', long)]
    pub log_scale: bool,

    /// Only draw difficulty.
    #[arg(long)]
    pub no_mining_time: bool,

    /// Omit the dashed exp(-Δ/T) lines.
    #[arg(long)]
    pub no_reference: bool,

    /// Compare every `.csv` in the data directory, labelled by file stem.
    #[arg(long, conflicts_with = "deltas")]
    pub scan: bool,

    /// Output SVG (default: plot-<protocol>.svg).
    #[arg(short = 'o', long, value_name = "SVG")]
    pub output: Option<PathBuf>,
}
