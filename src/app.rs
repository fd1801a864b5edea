//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and environment defaults
//! - initializes logging
//! - parses CLI arguments
//! - runs sweeps, plots and comparisons
//! - prints reports

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Cli, Command, CompareArgs, PlotArgs, RunArgs};
use crate::domain::{RenderOptions, SweepConfig};
use crate::error::AppError;
use crate::io::store::{ArtifactStore, LocalStore};
use crate::sweep::params::parse_delta_list;
use crate::sweep::{ProcessLauncher, ProtocolTable};

pub mod pipeline;

/// Simulator binary when neither `--simulator` nor `DSWEEP_SIMULATOR` is set.
pub const DEFAULT_SIMULATOR: &str = "target/release/blockchain-sim";
/// Artifact directory when neither the flag nor `DSWEEP_DATA_DIR` is set.
pub const DEFAULT_DATA_DIR: &str = "data";

pub const SIMULATOR_ENV: &str = "DSWEEP_SIMULATOR";
pub const DATA_DIR_ENV: &str = "DSWEEP_DATA_DIR";

/// Entry point for the `dsweep` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    crate::logging::init_logging(cli.verbosity())?;

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Plot(args) => handle_plot(args),
        Command::Compare(args) => handle_compare(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let store = LocalStore;

    let mut table = ProtocolTable::builtin();
    if let Some(path) = &args.protocols {
        table.extend(read_protocol_table(&store, path)?);
    }

    let config = sweep_config_from_args(&args)?;
    let generation_time = table.resolve(&config.protocol, config.generation_time)?;
    let simulator = args
        .simulator
        .clone()
        .unwrap_or_else(|| env_path(SIMULATOR_ENV, DEFAULT_SIMULATOR));
    let launcher = ProcessLauncher::new(simulator);

    println!(
        "{}",
        crate::report::format_sweep_header(
            &config,
            generation_time,
            config.max_workers.min(config.delta_values.len().max(1)),
            launcher.binary()
        )
    );

    let run = pipeline::run_sweep(&config, &table, &store, &launcher)?;

    for outcome in &run.outcomes {
        println!("{}", crate::report::format_outcome(outcome));
    }
    println!();
    println!(
        "{}",
        crate::report::format_sweep_summary(&run.summary, chrono::Local::now())
    );

    if run.summary.all_succeeded() {
        Ok(())
    } else {
        Err(AppError::run_failure(format!(
            "{} of {} runs failed.",
            run.summary.failure_count(),
            run.summary.total
        )))
    }
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let store = LocalStore;
    let artifact = pipeline::file_artifact(args.csv.clone());
    let options = RenderOptions {
        window: args.window,
        log_scale: args.log_scale,
        output: args
            .output
            .clone()
            .unwrap_or_else(|| pipeline::default_plot_output(&args.csv)),
        mining_time: true,
        reference_lines: false,
        title: format!("Mining Time and Difficulty: {}", artifact.label),
    };
    crate::plot::ensure_svg_path(&options.output)?;

    let (analyzed, written) = pipeline::plot_artifact(&store, &artifact, &options)?;

    println!("Plot saved to {}", written.display());
    println!();
    println!(
        "{}",
        crate::report::format_series_stats(&analyzed.loaded, analyzed.stats.as_ref(), args.window)
    );
    println!(
        "{}",
        crate::report::format_data_sample(&analyzed.series, crate::report::SAMPLE_ROWS)
    );
    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let store = LocalStore;
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| env_path(DATA_DIR_ENV, DEFAULT_DATA_DIR));

    let artifacts = if args.scan {
        pipeline::scan_artifacts(&store, &data_dir)?
    } else {
        let deltas = parse_delta_list(&args.deltas).map_err(AppError::config)?;
        pipeline::delta_artifacts(&data_dir, &args.protocol, &deltas)
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| pipeline::default_compare_output(&args.protocol));
    crate::plot::ensure_svg_path(&output)?;

    let comparison = pipeline::compare_artifacts(&store, &artifacts, args.window)?;
    if !comparison.skipped.is_empty() {
        print!("{}", crate::report::format_skipped(&comparison.skipped));
    }

    let options = RenderOptions {
        window: args.window,
        log_scale: args.log_scale,
        output,
        mining_time: !args.no_mining_time,
        reference_lines: !args.no_reference,
        title: if args.scan {
            format!("Difficulty: {}", data_dir.display())
        } else if args.protocol.trim().is_empty() {
            "Difficulty vs Δ/T".to_string()
        } else {
            format!("Difficulty vs Δ/T ({})", args.protocol)
        },
    };
    let written = crate::plot::render_chart(&store, &comparison.spec, &options)?;

    println!(
        "Compared {} artifact(s); chart saved to {}",
        comparison.spec.series.len(),
        written.display()
    );
    Ok(())
}

/// Turn `dsweep run` flags into a sweep config.
pub fn sweep_config_from_args(args: &RunArgs) -> Result<SweepConfig, AppError> {
    let delta_values = parse_delta_list(&args.delta_values).map_err(AppError::config)?;
    let max_workers = if args.serial {
        1
    } else {
        args.max_workers.unwrap_or_else(default_workers)
    };

    Ok(SweepConfig {
        protocol: args.protocol.clone(),
        delta_values,
        num_nodes: args.num_nodes,
        end_round: args.end_round,
        generation_time: args.generation_time,
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| env_path(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
        max_workers,
    })
}

fn read_protocol_table(store: &dyn ArtifactStore, path: &std::path::Path) -> Result<ProtocolTable, AppError> {
    let bytes = store.read(path).map_err(|e| {
        AppError::config(format!("Failed to read protocol table: {}", e.message()))
    })?;
    let text = String::from_utf8(bytes).map_err(|e| {
        AppError::config(format!("Protocol table '{}' is not UTF-8: {e}", path.display()))
    })?;
    ProtocolTable::from_json(&text)
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
