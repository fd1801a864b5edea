//! Shared workflows behind the CLI subcommands.
//!
//! Keeping these in one place keeps the CLI layer to argument handling and
//! printing:
//!
//! - sweep: config → run specs → output dir → bounded dispatch → summary
//! - analysis: artifact → loader → derived series → chart
//!
//! Everything takes an [`ArtifactStore`] and, for sweeps, a [`Launcher`], so
//! whole workflows run in tests without touching the file system or spawning
//! the simulator.

use std::path::{Path, PathBuf};

use crate::analysis::{SeriesStats, chart_spec, derive_loaded, series_stats};
use crate::domain::{
    ArtifactRef, ChartSpec, DerivedSeries, RenderOptions, RunOutcome, RunSpec, SkippedArtifact,
    SweepConfig,
};
use crate::error::AppError;
use crate::io::series::{LoadedSeries, load_series};
use crate::io::store::ArtifactStore;
use crate::plot::render_chart;
use crate::sweep::{
    Launcher, ProtocolTable, RunDispatcher, SweepSummary, artifact_path, build_run_specs, summarize,
};

/// All outputs of one sweep.
#[derive(Debug, Clone)]
pub struct SweepRun {
    pub specs: Vec<RunSpec>,
    /// In completion order.
    pub outcomes: Vec<RunOutcome>,
    pub summary: SweepSummary,
}

/// Resolve, prepare and dispatch a sweep.
///
/// Every configuration error surfaces before the launcher is first called.
pub fn run_sweep<L>(
    config: &SweepConfig,
    table: &ProtocolTable,
    store: &dyn ArtifactStore,
    launcher: &L,
) -> Result<SweepRun, AppError>
where
    L: Launcher + ?Sized,
{
    let specs = build_run_specs(config, table)?;
    let dispatcher = RunDispatcher::new(config.max_workers)?;
    store.create_dir_all(&config.output_dir)?;
    tracing::debug!(dir = %config.output_dir.display(), "output directory ready");

    let outcomes = dispatcher.dispatch(&specs, launcher)?;
    let summary = summarize(&outcomes);

    Ok(SweepRun {
        specs,
        outcomes,
        summary,
    })
}

/// One loaded and derived artifact.
#[derive(Debug, Clone)]
pub struct AnalyzedArtifact {
    pub loaded: LoadedSeries,
    pub series: DerivedSeries,
    pub stats: Option<SeriesStats>,
}

/// Load, normalize and derive one artifact.
pub fn analyze_artifact(
    store: &dyn ArtifactStore,
    artifact: &ArtifactRef,
    window: usize,
) -> Result<AnalyzedArtifact, AppError> {
    let loaded = load_series(store, &artifact.path)?;
    let series = derive_loaded(&loaded, window, artifact.label.clone(), artifact.delta_t)?;
    let stats = series_stats(&series);

    tracing::debug!(
        path = %artifact.path.display(),
        rows = loaded.rows_read,
        kept = loaded.records.len(),
        "artifact analyzed"
    );

    Ok(AnalyzedArtifact {
        loaded,
        series,
        stats,
    })
}

/// Analyze one artifact and chart it.
pub fn plot_artifact(
    store: &dyn ArtifactStore,
    artifact: &ArtifactRef,
    options: &RenderOptions,
) -> Result<(AnalyzedArtifact, PathBuf), AppError> {
    let analyzed = analyze_artifact(store, artifact, options.window)?;
    let spec = chart_spec(vec![analyzed.series.clone()]);
    let written = render_chart(store, &spec, options)?;
    Ok((analyzed, written))
}

/// Chart input for a comparison, plus what was left out.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub spec: ChartSpec,
    pub skipped: Vec<SkippedArtifact>,
}

/// Load every artifact that can be loaded; skip the rest.
///
/// Fails only when nothing survives.
pub fn compare_artifacts(
    store: &dyn ArtifactStore,
    artifacts: &[ArtifactRef],
    window: usize,
) -> Result<Comparison, AppError> {
    if window == 0 {
        return Err(AppError::config("Moving-average window must be >= 1."));
    }

    let mut series = Vec::with_capacity(artifacts.len());
    let mut skipped = Vec::new();

    for artifact in artifacts {
        match analyze_artifact(store, artifact, window) {
            Ok(a) => series.push(a.series),
            Err(e) => {
                tracing::warn!(path = %artifact.path.display(), kind = ?e.kind(), "skipping artifact");
                skipped.push(SkippedArtifact {
                    path: artifact.path.clone(),
                    delta_t: artifact.delta_t,
                    reason: e.message().to_string(),
                });
            }
        }
    }

    if series.is_empty() {
        return Err(AppError::data_format(format!(
            "No usable artifacts to compare ({} requested, {} skipped).",
            artifacts.len(),
            skipped.len()
        )));
    }

    Ok(Comparison {
        spec: chart_spec(series),
        skipped,
    })
}

/// Artifact refs for a protocol's sweep, located by the same path function
/// the sweep writes with.
pub fn delta_artifacts(data_dir: &Path, protocol: &str, deltas: &[f64]) -> Vec<ArtifactRef> {
    deltas
        .iter()
        .map(|&d| ArtifactRef {
            path: artifact_path(data_dir, protocol, d),
            delta_t: Some(d),
            label: format!("Δ/T={d}"),
        })
        .collect()
}

/// Every `.csv` under `data_dir`, labelled by file stem, with no Δ/T.
pub fn scan_artifacts(store: &dyn ArtifactStore, data_dir: &Path) -> Result<Vec<ArtifactRef>, AppError> {
    let paths = store.list(data_dir, "csv")?;
    Ok(paths.into_iter().map(file_artifact).collect())
}

/// A standalone artifact with no known Δ/T.
pub fn file_artifact(path: PathBuf) -> ArtifactRef {
    let label = stem_of(&path);
    ArtifactRef {
        path,
        delta_t: None,
        label,
    }
}

/// `plot-mining-<stem>.svg`, next to nothing (current directory).
pub fn default_plot_output(artifact: &Path) -> PathBuf {
    PathBuf::from(format!("plot-mining-{}.svg", stem_of(artifact)))
}

/// `plot-<protocol>.svg`, or `plot.svg` without a protocol.
pub fn default_compare_output(protocol: &str) -> PathBuf {
    let protocol = protocol.trim().to_ascii_lowercase();
    if protocol.is_empty() {
        PathBuf::from("plot.svg")
    } else {
        PathBuf::from(format!("plot-{protocol}.svg"))
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
