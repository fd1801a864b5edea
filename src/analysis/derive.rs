//! Normalized records → derived series → chart input.

use crate::analysis::smoothing::{convergence_reference, moving_average};
use crate::domain::{ChartSpec, ConvergenceRef, DerivedPoint, DerivedSeries, TimeSeriesRecord};
use crate::error::AppError;
use crate::io::series::LoadedSeries;

/// Milliseconds per second.
const MS_PER_SEC: f64 = 1000.0;

/// Convert mining time to seconds and smooth it with a trailing window.
///
/// `records` must already be normalized (unique rounds, ascending).
pub fn derive_series(
    records: &[TimeSeriesRecord],
    window: usize,
    label: impl Into<String>,
    delta_t: Option<f64>,
    has_mining_time: bool,
) -> Result<DerivedSeries, AppError> {
    debug_assert!(records.windows(2).all(|w| w[0].round < w[1].round));

    let seconds: Vec<f64> = records.iter().map(|r| r.mining_time_ms / MS_PER_SEC).collect();
    let smoothed = moving_average(&seconds, window)?;

    let points = records
        .iter()
        .zip(seconds.iter().zip(smoothed.iter()))
        .map(|(r, (&sec, &ma))| DerivedPoint {
            round: r.round,
            mining_time_sec: sec,
            mining_time_ma: ma,
            difficulty: r.difficulty,
        })
        .collect();

    Ok(DerivedSeries {
        label: label.into(),
        delta_t,
        has_mining_time,
        points,
    })
}

/// [`derive_series`] for a loaded artifact.
pub fn derive_loaded(
    loaded: &LoadedSeries,
    window: usize,
    label: impl Into<String>,
    delta_t: Option<f64>,
) -> Result<DerivedSeries, AppError> {
    derive_series(&loaded.records, window, label, delta_t, loaded.has_mining_time())
}

/// Build the chart input: one convergence reference per distinct Δ/T.
pub fn chart_spec(series: Vec<DerivedSeries>) -> ChartSpec {
    let mut references: Vec<ConvergenceRef> = Vec::new();
    for delta_t in series.iter().filter_map(|s| s.delta_t) {
        if !references.iter().any(|r| r.delta_t == delta_t) {
            references.push(ConvergenceRef {
                delta_t,
                value: convergence_reference(delta_t),
            });
        }
    }

    ChartSpec { series, references }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(times_ms: &[f64]) -> Vec<TimeSeriesRecord> {
        times_ms
            .iter()
            .enumerate()
            .map(|(i, &t)| TimeSeriesRecord {
                round: (i as u64 + 1) * 2,
                mining_time_ms: t,
                difficulty: 1.0 / (i + 1) as f64,
            })
            .collect()
    }

    #[test]
    fn converts_to_seconds_and_smooths() {
        let series = derive_series(
            &records(&[1000.0, 2000.0, 3000.0, 4000.0, 5000.0]),
            3,
            "Δ/T=0.1",
            Some(0.1),
            true,
        )
        .unwrap();

        let secs: Vec<f64> = series.points.iter().map(|p| p.mining_time_sec).collect();
        let ma: Vec<f64> = series.points.iter().map(|p| p.mining_time_ma).collect();
        assert_eq!(secs, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(ma, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
        assert_eq!(series.points[4].round, 10);
        assert_eq!(series.points[1].difficulty, 0.5);
        assert_eq!(series.delta_t, Some(0.1));
    }

    #[test]
    fn sub_second_times_keep_precision() {
        let series = derive_series(&records(&[1.0, 250.0]), 1, "x", None, true).unwrap();
        assert_eq!(series.points[0].mining_time_sec, 0.001);
        assert_eq!(series.points[1].mining_time_sec, 0.25);
    }

    #[test]
    fn chart_spec_has_one_reference_per_distinct_delta() {
        let a = derive_series(&records(&[1.0]), 1, "a", Some(0.1), true).unwrap();
        let b = derive_series(&records(&[1.0]), 1, "b", Some(0.5), true).unwrap();
        let c = derive_series(&records(&[1.0]), 1, "c", Some(0.1), true).unwrap();
        let d = derive_series(&records(&[1.0]), 1, "d", None, true).unwrap();

        let spec = chart_spec(vec![a, b, c, d]);
        assert_eq!(spec.series.len(), 4);
        let deltas: Vec<f64> = spec.references.iter().map(|r| r.delta_t).collect();
        assert_eq!(deltas, vec![0.1, 0.5]);
        assert_eq!(spec.references[0].value, (-0.1f64).exp());
    }
}
