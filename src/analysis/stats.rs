//! Descriptive statistics for one derived series.

use crate::domain::DerivedSeries;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    /// Number of blocks (unique rounds).
    pub count: usize,
    pub mean_difficulty: f64,
    pub mean_mining_time_sec: f64,
    /// Sample standard deviation (n - 1); `None` below two points.
    pub std_mining_time_sec: Option<f64>,
}

pub fn series_stats(series: &DerivedSeries) -> Option<SeriesStats> {
    let n = series.points.len();
    if n == 0 {
        return None;
    }

    let nf = n as f64;
    let mean_difficulty = series.points.iter().map(|p| p.difficulty).sum::<f64>() / nf;
    let mean_mining_time_sec = series.points.iter().map(|p| p.mining_time_sec).sum::<f64>() / nf;

    let std_mining_time_sec = (n >= 2).then(|| {
        let ss: f64 = series
            .points
            .iter()
            .map(|p| (p.mining_time_sec - mean_mining_time_sec).powi(2))
            .sum();
        (ss / (nf - 1.0)).sqrt()
    });

    Some(SeriesStats {
        count: n,
        mean_difficulty,
        mean_mining_time_sec,
        std_mining_time_sec,
    })
}
