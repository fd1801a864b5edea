//! Time-series analysis: unit conversion, smoothing, convergence reference,
//! and summary statistics.

pub mod derive;
pub mod smoothing;
pub mod stats;

pub use derive::{chart_spec, derive_loaded, derive_series};
pub use smoothing::{convergence_reference, moving_average};
pub use stats::{SeriesStats, series_stats};
