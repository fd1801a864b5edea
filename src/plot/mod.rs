//! Chart rendering.
//!
//! Charts are drawn with `plotters` into SVG. The SVG backend keeps text as
//! text, so no system font stack is needed at build or run time.

pub mod chart;

pub use chart::{CHART_SIZE, ensure_svg_path, render_chart, render_svg, series_color};
