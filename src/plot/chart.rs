//! Plotters-powered mining-time / difficulty chart.
//!
//! One horizontal `round` axis, two vertical scales:
//!
//! - left: smoothed mining time in seconds (optionally log10-scaled)
//! - right: raw difficulty, anchored at 0, with dashed `exp(-Δ/T)` references
//!
//! Series and references from both scales share one legend. When no series
//! carries mining time (or it is switched off), difficulty moves to the only
//! axis.
//!
//! Charts are rendered into an in-memory SVG document and written through the
//! [`ArtifactStore`], so rendering never depends on the working directory.

use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::{ChartSpec, DerivedSeries, RenderOptions};
use crate::error::AppError;
use crate::io::store::ArtifactStore;

/// Output image size in pixels.
pub const CHART_SIZE: (u32, u32) = (1200, 800);

/// Dash and gap length of reference lines, as fractions of the x span.
const DASH_FRACTION: f64 = 0.012;
const GAP_FRACTION: f64 = 0.008;

/// Tableau-10, the usual categorical palette for comparison plots.
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const SINGLE_MINING_COLOR: RGBColor = RGBColor(214, 39, 40);
const SINGLE_DIFFICULTY_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Deterministic color for the `index`-th compared series.
pub fn series_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Render `spec` and write the SVG to `options.output`.
pub fn render_chart(
    store: &dyn ArtifactStore,
    spec: &ChartSpec,
    options: &RenderOptions,
) -> Result<PathBuf, AppError> {
    ensure_svg_path(&options.output)?;
    let svg = render_svg(spec, options)?;
    store.write(&options.output, svg.as_bytes())?;
    tracing::info!(path = %options.output.display(), series = spec.series.len(), "chart written");
    Ok(options.output.clone())
}

/// Render `spec` to an SVG document.
pub fn render_svg(spec: &ChartSpec, options: &RenderOptions) -> Result<String, AppError> {
    let layout = Layout::compute(spec, options)?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        let drawn = if layout.primary.is_some() {
            draw_dual(&root, spec, options, &layout)
        } else {
            draw_difficulty_only(&root, spec, options, &layout)
        };
        drawn.map_err(|e| AppError::render(format!("Failed to draw chart: {e}")))?;
        root.present()
            .map_err(|e| AppError::render(format!("Failed to finish chart: {e}")))?;
    }
    Ok(svg)
}

/// Reject outputs that are not `.svg`.
pub fn ensure_svg_path(path: &Path) -> Result<(), AppError> {
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        Ok(())
    } else {
        Err(AppError::config(format!(
            "Chart output '{}' must end in `.svg`.",
            path.display()
        )))
    }
}

/// Precomputed bounds and line data. All drawing reads from here.
struct Layout {
    x: Range<f64>,
    /// Mining-time axis range (already log10-transformed in log mode).
    primary: Option<Range<f64>>,
    difficulty: Range<f64>,
    /// Mining-time line per series, aligned with `spec.series` (empty when skipped).
    mining_lines: Vec<Vec<(f64, f64)>>,
}

impl Layout {
    fn compute(spec: &ChartSpec, options: &RenderOptions) -> Result<Self, AppError> {
        let rounds = spec
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.round as f64));
        let (x_min, x_max) = min_max(rounds)
            .ok_or_else(|| AppError::render("Nothing to plot: every series is empty."))?;

        let mining_lines: Vec<Vec<(f64, f64)>> = spec
            .series
            .iter()
            .map(|s| mining_line(s, options))
            .collect();

        let primary = min_max(mining_lines.iter().flatten().map(|&(_, y)| y))
            .map(|(lo, hi)| padded(lo, hi, 0.05));

        let mut d_max = spec
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.difficulty))
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if options.reference_lines {
            for r in &spec.references {
                d_max = d_max.max(r.value);
            }
        }
        let difficulty = if d_max.is_finite() && d_max > 0.0 {
            0.0..d_max * 1.05
        } else {
            0.0..1.0
        };

        Ok(Self {
            x: padded(x_min, x_max, 0.0),
            primary,
            difficulty,
            mining_lines,
        })
    }
}

/// Value mapping of the mining-time axis.
///
/// Log mode places `log10(seconds)` on a linear coordinate and labels ticks
/// with `10^v`. The primary and secondary axes then share one coordinate
/// type, which `set_secondary_coord` needs for both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MiningAxis {
    log: bool,
}

impl MiningAxis {
    fn new(options: &RenderOptions) -> Self {
        Self {
            log: options.log_scale,
        }
    }

    /// Axis coordinate for a value in seconds; `None` if it cannot be placed.
    fn to_axis(self, seconds: f64) -> Option<f64> {
        if !self.log {
            return Some(seconds);
        }
        (seconds > 0.0).then(|| seconds.log10())
    }

    fn tick_label(self, coord: f64) -> String {
        if self.log {
            format_axis_value(10f64.powf(coord))
        } else {
            format_axis_value(coord)
        }
    }

    fn description(self) -> &'static str {
        if self.log {
            "Mining Time (sec) - Log Scale"
        } else {
            "Mining Time (sec)"
        }
    }
}

fn mining_line(series: &DerivedSeries, options: &RenderOptions) -> Vec<(f64, f64)> {
    if !(options.mining_time && series.has_mining_time) {
        return Vec::new();
    }

    let axis = MiningAxis::new(options);
    let line: Vec<(f64, f64)> = series
        .points
        .iter()
        .filter_map(|p| axis.to_axis(p.mining_time_ma).map(|y| (p.round as f64, y)))
        .collect();
    let dropped = series.points.len() - line.len();
    if dropped > 0 {
        tracing::warn!(series = %series.label, dropped, "non-positive mining times omitted from log axis");
    }
    line
}

fn draw_dual(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    spec: &ChartSpec,
    options: &RenderOptions,
    layout: &Layout,
) -> Result<(), Box<dyn Error>> {
    let primary = layout.primary.clone().unwrap_or(0.0..1.0);
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .right_y_label_area_size(70)
        .build_cartesian_2d(layout.x.clone(), primary)?
        .set_secondary_coord(layout.x.clone(), layout.difficulty.clone());

    let axis = MiningAxis::new(options);
    let fmt_primary = |v: &f64| axis.tick_label(*v);
    let fmt_secondary = |v: &f64| format_axis_value(*v);
    let fmt_round = |v: &f64| format!("{v:.0}");

    chart
        .configure_mesh()
        .x_desc("Round")
        .y_desc(axis.description())
        .x_label_formatter(&fmt_round)
        .y_label_formatter(&fmt_primary)
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.15))
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_desc("Difficulty")
        .y_label_formatter(&fmt_secondary)
        .draw()?;

    let single = spec.series.len() == 1;
    let x_span = layout.x.end - layout.x.start;

    for (i, series) in spec.series.iter().enumerate() {
        let (mining_color, difficulty_color) = if single {
            (SINGLE_MINING_COLOR, SINGLE_DIFFICULTY_COLOR)
        } else {
            (series_color(i), series_color(i))
        };
        let prefix = if single { String::new() } else { format!("{} ", series.label) };

        let line = &layout.mining_lines[i];
        if !line.is_empty() {
            chart
                .draw_series(LineSeries::new(line.iter().copied(), mining_color.stroke_width(2)))?
                .label(format!("{prefix}Mining Time ({}-block MA)", options.window))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], mining_color.stroke_width(2)));
        }

        let difficulty_style = if single {
            difficulty_color.stroke_width(2)
        } else {
            difficulty_color.mix(0.55).stroke_width(1)
        };
        chart
            .draw_secondary_series(LineSeries::new(difficulty_points(series), difficulty_style))?
            .label(format!("{prefix}Difficulty"))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], difficulty_style));

        if let Some(value) = reference_for(spec, series, options) {
            let style = difficulty_color.mix(0.45).stroke_width(1);
            chart
                .draw_secondary_series(
                    dashed_segments(&layout.x, value, x_span)
                        .into_iter()
                        .map(move |seg| PathElement::new(seg, style)),
                )?
                .label(format!("{prefix}exp(-Δ/T) = {value:.4}"))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 8, y)], style));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

fn draw_difficulty_only(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    spec: &ChartSpec,
    options: &RenderOptions,
    layout: &Layout,
) -> Result<(), Box<dyn Error>> {
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(layout.x.clone(), layout.difficulty.clone())?;

    let fmt_value = |v: &f64| format_axis_value(*v);
    let fmt_round = |v: &f64| format!("{v:.0}");

    chart
        .configure_mesh()
        .x_desc("Round")
        .y_desc("Difficulty")
        .x_label_formatter(&fmt_round)
        .y_label_formatter(&fmt_value)
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.15))
        .draw()?;

    let single = spec.series.len() == 1;
    let x_span = layout.x.end - layout.x.start;

    for (i, series) in spec.series.iter().enumerate() {
        let color = if single { SINGLE_DIFFICULTY_COLOR } else { series_color(i) };
        let style = color.mix(0.8).stroke_width(2);

        chart
            .draw_series(LineSeries::new(difficulty_points(series), style))?
            .label(series.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));

        if let Some(value) = reference_for(spec, series, options) {
            let dash_style = color.mix(0.4).stroke_width(1);
            chart
                .draw_series(
                    dashed_segments(&layout.x, value, x_span)
                        .into_iter()
                        .map(move |seg| PathElement::new(seg, dash_style)),
                )?
                .label(format!("{} exp(-Δ/T) = {value:.4}", series.label))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 8, y)], dash_style));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

fn difficulty_points(series: &DerivedSeries) -> Vec<(f64, f64)> {
    series
        .points
        .iter()
        .filter(|p| p.difficulty.is_finite())
        .map(|p| (p.round as f64, p.difficulty))
        .collect()
}

fn reference_for(spec: &ChartSpec, series: &DerivedSeries, options: &RenderOptions) -> Option<f64> {
    if !options.reference_lines {
        return None;
    }
    let delta_t = series.delta_t?;
    spec.references
        .iter()
        .find(|r| r.delta_t == delta_t)
        .map(|r| r.value)
}

/// Short horizontal segments at height `y` spanning `x`.
fn dashed_segments(x: &Range<f64>, y: f64, span: f64) -> Vec<Vec<(f64, f64)>> {
    let dash = (span * DASH_FRACTION).max(f64::MIN_POSITIVE);
    let gap = span * GAP_FRACTION;

    let mut out = Vec::new();
    let mut start = x.start;
    while start < x.end {
        let end = (start + dash).min(x.end);
        out.push(vec![(start, y), (end, y)]);
        start = end + gap;
    }
    out
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn padded(lo: f64, hi: f64, frac: f64) -> Range<f64> {
    let span = hi - lo;
    if span <= f64::EPSILON * hi.abs().max(1.0) {
        let half = (lo.abs() * 0.1).max(0.5);
        return (lo - half)..(hi + half);
    }
    (lo - span * frac)..(hi + span * frac)
}

/// Plain (non-scientific) tick labels.
fn format_axis_value(v: f64) -> String {
    let a = v.abs();
    if a >= 100.0 {
        format!("{v:.0}")
    } else if a >= 1.0 {
        format!("{v:.2}")
    } else {
        format!("{v:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{chart_spec, derive_series};
    use crate::domain::TimeSeriesRecord;
    use crate::io::store::MemoryStore;

    fn series(label: &str, delta_t: Option<f64>, has_mining_time: bool) -> DerivedSeries {
        let records: Vec<TimeSeriesRecord> = (1..=50u64)
            .map(|r| TimeSeriesRecord {
                round: r,
                mining_time_ms: 1000.0 + (r % 7) as f64 * 100.0,
                difficulty: 1.0 - 0.005 * r as f64,
            })
            .collect();
        derive_series(&records, 5, label, delta_t, has_mining_time).unwrap()
    }

    fn options(output: &str) -> RenderOptions {
        RenderOptions {
            window: 5,
            log_scale: false,
            output: PathBuf::from(output),
            mining_time: true,
            reference_lines: true,
            title: "Mining Time and Difficulty".to_string(),
        }
    }

    #[test]
    fn single_series_chart_has_combined_legend() {
        let spec = chart_spec(vec![series("run", Some(0.1), true)]);
        let svg = render_svg(&spec, &options("plot.svg")).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Mining Time (5-block MA)"));
        assert!(svg.contains("Difficulty"));
        assert!(svg.contains("exp(-Δ/T) = 0.9048"));
    }

    #[test]
    fn comparison_chart_labels_each_series() {
        let spec = chart_spec(vec![
            series("Δ/T=0.1", Some(0.1), true),
            series("Δ/T=0.5", Some(0.5), true),
        ]);
        let mut opts = options("cmp.svg");
        opts.log_scale = true;
        let svg = render_svg(&spec, &opts).unwrap();
        assert!(svg.contains("Δ/T=0.1 Difficulty"));
        assert!(svg.contains("Δ/T=0.5 exp(-Δ/T) = 0.6065"));
        assert!(svg.contains("Log Scale"));
    }

    #[test]
    fn difficulty_only_when_mining_time_is_absent() {
        let spec = chart_spec(vec![series("a", Some(0.25), false)]);
        let mut opts = options("d.svg");
        opts.reference_lines = false;
        opts.title = "Difficulty over rounds".to_string();
        let svg = render_svg(&spec, &opts).unwrap();
        assert!(!svg.contains("Mining Time"));
        assert!(!svg.contains("exp(-Δ/T)"));
    }

    #[test]
    fn chart_is_written_through_the_store() {
        let store = MemoryStore::new();
        let spec = chart_spec(vec![series("run", None, true)]);
        let path = render_chart(&store, &spec, &options("out/plot-mining-run.svg")).unwrap();
        let bytes = store.get(&path).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("</svg>"));
    }

    #[test]
    fn non_svg_output_is_rejected() {
        let store = MemoryStore::new();
        let spec = chart_spec(vec![series("run", None, true)]);
        assert!(render_chart(&store, &spec, &options("plot.png")).is_err());
        assert!(store.get(Path::new("plot.png")).is_none());
    }

    #[test]
    fn empty_chart_is_an_error() {
        let spec = chart_spec(vec![DerivedSeries {
            label: "empty".to_string(),
            delta_t: None,
            has_mining_time: true,
            points: Vec::new(),
        }]);
        assert!(render_svg(&spec, &options("x.svg")).is_err());
    }

    #[test]
    fn log_axis_drops_non_positive_times() {
        let axis = MiningAxis { log: true };
        assert_eq!(axis.to_axis(100.0), Some(2.0));
        assert_eq!(axis.to_axis(0.0), None);
        assert_eq!(axis.tick_label(1.0), "10.00");

        let linear = MiningAxis { log: false };
        assert_eq!(linear.to_axis(0.0), Some(0.0));
        assert_eq!(linear.tick_label(0.5), "0.5000");

        let mut s = series("z", None, true);
        s.points[0].mining_time_ma = 0.0;
        let mut opts = options("z.svg");
        opts.log_scale = true;
        assert_eq!(mining_line(&s, &opts).len(), s.points.len() - 1);
        opts.log_scale = false;
        assert_eq!(mining_line(&s, &opts).len(), s.points.len());
    }

    #[test]
    fn palette_is_deterministic() {
        assert_eq!(series_color(0).rgb(), series_color(10).rgb());
        assert_ne!(series_color(0).rgb(), series_color(1).rgb());
    }

    #[test]
    fn dashes_cover_the_axis() {
        let segs = dashed_segments(&(0.0..100.0), 0.5, 100.0);
        assert!(segs.len() > 10);
        assert_eq!(segs[0][0], (0.0, 0.5));
        assert!(segs.iter().all(|s| s[1].0 <= 100.0 && s[0].1 == 0.5));
    }
}
