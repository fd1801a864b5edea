//! String builders for the sweep summary, series statistics and skip lists.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::analysis::SeriesStats;
use crate::domain::{DerivedSeries, RunOutcome, SkippedArtifact, SweepConfig};
use crate::io::series::LoadedSeries;
use crate::sweep::SweepSummary;

/// Number of rows shown by [`format_data_sample`] in the CLI.
pub const SAMPLE_ROWS: usize = 10;

/// Banner printed before a sweep is dispatched.
pub fn format_sweep_header(
    config: &SweepConfig,
    generation_time: u64,
    workers: usize,
    simulator: &Path,
) -> String {
    let mut out = String::new();

    out.push_str("=== dsweep - Δ/T sweep ===\n");
    out.push_str(&format!("Protocol: {}\n", config.protocol));
    out.push_str(&format!("Δ/T values: {}\n", fmt_deltas(&config.delta_values)));
    out.push_str(&format!("Nodes: {}\n", config.num_nodes));
    out.push_str(&format!("Generation time: {generation_time} ms\n"));
    out.push_str(&format!("End round: {}\n", config.end_round));
    out.push_str(&format!("Workers: {workers}\n"));
    out.push_str(&format!("Simulator: {}\n", simulator.display()));
    out.push_str(&format!("Output dir: {}\n", config.output_dir.display()));
    out.push_str(&format!("{:=<50}\n", ""));

    out
}

/// One line per finished run.
pub fn format_outcome(outcome: &RunOutcome) -> String {
    if outcome.success {
        format!("✓ Δ/T={} finished", outcome.delta_t)
    } else {
        let reason = outcome.failure.as_deref().unwrap_or("unknown failure");
        format!("✗ Δ/T={} failed: {}", outcome.delta_t, first_line(reason))
    }
}

/// Final sweep summary: counts, Δ/T per partition and failure details.
pub fn format_sweep_summary(summary: &SweepSummary, finished_at: DateTime<Local>) -> String {
    let mut out = String::new();

    out.push_str("=== Sweep summary ===\n");
    out.push_str(&format!("Finished: {}\n", finished_at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!(
        "Total: {} | succeeded: {} | failed: {}\n",
        summary.total,
        summary.success_count(),
        summary.failure_count()
    ));
    out.push_str(&format!("Succeeded Δ/T: {}\n", fmt_deltas(&summary.successful_deltas())));
    out.push_str(&format!("Failed Δ/T: {}\n", fmt_deltas(&summary.failed_deltas())));

    if !summary.failed.is_empty() {
        out.push_str("\nFailures:\n");
        for o in &summary.failed {
            let reason = o.failure.as_deref().unwrap_or("unknown failure");
            out.push_str(&format!("- Δ/T={}: {}\n", o.delta_t, indent_tail(reason)));
        }
    }

    out
}

/// Statistics block for one analyzed artifact.
pub fn format_series_stats(
    loaded: &LoadedSeries,
    stats: Option<&SeriesStats>,
    window: usize,
) -> String {
    let mut out = String::new();

    out.push_str("=== Data Statistics ===\n");
    out.push_str(&format!("CSV file: {}\n", loaded.path.display()));

    let Some(stats) = stats else {
        out.push_str("Total blocks: 0\n");
        return out;
    };

    out.push_str(&format!("Total blocks: {}\n", stats.count));
    out.push_str(&format!("Average difficulty: {:.2}\n", stats.mean_difficulty));
    if loaded.has_mining_time() {
        out.push_str(&format!(
            "Average mining time: {:.3} sec\n",
            stats.mean_mining_time_sec
        ));
        match stats.std_mining_time_sec {
            Some(std) => out.push_str(&format!("Mining time std deviation: {std:.3} sec\n")),
            None => out.push_str("Mining time std deviation: n/a\n"),
        }
    } else {
        out.push_str("Average mining time: n/a (no mining_time column)\n");
    }
    out.push_str(&format!("Moving average window size: {window}\n"));

    if loaded.duplicates_dropped > 0 {
        out.push_str(&format!(
            "Duplicate rounds dropped: {}\n",
            loaded.duplicates_dropped
        ));
    }
    if !loaded.row_errors.is_empty() {
        out.push_str(&format!("Rows skipped: {}\n", loaded.row_errors.len()));
        for e in loaded.row_errors.iter().take(5) {
            out.push_str(&format!("  line {}: {}\n", e.line, e.message));
        }
    }

    out
}

/// First `rows` derived rows as a fixed-width table.
pub fn format_data_sample(series: &DerivedSeries, rows: usize) -> String {
    let mut out = String::new();

    out.push_str("=== Data Sample ===\n");
    out.push_str(
        format!(
            "{:>10} {:>16} {:>16} {:>14}",
            "round", "mining_time_sec", "mining_time_ma", "difficulty"
        )
        .trim_end(),
    );
    out.push('\n');

    for p in series.points.iter().take(rows) {
        out.push_str(&format!(
            "{:>10} {:>16.3} {:>16.3} {:>14.6}\n",
            p.round, p.mining_time_sec, p.mining_time_ma, p.difficulty
        ));
    }

    out
}

/// Diagnostics for artifacts left out of a comparison.
pub fn format_skipped(skipped: &[SkippedArtifact]) -> String {
    let mut out = String::new();
    for s in skipped {
        let delta = s
            .delta_t
            .map(|d| format!(" (Δ/T={d})"))
            .unwrap_or_default();
        out.push_str(&format!("✗ skipped {}{delta}: {}\n", s.path.display(), s.reason));
    }
    out
}

fn fmt_deltas(deltas: &[f64]) -> String {
    let parts: Vec<String> = deltas.iter().map(|d| format!("{d}")).collect();
    format!("[{}]", parts.join(", "))
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

fn indent_tail(s: &str) -> String {
    s.trim_end().replace('\n', "\n    ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use chrono::TimeZone;

    use crate::analysis::{derive_series, series_stats};
    use crate::domain::TimeSeriesRecord;
    use crate::io::series::ColumnLayout;
    use crate::sweep::summarize;

    fn outcome(index: usize, delta_t: f64, success: bool) -> RunOutcome {
        RunOutcome {
            index,
            delta_t,
            success,
            stdout: String::new(),
            stderr: String::new(),
            failure: (!success).then(|| "exit code 1\npanic: boom".to_string()),
        }
    }

    fn loaded(has_mining_time: bool) -> LoadedSeries {
        LoadedSeries {
            path: PathBuf::from("data/ethereum-0.1.csv"),
            records: Vec::new(),
            layout: ColumnLayout {
                round: 0,
                mining_time: has_mining_time.then_some(1),
                difficulty: 2,
                positional: false,
            },
            rows_read: 4,
            duplicates_dropped: 1,
            row_errors: Vec::new(),
        }
    }

    #[test]
    fn summary_lists_counts_and_deltas() {
        let summary = summarize(&[
            outcome(2, 0.5, false),
            outcome(0, 0.01, true),
            outcome(1, 0.1, true),
        ]);
        let at = Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let text = format_sweep_summary(&summary, at);

        assert!(text.contains("Finished: 2026-01-02 03:04:05"));
        assert!(text.contains("Total: 3 | succeeded: 2 | failed: 1"));
        assert!(text.contains("Succeeded Δ/T: [0.01, 0.1]"));
        assert!(text.contains("Failed Δ/T: [0.5]"));
        assert!(text.contains("- Δ/T=0.5: exit code 1\n    panic: boom"));
    }

    #[test]
    fn outcome_lines_show_first_line_of_failure() {
        assert_eq!(format_outcome(&outcome(0, 0.25, true)), "✓ Δ/T=0.25 finished");
        assert_eq!(format_outcome(&outcome(0, 0.25, false)), "✗ Δ/T=0.25 failed: exit code 1");
    }

    #[test]
    fn header_shows_resolved_parameters() {
        let config = SweepConfig {
            protocol: "ethereum".to_string(),
            delta_values: vec![0.01, 0.1],
            num_nodes: 10,
            end_round: 1000,
            generation_time: None,
            output_dir: PathBuf::from("data"),
            max_workers: 2,
        };
        let text = format_sweep_header(&config, 15000, 2, Path::new("sim"));
        assert!(text.contains("Protocol: ethereum"));
        assert!(text.contains("Δ/T values: [0.01, 0.1]"));
        assert!(text.contains("Generation time: 15000 ms"));
        assert!(text.contains("Workers: 2"));
    }

    #[test]
    fn stats_block_matches_series() {
        let records: Vec<TimeSeriesRecord> = [1000.0, 2000.0, 3000.0]
            .iter()
            .enumerate()
            .map(|(i, &t)| TimeSeriesRecord {
                round: i as u64 + 1,
                mining_time_ms: t,
                difficulty: 0.5,
            })
            .collect();
        let series = derive_series(&records, 2, "x", None, true).unwrap();
        let stats = series_stats(&series).unwrap();

        let text = format_series_stats(&loaded(true), Some(&stats), 2);
        assert!(text.contains("Total blocks: 3"));
        assert!(text.contains("Average difficulty: 0.50"));
        assert!(text.contains("Average mining time: 2.000 sec"));
        assert!(text.contains("Mining time std deviation: 1.000 sec"));
        assert!(text.contains("Duplicate rounds dropped: 1"));

        let sample = format_data_sample(&series, SAMPLE_ROWS);
        assert_eq!(sample.lines().count(), 2 + 3);
        assert!(sample.lines().nth(2).unwrap().trim_start().starts_with("1 "));
    }

    #[test]
    fn stats_without_mining_time() {
        let text = format_series_stats(&loaded(false), None, 5);
        assert!(text.contains("Total blocks: 0"));

        let series = derive_series(
            &[TimeSeriesRecord { round: 1, mining_time_ms: 0.0, difficulty: 1.0 }],
            5,
            "x",
            None,
            false,
        )
        .unwrap();
        let stats = series_stats(&series).unwrap();
        let text = format_series_stats(&loaded(false), Some(&stats), 5);
        assert!(text.contains("n/a (no mining_time column)"));
    }

    #[test]
    fn skipped_lines_name_path_and_reason() {
        let text = format_skipped(&[SkippedArtifact {
            path: PathBuf::from("data/bitcoin-0.5.csv"),
            delta_t: Some(0.5),
            reason: "file not found".to_string(),
        }]);
        assert_eq!(text, "✗ skipped data/bitcoin-0.5.csv (Δ/T=0.5): file not found\n");
    }
}
