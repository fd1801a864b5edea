//! Time-series artifact loading and normalization.
//!
//! Turns one simulator CSV into a clean, round-ordered list of
//! [`TimeSeriesRecord`]s:
//!
//! - **Schema**: `round`, `mining_time` (ms), `difficulty`, matched by header
//!   name. Without `round`/`difficulty` headers the first columns are used
//!   positionally, with a warning.
//! - **Row-level validation**: unparsable rows are skipped and reported.
//! - **Deduplication**: the first row for a round (in file order) wins. The
//!   simulator can emit a late duplicate for a round; the first write is
//!   authoritative.
//! - **Ordering**: ascending by round, applied after deduplication.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::TimeSeriesRecord;
use crate::error::AppError;
use crate::io::store::ArtifactStore;

/// Which CSV columns feed which record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub round: usize,
    pub mining_time: Option<usize>,
    pub difficulty: usize,
    /// True when the header names were not recognized.
    pub positional: bool,
}

/// A row-level error encountered while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Loader output: normalized records plus what happened along the way.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub path: PathBuf,
    pub records: Vec<TimeSeriesRecord>,
    pub layout: ColumnLayout,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    pub row_errors: Vec<RowError>,
}

impl LoadedSeries {
    pub fn has_mining_time(&self) -> bool {
        self.layout.mining_time.is_some()
    }
}

/// Load and normalize one artifact through `store`.
pub fn load_series(store: &dyn ArtifactStore, path: &Path) -> Result<LoadedSeries, AppError> {
    if !store.exists(path) {
        return Err(AppError::missing_artifact(format!(
            "Artifact '{}' not found.",
            path.display()
        )));
    }
    let bytes = store.read(path)?;
    parse_series(path, &bytes)
}

/// Parse and normalize CSV bytes. `path` is only used for messages.
pub fn parse_series(path: &Path, bytes: &[u8]) -> Result<LoadedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::data_format(format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();

    let layout = resolve_layout(&headers, path)?;

    let mut raw = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &layout) {
            Ok(row) => raw.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        tracing::warn!(
            path = %path.display(),
            skipped = row_errors.len(),
            first_line = row_errors[0].line,
            "skipped unparsable rows"
        );
    }

    let (records, duplicates_dropped) = normalize_records(raw);
    if records.is_empty() {
        return Err(AppError::data_format(format!(
            "No usable rows in '{}' ({rows_read} read, {} invalid).",
            path.display(),
            row_errors.len()
        )));
    }

    Ok(LoadedSeries {
        path: path.to_path_buf(),
        records,
        layout,
        rows_read,
        duplicates_dropped,
        row_errors,
    })
}

/// Drop later duplicates of a round (file order), then sort by round.
///
/// Returns the normalized records and how many duplicates were dropped.
pub fn normalize_records(raw: Vec<TimeSeriesRecord>) -> (Vec<TimeSeriesRecord>, usize) {
    let total = raw.len();
    let mut seen = HashSet::with_capacity(total);
    let mut records: Vec<TimeSeriesRecord> = raw.into_iter().filter(|r| seen.insert(r.round)).collect();
    let dropped = total - records.len();

    records.sort_by_key(|r| r.round);
    (records, dropped)
}

fn resolve_layout(headers: &StringRecord, path: &Path) -> Result<ColumnLayout, AppError> {
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect();

    let named_round = header_map.get("round").copied();
    let named_difficulty = header_map.get("difficulty").copied();
    let named_mining_time = header_map.get("mining_time").copied();
    let positional = named_round.is_none() || named_difficulty.is_none();

    if positional && headers.len() < 2 {
        return Err(AppError::data_format(format!(
            "'{}' has {} column(s); at least `round` and `difficulty` are required.",
            path.display(),
            headers.len()
        )));
    }

    // Named columns are taken first; positions only fill the gaps.
    let mut used: HashSet<usize> = [named_round, named_difficulty, named_mining_time]
        .into_iter()
        .flatten()
        .collect();
    let mut claim = |preferred: usize| -> Option<usize> {
        let idx = if preferred < headers.len() && !used.contains(&preferred) {
            Some(preferred)
        } else {
            (0..headers.len()).find(|i| !used.contains(i))
        }?;
        used.insert(idx);
        Some(idx)
    };

    let round = match named_round {
        Some(idx) => idx,
        None => claim(0).ok_or_else(|| no_column_for(path, "round"))?,
    };
    let difficulty = match named_difficulty {
        Some(idx) => idx,
        None => claim(1).ok_or_else(|| no_column_for(path, "difficulty"))?,
    };
    let mining_time = match named_mining_time {
        Some(idx) => Some(idx),
        None if positional => claim(2),
        None => None,
    };

    if positional {
        let names: Vec<&str> = headers.iter().collect();
        tracing::warn!(
            path = %path.display(),
            columns = ?names,
            round,
            difficulty,
            mining_time = ?mining_time,
            "expected `round`/`mining_time`/`difficulty` headers; unmatched fields use column positions"
        );
    }
    if mining_time.is_none() {
        tracing::warn!(
            path = %path.display(),
            "no `mining_time` column; mining time is treated as 0"
        );
    }

    Ok(ColumnLayout {
        round,
        mining_time,
        difficulty,
        positional,
    })
}

fn no_column_for(path: &Path, field: &str) -> AppError {
    AppError::data_format(format!(
        "'{}' has no column left for `{field}`.",
        path.display()
    ))
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, layout: &ColumnLayout) -> Result<TimeSeriesRecord, String> {
    let round = parse_round(get_field(record, layout.round, "round")?)?;
    let difficulty = parse_value(get_field(record, layout.difficulty, "difficulty")?, "difficulty")?;
    let mining_time_ms = match layout.mining_time {
        Some(idx) => parse_value(get_field(record, idx, "mining_time")?, "mining_time")?,
        None => 0.0,
    };

    Ok(TimeSeriesRecord {
        round,
        mining_time_ms,
        difficulty,
    })
}

fn get_field<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing `{name}` value."))
}

fn parse_round(s: &str) -> Result<u64, String> {
    if let Ok(v) = s.parse::<u64>() {
        return Ok(v);
    }
    // Some writers emit integral floats (`13.0`).
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        _ => Err(format!("Invalid `round` '{s}' (expected a non-negative integer).")),
    }
}

fn parse_value(s: &str, name: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid `{name}` '{s}' (expected a finite number).")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::io::store::MemoryStore;

    fn parse(text: &str) -> Result<LoadedSeries, AppError> {
        parse_series(Path::new("test.csv"), text.as_bytes())
    }

    fn rounds(series: &LoadedSeries) -> Vec<u64> {
        series.records.iter().map(|r| r.round).collect()
    }

    #[test]
    fn first_duplicate_wins() {
        let series = parse(
            "round,mining_time,difficulty\n1,1000,1.0\n1,1200,1.1\n2,2000,1.2\n3,3000,1.3\n",
        )
        .unwrap();
        assert_eq!(rounds(&series), vec![1, 2, 3]);
        let times: Vec<f64> = series.records.iter().map(|r| r.mining_time_ms).collect();
        assert_eq!(times, vec![1000.0, 2000.0, 3000.0]);
        assert_eq!(series.duplicates_dropped, 1);
        assert_eq!(series.rows_read, 4);
        assert!(!series.layout.positional);
    }

    #[test]
    fn dedup_uses_file_order_before_sorting() {
        let series = parse(
            "round,mining_time,difficulty\n3,30,1\n1,10,1\n3,31,1\n2,20,1\n",
        )
        .unwrap();
        assert_eq!(rounds(&series), vec![1, 2, 3]);
        assert_eq!(series.records[2].mining_time_ms, 30.0);
    }

    #[test]
    fn column_order_and_case_do_not_matter() {
        let series = parse("\u{feff}Difficulty, Round ,MINING_TIME\n0.5,7,900\n").unwrap();
        assert_eq!(
            series.records,
            vec![TimeSeriesRecord {
                round: 7,
                mining_time_ms: 900.0,
                difficulty: 0.5
            }]
        );
    }

    #[test]
    fn unknown_headers_fall_back_to_positions() {
        let series = parse("r,d,t\n1,0.9,1500\n2,0.8,1600\n").unwrap();
        assert!(series.layout.positional);
        assert!(series.has_mining_time());
        assert_eq!(series.records[1].difficulty, 0.8);
        assert_eq!(series.records[1].mining_time_ms, 1600.0);

        let two = parse("x,y\n1,0.9\n").unwrap();
        assert!(!two.has_mining_time());
        assert_eq!(two.records[0].difficulty, 0.9);
    }

    #[test]
    fn named_columns_survive_a_partial_fallback() {
        let series = parse("round,mining_time,diff\n1,1000,0.9\n").unwrap();
        assert!(series.layout.positional);
        assert_eq!(series.layout.mining_time, Some(1));
        assert_eq!(series.layout.difficulty, 2);
        assert_eq!(
            series.records,
            vec![TimeSeriesRecord {
                round: 1,
                mining_time_ms: 1000.0,
                difficulty: 0.9
            }]
        );

        let shifted = parse("mining_time,x,y\n1200,3,0.7\n").unwrap();
        assert_eq!(shifted.layout.mining_time, Some(0));
        assert_eq!(shifted.records[0].round, 3);
        assert_eq!(shifted.records[0].difficulty, 0.7);
    }

    #[test]
    fn unrecognized_mining_time_header_is_not_guessed() {
        let series = parse("round,mining_time_ms,difficulty\n1,1000,0.9\n").unwrap();
        assert!(!series.layout.positional);
        assert!(!series.has_mining_time());
        assert_eq!(series.records[0].mining_time_ms, 0.0);
        assert_eq!(series.records[0].difficulty, 0.9);
    }

    #[test]
    fn no_column_is_shared_between_fields() {
        let series = parse("difficulty,z\n0.5,4\n").unwrap();
        assert_eq!(series.layout.difficulty, 0);
        assert_eq!(series.layout.round, 1);
        assert_eq!(series.layout.mining_time, None);
        assert_eq!(series.records[0].round, 4);
    }

    #[test]
    fn single_column_is_a_format_error() {
        let err = parse("round\n1\n2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let series = parse(
            "round,mining_time,difficulty\n1,1000,1.0\nx,1100,1.0\n2,,1.0\n3,3000,1.5\n4.0,4000,1.6\n",
        )
        .unwrap();
        assert_eq!(rounds(&series), vec![1, 3, 4]);
        assert_eq!(series.row_errors.len(), 2);
        assert_eq!(series.row_errors[0].line, 3);
    }

    #[test]
    fn no_usable_rows_is_a_format_error() {
        let err = parse("round,mining_time,difficulty\nx,y,z\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn missing_file_is_reported_as_missing() {
        let store = MemoryStore::new();
        let err = load_series(&store, Path::new("data/ethereum-0.1.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArtifact);

        store.insert("data/ethereum-0.1.csv", "round,mining_time,difficulty\n1,10,1\n");
        let series = load_series(&store, Path::new("data/ethereum-0.1.csv")).unwrap();
        assert_eq!(series.path, PathBuf::from("data/ethereum-0.1.csv"));
    }
}
