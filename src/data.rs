//! Data loading and preparation for the backtest engine.
//!
//! Reads wide CSV tables (one date column, one column per asset), reports on
//! data quality, fills missing values, resamples to month-end and converts
//! prices to log returns.

use crate::error::{BacktestError, Result};
use crate::frequency::{infer_frequency, Frequency};
use crate::types::ReturnMatrix;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Header names recognised as the date column.
const DATE_ALIASES: [&str; 9] = [
    "Date",
    "date",
    "DATE",
    "Timestamp",
    "timestamp",
    "Time",
    "time",
    "datetime",
    "Datetime",
];

/// Cell contents read as a missing value.
const MISSING_MARKERS: [&str; 7] = ["", "nan", "NaN", "NAN", "NA", "null", "None"];

/// Data source configuration.
#[derive(Debug, Clone, Default)]
pub struct DataConfig {
    /// Name of the date column. Defaults to a recognised alias or the first column.
    pub date_column: Option<String>,
    /// Date format string for parsing (e.g., "%Y-%m-%d").
    pub date_format: Option<String>,
    /// CSV delimiter character. If None, delimiter is auto-detected.
    pub delimiter: Option<u8>,
}

/// Detect the CSV delimiter by analyzing the first few lines of the file.
///
/// Tries common delimiters (comma, tab, semicolon, pipe) and returns the one
/// that produces the most consistent column count across lines.
fn detect_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let lines: Vec<String> = reader
        .lines()
        .take(5)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Ok(b',');
    }

    let delimiters = [b',', b'\t', b';', b'|'];

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in &delimiters {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.as_bytes().iter().filter(|&&b| b == delim).count() + 1)
            .collect();

        // Need a date column plus at least one asset
        let first_count = counts[0];
        let all_consistent = counts.iter().all(|&c| c == first_count);

        if all_consistent && first_count >= 2 && first_count > best_score {
            best_score = first_count;
            best_delimiter = delim;
        }
    }

    debug!(
        "Detected delimiter {:?} with score {}",
        best_delimiter as char, best_score
    );
    Ok(best_delimiter)
}

/// Parse a date string with multiple format attempts.
pub fn parse_datetime(s: &str, format: Option<&str>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));

    if let Some(fmt) = format {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
        if let Some(dt) = NaiveDate::parse_from_str(s, fmt).ok().and_then(midnight) {
            return Ok(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];

    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let date_formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d-%m-%Y",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%d-%b-%Y",  // 15-Jan-2024
        "%d %b %Y",  // 15 Jan 2024
        "%b %d, %Y", // Jan 15, 2024
    ];

    for fmt in &date_formats {
        if let Some(dt) = NaiveDate::parse_from_str(s, fmt).ok().and_then(midnight) {
            return Ok(dt);
        }
    }

    Err(BacktestError::InvalidIndex(format!(
        "Could not parse date: '{}'",
        s
    )))
}

fn parse_cell(raw: &str, row: usize, column: &str) -> Result<f64> {
    let cell = raw.trim();
    if MISSING_MARKERS.contains(&cell) {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| {
        BacktestError::InvalidData(format!(
            "row {}, column '{}': '{}' is not a number",
            row, column, cell
        ))
    })
}

/// Load a wide price or return table from a CSV file.
///
/// The date column is taken from `config.date_column`, else the first header
/// matching a common date name, else the first column. Every other column is
/// an asset. Empty cells and `NaN`-like markers load as missing values.
pub fn load_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<ReturnMatrix> {
    let path = path.as_ref();
    info!("Loading data from: {}", path.display());

    let delimiter = match config.delimiter {
        Some(d) => d,
        None => detect_delimiter(path)?,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let date_idx = match &config.date_column {
        Some(name) => headers.iter().position(|h| h == name).ok_or_else(|| {
            BacktestError::InvalidData(format!("date column '{}' not found", name))
        })?,
        None => headers
            .iter()
            .position(|h| DATE_ALIASES.contains(&h))
            .unwrap_or(0),
    };

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    if columns.is_empty() {
        return Err(BacktestError::InvalidData(
            "no asset columns found".to_string(),
        ));
    }

    let mut index = Vec::new();
    let mut values = Vec::new();

    for (row_num, record) in reader.records().enumerate() {
        let record = record?;
        let date_cell = record.get(date_idx).unwrap_or_default();
        let timestamp = parse_datetime(date_cell, config.date_format.as_deref()).map_err(|_| {
            BacktestError::InvalidIndex(format!(
                "row {}: '{}' could not be converted to a timestamp",
                row_num + 1,
                date_cell
            ))
        })?;
        index.push(timestamp);

        let mut col = 0;
        for (i, cell) in record.iter().enumerate() {
            if i == date_idx {
                continue;
            }
            values.push(parse_cell(cell, row_num + 1, &columns[col])?);
            col += 1;
        }
    }

    if index.is_empty() {
        return Err(BacktestError::NoData);
    }

    let matrix = ReturnMatrix::new(index, columns, values)?;

    info!(
        "Loaded {} rows x {} assets from {} to {}",
        matrix.len(),
        matrix.n_assets(),
        matrix.index().first().map(|t| t.to_string()).unwrap_or_default(),
        matrix.index().last().map(|t| t.to_string()).unwrap_or_default()
    );

    Ok(matrix)
}

// =============================================================================
// Data Quality
// =============================================================================

/// Report on the shape and completeness of a matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    /// Number of rows.
    pub rows: usize,
    /// Number of asset columns.
    pub assets: usize,
    /// Missing cells across the whole matrix.
    pub missing_values: usize,
    /// Regular sampling frequency, if one could be inferred.
    pub frequency: Option<Frequency>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DataQualityReport {
    /// True when nothing needs cleaning.
    pub fn is_acceptable(&self) -> bool {
        self.rows > 0 && self.missing_values == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "Rows: {}, Assets: {}, Missing: {}, Frequency: {}",
            self.rows,
            self.assets,
            self.missing_values,
            self.frequency
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        )
    }
}

/// Inspect a matrix before a backtest.
///
/// Warns about missing values unless `silent` is set.
pub fn validate(matrix: &ReturnMatrix, silent: bool) -> DataQualityReport {
    let missing_values = matrix.missing_count();
    if !silent && missing_values > 0 {
        warn!(
            "Input data contains {} NaN values. Use clean to handle them.",
            missing_values
        );
    }

    DataQualityReport {
        rows: matrix.len(),
        assets: matrix.n_assets(),
        missing_values,
        frequency: infer_frequency(matrix.index()),
        start: matrix.index().first().copied(),
        end: matrix.index().last().copied(),
    }
}

// =============================================================================
// Missing Data Handling
// =============================================================================

/// Methods for filling missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanMethod {
    /// Carry the last known value forward.
    #[default]
    ForwardFill,
    /// Pull the next known value backward.
    BackwardFill,
    /// Replace missing values with 0.0.
    FillZero,
}

impl FromStr for CleanMethod {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ffill" => Ok(CleanMethod::ForwardFill),
            "bfill" => Ok(CleanMethod::BackwardFill),
            "fill_zero" => Ok(CleanMethod::FillZero),
            other => Err(BacktestError::InvalidConfiguration(format!(
                "Unknown cleaning method: {}",
                other
            ))),
        }
    }
}

/// Fill missing values column by column.
///
/// Forward and backward fill leave values they cannot reach (leading or
/// trailing gaps) missing.
pub fn clean(matrix: &ReturnMatrix, method: CleanMethod) -> ReturnMatrix {
    let rows = matrix.len();
    let width = matrix.n_assets();
    let mut values = matrix.values().to_vec();

    match method {
        CleanMethod::FillZero => {
            for v in values.iter_mut().filter(|v| v.is_nan()) {
                *v = 0.0;
            }
        }
        CleanMethod::ForwardFill => {
            for col in 0..width {
                let mut last = f64::NAN;
                for row in 0..rows {
                    let cell = &mut values[row * width + col];
                    if cell.is_nan() {
                        *cell = last;
                    } else {
                        last = *cell;
                    }
                }
            }
        }
        CleanMethod::BackwardFill => {
            for col in 0..width {
                let mut next = f64::NAN;
                for row in (0..rows).rev() {
                    let cell = &mut values[row * width + col];
                    if cell.is_nan() {
                        *cell = next;
                    } else {
                        next = *cell;
                    }
                }
            }
        }
    }

    let filled = matrix.missing_count() - values.iter().filter(|v| v.is_nan()).count();
    debug!("Filled {} missing values using {:?}", filled, method);

    matrix.with_values(values)
}

// =============================================================================
// Transformations
// =============================================================================

/// Convert a price table to log returns `ln(P_t / P_{t-1})`.
///
/// The first row has no predecessor and is dropped, as is every row in which
/// any asset's return is missing.
pub fn price_to_log_returns(prices: &ReturnMatrix) -> Result<ReturnMatrix> {
    let mut index = Vec::with_capacity(prices.len().saturating_sub(1));
    let mut values = Vec::with_capacity(prices.values().len());
    let mut dropped = 0;

    for t in 1..prices.len() {
        let prev = prices.row(t - 1);
        let row: Vec<f64> = prices
            .row(t)
            .iter()
            .zip(prev)
            .map(|(p, p_prev)| (p / p_prev).ln())
            .collect();

        if row.iter().any(|r| r.is_nan()) {
            dropped += 1;
            continue;
        }
        index.push(prices.index()[t]);
        values.extend(row);
    }

    if dropped > 0 {
        debug!("Dropped {} rows with missing returns", dropped);
    }

    ReturnMatrix::new(index, prices.columns().to_vec(), values)
}

/// Months since year 0, so consecutive calendar months differ by one.
fn month_key(ts: DateTime<Utc>) -> i64 {
    ts.year() as i64 * 12 + ts.month0() as i64
}

fn month_end_of(key: i64) -> Result<DateTime<Utc>> {
    let next = key + 1;
    i32::try_from(next.div_euclid(12))
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, next.rem_euclid(12) as u32 + 1, 1))
        .and_then(|first| (first - Duration::days(1)).and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| BacktestError::InvalidIndex(format!("no month end for month {}", key)))
}

/// Resample to month-end: one row per calendar month holding each column's
/// last non-missing observation in that month.
///
/// Every month between the first and last observation gets a row; a month
/// without observations is all `NaN`.
pub fn resample_to_monthly(matrix: &ReturnMatrix) -> Result<ReturnMatrix> {
    let width = matrix.n_assets();
    let mut index: Vec<DateTime<Utc>> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    let mut current: Option<i64> = None;
    let mut empty_months = 0;

    for (ts, row) in matrix.rows() {
        let key = month_key(ts);
        if current != Some(key) {
            let first = current.map_or(key, |prev| prev + 1);
            for month in first..=key {
                index.push(month_end_of(month)?);
                values.extend(std::iter::repeat(f64::NAN).take(width));
            }
            empty_months += key - first;
            current = Some(key);
        }

        let start = values.len() - width;
        for (slot, &v) in values[start..].iter_mut().zip(row) {
            if !v.is_nan() {
                *slot = v;
            }
        }
    }

    if empty_months > 0 {
        debug!("{} months without observations left as NaN", empty_months);
    }
    debug!("Resampled {} rows to {} months", matrix.len(), index.len());
    ReturnMatrix::new(index, matrix.columns().to_vec(), values)
}

/// Whether a loaded table holds prices or already-computed log returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Prices,
    #[default]
    Returns,
}

/// Steps turning a loaded table into the return matrix the engine consumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareOptions {
    pub kind: DataKind,
    /// Fill missing values first.
    pub clean: Option<CleanMethod>,
    /// Resample to month-end before computing returns.
    pub resample_monthly: bool,
}

/// Clean, resample and convert a loaded table, in that order.
pub fn prepare(matrix: ReturnMatrix, options: &PrepareOptions) -> Result<ReturnMatrix> {
    let mut matrix = match options.clean {
        Some(method) => clean(&matrix, method),
        None => matrix,
    };
    if options.resample_monthly {
        matrix = resample_to_monthly(&matrix)?;
    }
    if options.kind == DataKind::Prices {
        matrix = price_to_log_returns(&matrix)?;
    }

    info!(
        "Prepared {} rows x {} assets for backtesting",
        matrix.len(),
        matrix.n_assets()
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert_eq!(parse_datetime("2024-01-15", None).unwrap(), date(2024, 1, 15));
        assert_eq!(parse_datetime("2024/01/15", None).unwrap(), date(2024, 1, 15));
        assert_eq!(parse_datetime("15-Jan-2024", None).unwrap(), date(2024, 1, 15));
        assert_eq!(
            parse_datetime("2024-01-15 10:30:00", None).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("15.01.2024", Some("%d.%m.%Y")).unwrap(),
            date(2024, 1, 15)
        );
        assert!(parse_datetime("not a date", None).is_err());
    }

    #[test]
    fn test_load_csv_sorts_and_reads_missing() {
        let file = write_csv(
            "Date,A,B\n\
             2020-03-31,3.0,30.0\n\
             2020-01-31,1.0,\n\
             2020-02-29,2.0,NaN\n",
        );

        let matrix = load_csv(file.path(), &DataConfig::default()).unwrap();
        assert_eq!(matrix.columns(), &["A".to_string(), "B".to_string()]);
        assert_eq!(matrix.len(), 3);
        assert!(matrix.is_chronological());
        assert_eq!(matrix.column("A").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(matrix.missing_count(), 2);
    }

    #[test]
    fn test_load_csv_named_date_column_and_semicolons() {
        let file = write_csv("SPY;when;TLT\n1.0;2021-01-29;2.0\n1.5;2021-02-26;2.5\n");
        let config = DataConfig {
            date_column: Some("when".to_string()),
            ..Default::default()
        };

        let matrix = load_csv(file.path(), &config).unwrap();
        assert_eq!(matrix.columns(), &["SPY".to_string(), "TLT".to_string()]);
        assert_eq!(matrix.row(1), &[1.5, 2.5]);
    }

    #[test]
    fn test_load_csv_invalid_index() {
        let file = write_csv("Date,A\na,1.0\nb,2.0\n");
        let result = load_csv(file.path(), &DataConfig::default());
        assert!(matches!(result, Err(BacktestError::InvalidIndex(_))));
    }

    #[test]
    fn test_load_csv_bad_cell() {
        let file = write_csv("Date,A\n2020-01-31,abc\n");
        let result = load_csv(file.path(), &DataConfig::default());
        assert!(matches!(result, Err(BacktestError::InvalidData(_))));
    }

    #[test]
    fn test_load_csv_empty() {
        let file = write_csv("Date,A\n");
        let result = load_csv(file.path(), &DataConfig::default());
        assert!(matches!(result, Err(BacktestError::NoData)));
    }

    #[test]
    fn test_validate_report() {
        let matrix = ReturnMatrix::new(
            vec![date(2020, 1, 31), date(2020, 2, 29), date(2020, 3, 31)],
            columns(&["A"]),
            vec![1.0, f64::NAN, 3.0],
        )
        .unwrap();

        let report = validate(&matrix, true);
        assert_eq!(report.rows, 3);
        assert_eq!(report.missing_values, 1);
        assert_eq!(report.frequency, Some(Frequency::MonthEnd));
        assert!(!report.is_acceptable());
        assert!(report.summary().contains("Missing: 1"));
    }

    #[test]
    fn test_clean_forward_fill() {
        let matrix = ReturnMatrix::new(
            (1..=5).map(|d| date(2020, 1, d)).collect(),
            columns(&["A"]),
            vec![1.0, f64::NAN, 3.0, f64::NAN, 5.0],
        )
        .unwrap();

        let cleaned = clean(&matrix, CleanMethod::ForwardFill);
        assert_eq!(cleaned.missing_count(), 0);
        assert_eq!(cleaned.value(1, 0), 1.0);
        assert_eq!(cleaned.value(3, 0), 3.0);
    }

    #[test]
    fn test_clean_backward_fill_and_zero() {
        let matrix = ReturnMatrix::new(
            (1..=3).map(|d| date(2020, 1, d)).collect(),
            columns(&["A", "B"]),
            vec![f64::NAN, 1.0, 2.0, f64::NAN, 3.0, f64::NAN],
        )
        .unwrap();

        let bfilled = clean(&matrix, CleanMethod::BackwardFill);
        assert_eq!(bfilled.column("A").unwrap(), vec![2.0, 2.0, 3.0]);
        // Trailing gap cannot be back-filled
        assert!(bfilled.value(2, 1).is_nan());

        let zeroed = clean(&matrix, CleanMethod::FillZero);
        assert_eq!(zeroed.column("B").unwrap(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_clean_method_parsing() {
        assert_eq!("ffill".parse::<CleanMethod>().unwrap(), CleanMethod::ForwardFill);
        assert_eq!("bfill".parse::<CleanMethod>().unwrap(), CleanMethod::BackwardFill);
        assert_eq!("fill_zero".parse::<CleanMethod>().unwrap(), CleanMethod::FillZero);
        assert!(matches!(
            "interpolate".parse::<CleanMethod>(),
            Err(BacktestError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_price_to_log_returns() {
        let prices = ReturnMatrix::new(
            vec![date(2020, 1, 31), date(2020, 2, 29), date(2020, 3, 31)],
            columns(&["A"]),
            vec![100.0, 110.0, 99.0],
        )
        .unwrap();

        let returns = price_to_log_returns(&prices).unwrap();
        assert_eq!(returns.len(), 2);
        assert_eq!(returns.index()[0], date(2020, 2, 29));
        assert!((returns.value(0, 0) - (1.1f64).ln()).abs() < 1e-12);
        assert!((returns.value(1, 0) - (0.9f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_price_to_log_returns_drops_missing_rows() {
        let prices = ReturnMatrix::new(
            (1..=4).map(|d| date(2020, 1, d)).collect(),
            columns(&["A", "B"]),
            vec![1.0, 1.0, 2.0, f64::NAN, 4.0, 2.0, 8.0, 4.0],
        )
        .unwrap();

        let returns = price_to_log_returns(&prices).unwrap();
        assert_eq!(returns.len(), 1);
        assert_eq!(returns.index()[0], date(2020, 1, 4));
        assert!(!returns.has_missing());
    }

    #[test]
    fn test_resample_to_monthly() {
        let prices = ReturnMatrix::new(
            vec![
                date(2020, 1, 2),
                date(2020, 1, 30),
                date(2020, 2, 3),
                date(2020, 2, 27),
                date(2020, 3, 2),
            ],
            columns(&["A", "B"]),
            vec![1.0, 10.0, 2.0, f64::NAN, 3.0, 30.0, 4.0, 40.0, 5.0, 50.0],
        )
        .unwrap();

        let monthly = resample_to_monthly(&prices).unwrap();
        assert_eq!(
            monthly.index(),
            &[date(2020, 1, 31), date(2020, 2, 29), date(2020, 3, 31)]
        );
        // Last non-missing value of the month
        assert_eq!(monthly.row(0), &[2.0, 10.0]);
        assert_eq!(monthly.row(1), &[4.0, 40.0]);
        assert_eq!(monthly.row(2), &[5.0, 50.0]);
    }

    #[test]
    fn test_resample_keeps_empty_months() {
        let prices = ReturnMatrix::new(
            vec![date(2020, 11, 10), date(2021, 2, 5)],
            columns(&["A"]),
            vec![1.0, 2.0],
        )
        .unwrap();

        let monthly = resample_to_monthly(&prices).unwrap();
        assert_eq!(
            monthly.index(),
            &[
                date(2020, 11, 30),
                date(2020, 12, 31),
                date(2021, 1, 31),
                date(2021, 2, 28)
            ]
        );
        assert_eq!(monthly.value(0, 0), 1.0);
        assert!(monthly.value(1, 0).is_nan());
        assert!(monthly.value(2, 0).is_nan());
        assert_eq!(monthly.value(3, 0), 2.0);
    }

    #[test]
    fn test_month_end_december() {
        assert_eq!(month_end_of(month_key(date(2021, 12, 5))).unwrap(), date(2021, 12, 31));
    }

    #[test]
    fn test_prepare_prices_pipeline() {
        let prices = ReturnMatrix::new(
            vec![
                date(2020, 1, 15),
                date(2020, 1, 31),
                date(2020, 2, 14),
                date(2020, 3, 13),
            ],
            columns(&["A"]),
            vec![1.0, 2.0, f64::NAN, 8.0],
        )
        .unwrap();
        let options = PrepareOptions {
            kind: DataKind::Prices,
            clean: Some(CleanMethod::ForwardFill),
            resample_monthly: true,
        };

        let returns = prepare(prices, &options).unwrap();
        assert_eq!(returns.index(), &[date(2020, 2, 29), date(2020, 3, 31)]);
        assert!((returns.value(0, 0) - 0.0).abs() < 1e-12);
        assert!((returns.value(1, 0) - 4f64.ln()).abs() < 1e-12);
    }
}
