//! Core data types for the backtest engine.

use crate::data::parse_datetime;
use crate::error::{BacktestError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use tracing::debug;

/// Time-indexed table of per-asset returns (or prices before conversion).
///
/// Rows are keyed by strictly increasing timestamps and every row carries one
/// value per column. Values are stored row-major; missing observations are
/// represented as `NaN` until the table is cleaned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReturnMatrix")]
pub struct ReturnMatrix {
    index: Vec<DateTime<Utc>>,
    columns: Vec<String>,
    values: Vec<f64>,
}

/// Unchecked wire form of a [`ReturnMatrix`].
#[derive(Deserialize)]
struct RawReturnMatrix {
    index: Vec<DateTime<Utc>>,
    columns: Vec<String>,
    values: Vec<f64>,
}

impl TryFrom<RawReturnMatrix> for ReturnMatrix {
    type Error = BacktestError;

    fn try_from(raw: RawReturnMatrix) -> Result<Self> {
        Self::new(raw.index, raw.columns, raw.values)
    }
}

impl ReturnMatrix {
    /// Create a matrix from a timestamp index, column labels and row-major values.
    ///
    /// Rows handed over out of order are re-sorted chronologically. Duplicate
    /// timestamps, duplicate or empty column labels and a value count that does
    /// not match `index.len() * columns.len()` are rejected.
    pub fn new(index: Vec<DateTime<Utc>>, columns: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != index.len() * columns.len() {
            return Err(BacktestError::InvalidData(format!(
                "expected {} values for {} rows x {} columns, got {}",
                index.len() * columns.len(),
                index.len(),
                columns.len(),
                values.len()
            )));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.trim().is_empty() {
                return Err(BacktestError::InvalidData(
                    "column labels must not be empty".to_string(),
                ));
            }
            if !seen.insert(column.as_str()) {
                return Err(BacktestError::InvalidData(format!(
                    "duplicate column label '{}'",
                    column
                )));
            }
        }

        let mut matrix = Self {
            index,
            columns,
            values,
        };
        matrix.sort_chronologically();

        if let Some(pair) = matrix.index.windows(2).find(|w| w[0] == w[1]) {
            return Err(BacktestError::InvalidIndex(format!(
                "duplicate timestamp {}",
                pair[0]
            )));
        }

        Ok(matrix)
    }

    /// Create a matrix from one `Vec` per row.
    pub fn from_rows(
        index: Vec<DateTime<Utc>>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if rows.len() != index.len() {
            return Err(BacktestError::InvalidData(format!(
                "{} rows supplied for an index of length {}",
                rows.len(),
                index.len()
            )));
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(BacktestError::InvalidData(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                columns.len()
            )));
        }

        let values = rows.into_iter().flatten().collect();
        Self::new(index, columns, values)
    }

    /// Create a matrix whose index is given as date/datetime strings.
    ///
    /// Fails with [`BacktestError::InvalidIndex`] when a label cannot be read
    /// as a timestamp.
    pub fn from_labels<S: AsRef<str>>(
        labels: &[S],
        columns: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let index = labels
            .iter()
            .map(|label| {
                parse_datetime(label.as_ref(), None).map_err(|_| {
                    BacktestError::InvalidIndex(format!(
                        "index label '{}' could not be converted to a timestamp",
                        label.as_ref()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(index, columns, values)
    }

    /// Same index and columns with replacement values of identical shape.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values,
        }
    }

    /// Whether the index is in non-decreasing chronological order.
    pub fn is_chronological(&self) -> bool {
        self.index.windows(2).all(|w| w[0] <= w[1])
    }

    /// Re-sort rows by timestamp. Stable and a no-op on sorted data.
    pub(crate) fn sort_chronologically(&mut self) {
        if self.is_chronological() {
            return;
        }
        debug!("Index is not chronological, sorting {} rows", self.index.len());

        let width = self.columns.len();
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by_key(|&i| self.index[i]);

        let index = order.iter().map(|&i| self.index[i]).collect();
        let values = order
            .iter()
            .flat_map(|&i| self.values[i * width..(i + 1) * width].iter().copied())
            .collect();

        self.index = index;
        self.values = values;
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of asset columns.
    pub fn n_assets(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values of a single row.
    pub fn row(&self, i: usize) -> &[f64] {
        let width = self.columns.len();
        &self.values[i * width..(i + 1) * width]
    }

    /// Single cell by row and column position.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.columns.len() + col]
    }

    /// Position of a column label.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of a column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.column_position(name)?;
        Some((0..self.len()).map(|row| self.value(row, col)).collect())
    }

    /// Whether any cell is missing.
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Borrow a contiguous range of rows as an immutable view.
    ///
    /// # Panics
    /// Panics if the range is out of bounds.
    pub fn window(&self, rows: Range<usize>) -> ReturnWindow<'_> {
        let width = self.columns.len();
        ReturnWindow {
            offset: rows.start,
            index: &self.index[rows.clone()],
            columns: &self.columns,
            values: &self.values[rows.start * width..rows.end * width],
        }
    }

    /// View over every row.
    pub fn full_window(&self) -> ReturnWindow<'_> {
        self.window(0..self.len())
    }

    /// Iterate over `(timestamp, row values)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, &[f64])> + '_ {
        self.index.iter().copied().zip(self.values.chunks(self.columns.len().max(1)))
    }
}

/// Immutable view over a contiguous run of rows of a [`ReturnMatrix`].
///
/// This is what strategies receive as their training history. It borrows the
/// engine's matrix, so a strategy cannot alter the data later windows see.
#[derive(Debug, Clone, Copy)]
pub struct ReturnWindow<'a> {
    offset: usize,
    index: &'a [DateTime<Utc>],
    columns: &'a [String],
    values: &'a [f64],
}

impl<'a> ReturnWindow<'a> {
    /// Number of rows in the window.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn n_assets(&self) -> usize {
        self.columns.len()
    }

    /// Position of the first row within the backing matrix.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn index(&self) -> &'a [DateTime<Utc>] {
        self.index
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    /// First timestamp of the window.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.index.first().copied()
    }

    /// Last timestamp of the window.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.index.last().copied()
    }

    pub fn row(&self, i: usize) -> &'a [f64] {
        let width = self.columns.len();
        &self.values[i * width..(i + 1) * width]
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.columns.len() + col]
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of the column at `col`.
    pub fn column_values(&self, col: usize) -> Vec<f64> {
        (0..self.len()).map(|row| self.value(row, col)).collect()
    }

    /// Sum of a column.
    pub fn sum(&self, col: usize) -> f64 {
        (0..self.len()).map(|row| self.value(row, col)).sum()
    }

    /// Arithmetic mean of a column.
    pub fn mean(&self, col: usize) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.sum(col) / self.len() as f64)
    }

    /// Sample standard deviation (n - 1 denominator) of a column.
    pub fn std_dev(&self, col: usize) -> Option<f64> {
        if self.len() < 2 {
            return None;
        }
        let mean = self.mean(col)?;
        let variance = (0..self.len())
            .map(|row| (self.value(row, col) - mean).powi(2))
            .sum::<f64>()
            / (self.len() - 1) as f64;
        Some(variance.sqrt())
    }

    /// Copy the window into an owned matrix.
    pub fn to_matrix(&self) -> ReturnMatrix {
        ReturnMatrix {
            index: self.index.to_vec(),
            columns: self.columns.to_vec(),
            values: self.values.to_vec(),
        }
    }
}

/// Portfolio weights keyed by asset label.
///
/// Weights are not constrained: they need not sum to one and may be negative.
/// Assets without an entry are treated as weight zero when the vector is
/// aligned onto an asset universe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    weights: BTreeMap<String, f64>,
}

impl WeightVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(asset, weight)` pairs. Later pairs overwrite earlier ones.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        pairs.into_iter().collect()
    }

    /// 1/N over the given assets.
    pub fn equal(assets: &[String]) -> Self {
        if assets.is_empty() {
            return Self::new();
        }
        let weight = 1.0 / assets.len() as f64;
        assets.iter().map(|a| (a.clone(), weight)).collect()
    }

    /// Zero weight for every given asset.
    pub fn zeros(assets: &[String]) -> Self {
        assets.iter().map(|a| (a.clone(), 0.0)).collect()
    }

    pub fn set(&mut self, asset: impl Into<String>, weight: f64) {
        self.weights.insert(asset.into(), weight);
    }

    pub fn get(&self, asset: &str) -> Option<f64> {
        self.weights.get(asset).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Whether every weight is a finite number.
    pub fn is_finite(&self) -> bool {
        self.weights.values().all(|w| w.is_finite())
    }

    /// Align onto an ordered asset universe.
    ///
    /// Returns the dense weights in `assets` order (absent assets filled with
    /// 0.0) and the labels that were present here but not in `assets`.
    pub fn reindex(&self, assets: &[String]) -> (Vec<f64>, Vec<String>) {
        let dense = assets
            .iter()
            .map(|a| self.weights.get(a).copied().unwrap_or(0.0))
            .collect();
        let dropped = self
            .weights
            .keys()
            .filter(|k| !assets.contains(*k))
            .cloned()
            .collect();
        (dense, dropped)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// How the training window moves through time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// Fixed-length window that slides forward.
    #[default]
    Rolling,
    /// Window anchored at the first row that grows over time.
    Expanding,
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowType::Rolling => write!(f, "rolling"),
            WindowType::Expanding => write!(f, "expanding"),
        }
    }
}

impl FromStr for WindowType {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rolling" => Ok(WindowType::Rolling),
            "expanding" => Ok(WindowType::Expanding),
            other => Err(BacktestError::InvalidConfiguration(format!(
                "window_type must be 'rolling' or 'expanding', got '{}'",
                other
            ))),
        }
    }
}

/// Walk-forward window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Rows of history handed to the strategy.
    pub train_steps: usize,
    /// Rows each weight vector is held for before re-estimation.
    pub test_steps: usize,
    /// Rolling or expanding training window.
    pub window_type: WindowType,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            train_steps: 12,
            test_steps: 1,
            window_type: WindowType::Rolling,
        }
    }
}

impl WindowConfig {
    /// Create a validated window configuration.
    pub fn new(train_steps: usize, test_steps: usize, window_type: WindowType) -> Result<Self> {
        let config = Self {
            train_steps,
            test_steps,
            window_type,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that both step counts are at least one.
    pub fn validate(&self) -> Result<()> {
        if self.train_steps == 0 {
            return Err(BacktestError::InvalidConfiguration(
                "train_steps must be at least 1".to_string(),
            ));
        }
        if self.test_steps == 0 {
            return Err(BacktestError::InvalidConfiguration(
                "test_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Row range of the training slice for a cursor position.
    pub fn train_range(&self, step: usize) -> Range<usize> {
        match self.window_type {
            WindowType::Rolling => step - self.train_steps..step,
            WindowType::Expanding => 0..step,
        }
    }
}

/// A strategy call that failed and was replaced by zero weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFailure {
    /// Cursor position (first test row) of the failed iteration.
    pub step: usize,
    /// Timestamp of the first test row.
    pub timestamp: DateTime<Utc>,
    /// Error or panic message.
    pub message: String,
}

/// Output of a walk-forward run.
///
/// One row per out-of-sample period: the realized `Strategy` log return and
/// the weights that were held over that period, one column per asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    index: Vec<DateTime<Utc>>,
    assets: Vec<String>,
    strategy: Vec<f64>,
    weights: Vec<f64>,
    failures: Vec<StrategyFailure>,
}

/// One row of a [`ResultTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRow<'a> {
    pub timestamp: DateTime<Utc>,
    pub strategy: f64,
    pub weights: &'a [f64],
}

impl ResultTable {
    /// Name of the realized return column.
    pub const STRATEGY_COLUMN: &'static str = "Strategy";

    pub(crate) fn empty(assets: Vec<String>) -> Self {
        Self {
            index: Vec::new(),
            assets,
            strategy: Vec::new(),
            weights: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Append one held period: the test rows' timestamps and realized returns,
    /// and the dense weight row repeated for each of them.
    pub(crate) fn push_period(
        &mut self,
        timestamps: &[DateTime<Utc>],
        returns: &[f64],
        weights: &[f64],
    ) {
        debug_assert_eq!(timestamps.len(), returns.len());
        debug_assert_eq!(weights.len(), self.assets.len());

        self.index.extend_from_slice(timestamps);
        self.strategy.extend_from_slice(returns);
        for _ in 0..timestamps.len() {
            self.weights.extend_from_slice(weights);
        }
    }

    pub(crate) fn push_failure(&mut self, failure: StrategyFailure) {
        self.failures.push(failure);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no backtest period could be evaluated.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// `Strategy` followed by every asset label.
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once(Self::STRATEGY_COLUMN.to_string())
            .chain(self.assets.iter().cloned())
            .collect()
    }

    /// The realized log-return series.
    pub fn strategy_returns(&self) -> &[f64] {
        &self.strategy
    }

    /// Dense weight row (in asset order) held during row `i`.
    pub fn weights(&self, i: usize) -> &[f64] {
        let width = self.assets.len();
        &self.weights[i * width..(i + 1) * width]
    }

    /// Weight of one asset in row `i`.
    pub fn weight(&self, i: usize, asset: &str) -> Option<f64> {
        let col = self.assets.iter().position(|a| a == asset)?;
        Some(self.weights(i)[col])
    }

    /// Weight history of one asset.
    pub fn weight_column(&self, asset: &str) -> Option<Vec<f64>> {
        let col = self.assets.iter().position(|a| a == asset)?;
        Some((0..self.len()).map(|i| self.weights(i)[col]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = ResultRow<'_>> + '_ {
        (0..self.len()).map(move |i| ResultRow {
            timestamp: self.index[i],
            strategy: self.strategy[i],
            weights: self.weights(i),
        })
    }

    /// Strategy calls that failed during the run.
    pub fn failures(&self) -> &[StrategyFailure] {
        &self.failures
    }
}
