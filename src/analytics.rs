//! Performance analytics on realized log returns.
//!
//! Every function takes a series of per-period log returns, such as the
//! `Strategy` column of a [`ResultTable`](crate::ResultTable). Wealth is
//! recovered as `exp(cumsum(r))`.

use crate::error::{BacktestError, Result};
use serde::{Deserialize, Serialize};

/// Settings for annualizing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Annual risk-free rate (as decimal, e.g., 0.02 for 2%).
    pub risk_free_rate: f64,
    /// Number of return periods per year (12 for monthly data).
    pub periods_per_year: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            periods_per_year: 12,
        }
    }
}

/// Wealth path with its running peak and drawdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSeries {
    pub wealth: Vec<f64>,
    pub peaks: Vec<f64>,
    /// `(wealth - peak) / peak`, zero or negative.
    pub drawdown: Vec<f64>,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation, `None` below two observations.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    // Flat series: avoid rounding noise from the mean
    if values.iter().all(|v| *v == values[0]) {
        return Some(0.0);
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Cumulative wealth `exp(cumsum(r))`, starting from 1.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(acc.exp())
        })
        .collect()
}

/// Wealth, running peaks and drawdown.
pub fn drawdown(returns: &[f64]) -> DrawdownSeries {
    let wealth = cumulative_returns(returns);
    let peaks: Vec<f64> = wealth
        .iter()
        .scan(f64::NEG_INFINITY, |peak, &w| {
            *peak = peak.max(w);
            Some(*peak)
        })
        .collect();
    let drawdown = wealth
        .iter()
        .zip(&peaks)
        .map(|(w, p)| (w - p) / p)
        .collect();

    DrawdownSeries {
        wealth,
        peaks,
        drawdown,
    }
}

/// Deepest drawdown (a value `<= 0`), 0 for an empty series.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    drawdown(returns)
        .drawdown
        .into_iter()
        .fold(0.0, f64::min)
}

/// Annualized Sharpe ratio.
///
/// Uses excess returns `r - rf / periods_per_year`. Returns 0 when the
/// standard deviation is zero or undefined.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    let ppy = periods_per_year as f64;
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate / ppy).collect();

    match sample_std(&excess) {
        Some(std) if std > 0.0 => ppy.sqrt() * mean(&excess) / std,
        _ => 0.0,
    }
}

/// Annualized Sortino ratio, penalising only downside deviation.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    let ppy = periods_per_year as f64;
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate / ppy).collect();
    let downside: Vec<f64> = excess.iter().copied().filter(|r| *r < 0.0).collect();

    match sample_std(&downside) {
        Some(std) if std > 0.0 => ppy.sqrt() * mean(&excess) / std,
        _ => 0.0,
    }
}

/// Annualized return `exp(mean(r) * periods_per_year) - 1`.
pub fn annualized_return(returns: &[f64], periods_per_year: u32) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    (mean(returns) * periods_per_year as f64).exp() - 1.0
}

/// Annualized volatility of log returns.
pub fn annualized_volatility(returns: &[f64], periods_per_year: u32) -> f64 {
    sample_std(returns).unwrap_or(0.0) * (periods_per_year as f64).sqrt()
}

/// Annualized return over the magnitude of the deepest drawdown.
pub fn calmar_ratio(returns: &[f64], periods_per_year: u32) -> f64 {
    let max_dd = max_drawdown(returns);
    if max_dd == 0.0 {
        return 0.0;
    }
    annualized_return(returns, periods_per_year) / max_dd.abs()
}

/// Adjusted Fisher-Pearson sample skewness.
///
/// 0 for fewer than three observations or a flat series.
pub fn skewness(returns: &[f64]) -> f64 {
    let n = returns.len() as f64;
    if returns.len() < 3 {
        return 0.0;
    }
    let m = mean(returns);
    let m2 = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / n;
    let m3 = returns.iter().map(|r| (r - m).powi(3)).sum::<f64>() / n;
    if m2 == 0.0 {
        return 0.0;
    }
    (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5)
}

/// Sample excess kurtosis (normal distribution = 0).
///
/// 0 for fewer than four observations or a flat series.
pub fn excess_kurtosis(returns: &[f64]) -> f64 {
    let n = returns.len() as f64;
    if returns.len() < 4 {
        return 0.0;
    }
    let m = mean(returns);
    let s2 = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>();
    let s4 = returns.iter().map(|r| (r - m).powi(4)).sum::<f64>();
    if s2 == 0.0 {
        return 0.0;
    }
    let numerator = n * (n + 1.0) * (n - 1.0) * s4;
    let denominator = (n - 2.0) * (n - 3.0) * s2 * s2;
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    numerator / denominator - adj
}

/// Simple return over the whole series, `exp(sum(r)) - 1`.
pub fn total_return(returns: &[f64]) -> f64 {
    returns.iter().sum::<f64>().exp() - 1.0
}

/// Summary statistics of a realized return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Number of periods in the series.
    pub periods: usize,
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Deepest drawdown, as a negative fraction.
    pub max_drawdown: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
}

impl PerformanceMetrics {
    /// Calculate every metric for a log-return series.
    pub fn calculate(returns: &[f64], config: &MetricsConfig) -> Result<Self> {
        if returns.is_empty() {
            return Err(BacktestError::NoData);
        }
        if config.periods_per_year == 0 {
            return Err(BacktestError::InvalidConfiguration(
                "periods_per_year must be at least 1".to_string(),
            ));
        }

        let ppy = config.periods_per_year;
        let rf = config.risk_free_rate;

        Ok(Self {
            periods: returns.len(),
            total_return: total_return(returns),
            annualized_return: annualized_return(returns, ppy),
            annualized_volatility: annualized_volatility(returns, ppy),
            sharpe_ratio: sharpe_ratio(returns, rf, ppy),
            sortino_ratio: sortino_ratio(returns, rf, ppy),
            calmar_ratio: calmar_ratio(returns, ppy),
            max_drawdown: max_drawdown(returns),
            skewness: skewness(returns),
            excess_kurtosis: excess_kurtosis(returns),
        })
    }
}
