//! Cross-sectional momentum strategy.

use crate::error::{BacktestError, Result};
use crate::strategy::WeightStrategy;
use crate::types::{ReturnWindow, WeightVector};

/// Momentum rotation.
///
/// # Parameters
/// - `top_n`: Number of assets to hold (default: 3)
///
/// Ranks assets by cumulative log return over the training window and
/// equal-weights the `top_n` best performers. Assets with non-positive
/// momentum are never held, so a falling market yields an empty vector
/// (fully in cash).
#[derive(Debug, Clone, Copy)]
pub struct Momentum {
    top_n: usize,
}

impl Momentum {
    pub const NAME: &'static str = "momentum";
    pub const DEFAULT_TOP_N: usize = 3;

    /// Create a new momentum strategy holding `top_n` assets.
    pub fn new(top_n: usize) -> Result<Self> {
        if top_n == 0 {
            return Err(BacktestError::InvalidConfiguration(
                "momentum top_n must be at least 1".to_string(),
            ));
        }
        Ok(Self { top_n })
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }
}

impl Default for Momentum {
    fn default() -> Self {
        Self {
            top_n: Self::DEFAULT_TOP_N,
        }
    }
}

impl WeightStrategy for Momentum {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn weights(&self, history: &ReturnWindow<'_>) -> Result<WeightVector> {
        let mut scores: Vec<(usize, f64)> = (0..history.n_assets())
            .map(|col| (col, history.sum(col)))
            .filter(|(_, score)| score.is_finite() && *score > 0.0)
            .collect();

        // Stable sort keeps column order among ties
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(self.top_n);

        if scores.is_empty() {
            return Ok(WeightVector::new());
        }

        let weight = 1.0 / scores.len() as f64;
        Ok(scores
            .iter()
            .map(|(col, _)| (history.columns()[*col].clone(), weight))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReturnMatrix;
    use chrono::{TimeZone, Utc};

    fn matrix(rows: Vec<Vec<f64>>) -> ReturnMatrix {
        let index = (0..rows.len())
            .map(|i| Utc.with_ymd_and_hms(2024, 1, 1 + i as u32, 0, 0, 0).unwrap())
            .collect();
        let columns = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        ReturnMatrix::from_rows(index, columns, rows).unwrap()
    }

    #[test]
    fn test_momentum_picks_top_n() {
        let m = matrix(vec![
            vec![0.05, 0.01, -0.02, 0.03],
            vec![0.05, 0.01, -0.02, 0.01],
        ]);
        let weights = Momentum::new(2).unwrap().weights(&m.full_window()).unwrap();

        assert_eq!(weights.len(), 2);
        assert_eq!(weights.get("A"), Some(0.5));
        assert_eq!(weights.get("D"), Some(0.5));
        assert_eq!(weights.get("C"), None);
    }

    #[test]
    fn test_momentum_skips_losers() {
        let m = matrix(vec![vec![0.02, -0.01, -0.02, -0.03]]);
        let weights = Momentum::default().weights(&m.full_window()).unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights.get("A"), Some(1.0));

        let falling = matrix(vec![vec![-0.02, -0.01, -0.02, -0.03]]);
        let weights = Momentum::default().weights(&falling.full_window()).unwrap();
        assert!(weights.is_empty());
    }

    #[test]
    fn test_momentum_rejects_zero_top_n() {
        assert!(Momentum::new(0).is_err());
        assert_eq!(Momentum::default().top_n(), 3);
    }
}
