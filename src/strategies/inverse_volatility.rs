//! Inverse-volatility strategy.
//!
//! Each asset is weighted by the reciprocal of its sample standard deviation
//! over the training window, normalized so the weights sum to one. Calmer
//! assets receive larger allocations.

use crate::error::Result;
use crate::strategy::WeightStrategy;
use crate::types::{ReturnWindow, WeightVector};
use tracing::debug;

/// Inverse-volatility weighting.
///
/// Assets with zero or undefined volatility get weight 0. If no asset has a
/// positive volatility the strategy falls back to equal weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseVolatility;

impl InverseVolatility {
    pub const NAME: &'static str = "inverse_volatility";
}

impl WeightStrategy for InverseVolatility {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn weights(&self, history: &ReturnWindow<'_>) -> Result<WeightVector> {
        let inverse: Vec<f64> = (0..history.n_assets())
            .map(|col| match history.std_dev(col) {
                Some(vol) if vol.is_finite() && vol > 0.0 => 1.0 / vol,
                _ => 0.0,
            })
            .collect();

        let total: f64 = inverse.iter().sum();
        if total <= 0.0 {
            debug!("No asset has positive volatility, using equal weights");
            return Ok(WeightVector::equal(history.columns()));
        }

        Ok(history
            .columns()
            .iter()
            .zip(&inverse)
            .map(|(asset, inv)| (asset.clone(), inv / total))
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
            .map(|i| Utc.with_ymd_and_hms(2020 + i as i32, 1, 31, 0, 0, 0).unwrap())
            .collect();
        ReturnMatrix::from_rows(index, vec!["LOW".into(), "HIGH".into()], rows).unwrap()
    }

    #[test]
    fn test_inverse_volatility_weights() {
        // HIGH moves twice as much as LOW
        let m = matrix(vec![vec![0.01, 0.02], vec![-0.01, -0.02], vec![0.01, 0.02]]);
        let weights = InverseVolatility.weights(&m.full_window()).unwrap();

        let low = weights.get("LOW").unwrap();
        let high = weights.get("HIGH").unwrap();
        assert!((low + high - 1.0).abs() < 1e-12);
        assert!((low - 2.0 / 3.0).abs() < 1e-12);
        assert!((high - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_volatility_asset_excluded() {
        let m = matrix(vec![vec![0.0, 0.02], vec![0.0, -0.02], vec![0.0, 0.02]]);
        let weights = InverseVolatility.weights(&m.full_window()).unwrap();
        assert_eq!(weights.get("LOW"), Some(0.0));
        assert!((weights.get("HIGH").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_history_falls_back_to_equal() {
        let m = matrix(vec![vec![0.01, 0.02], vec![0.01, 0.02]]);
        let weights = InverseVolatility.weights(&m.full_window()).unwrap();
        assert_eq!(weights.get("LOW"), Some(0.5));
        assert_eq!(weights.get("HIGH"), Some(0.5));

        // A single row has no sample volatility either
        let single = matrix(vec![vec![0.01, 0.02]]);
        let weights = InverseVolatility.weights(&single.full_window()).unwrap();
        assert_eq!(weights.get("LOW"), Some(0.5));
    }
}
