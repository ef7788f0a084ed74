//! Equal-weight strategy.

use crate::error::Result;
use crate::strategy::WeightStrategy;
use crate::types::{ReturnWindow, WeightVector};

/// Holds 1/N of the portfolio in each asset, ignoring the history.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualWeight;

impl EqualWeight {
    pub const NAME: &'static str = "equal_weight";
}

impl WeightStrategy for EqualWeight {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn weights(&self, history: &ReturnWindow<'_>) -> Result<WeightVector> {
        Ok(WeightVector::equal(history.columns()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReturnMatrix;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_equal_weight() {
        let matrix = ReturnMatrix::new(
            vec![Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()],
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            vec![0.1, -0.2, 0.0, 0.05],
        )
        .unwrap();

        let weights = EqualWeight.weights(&matrix.full_window()).unwrap();
        assert_eq!(weights.len(), 4);
        for (_, w) in weights.iter() {
            assert!((w - 0.25).abs() < 1e-12);
        }
    }
}
