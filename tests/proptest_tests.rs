//! Property-based tests using proptest for invariant testing.
//!
//! These tests verify that:
//! 1. Walk-forward output length and alignment follow the window arithmetic
//! 2. Rolling windows always have the configured length
//! 3. Weights are constant within a holding period and zero for unlisted assets
//! 4. Metric identities hold for arbitrary return series

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::cell::RefCell;

use strategy_lab::analytics::{cumulative_returns, drawdown, max_drawdown, total_return};
use strategy_lab::data::{clean, CleanMethod};
use strategy_lab::strategies::{EqualWeight, InverseVolatility};
use strategy_lab::strategy::from_fn;
use strategy_lab::{ReturnMatrix, ReturnWindow, WalkForwardEngine, WeightVector, WindowType};

// ============================================================================
// Generators
// ============================================================================

fn window_type_strategy() -> impl Strategy<Value = WindowType> {
    prop_oneof![Just(WindowType::Rolling), Just(WindowType::Expanding)]
}

/// Matrix of small returns with `rows` rows and `assets` columns.
fn matrix_strategy() -> impl Strategy<Value = ReturnMatrix> {
    (1..60usize, 1..5usize).prop_flat_map(|(rows, assets)| {
        prop::collection::vec(-0.2..0.2f64, rows * assets).prop_map(move |values| {
            let start = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
            let index = (0..rows).map(|i| start + Duration::days(30 * i as i64)).collect();
            let columns = (0..assets).map(|j| format!("ASSET{}", j)).collect();
            ReturnMatrix::new(index, columns, values).unwrap()
        })
    })
}

fn returns_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.3..0.3f64, 1..120)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // ========================================================================
    // Engine Invariants
    // ========================================================================

    #[test]
    fn result_rows_match_window_arithmetic(
        matrix in matrix_strategy(),
        train in 1..30usize,
        test in 1..12usize,
        window in window_type_strategy(),
    ) {
        let n = matrix.len();
        let engine = WalkForwardEngine::new(matrix);
        let result = engine.run(&EqualWeight, train, test, window).unwrap();

        let iterations = if train + test <= n { (n - train - test) / test + 1 } else { 0 };
        prop_assert_eq!(result.len(), iterations * test);
        if !result.is_empty() {
            prop_assert_eq!(result.index(), &engine.returns().index()[train..train + result.len()]);
        }
        prop_assert!(result.index().windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(result.column_names().len(), engine.returns().n_assets() + 1);
    }

    #[test]
    fn training_windows_have_expected_length(
        matrix in matrix_strategy(),
        train in 1..20usize,
        test in 1..6usize,
        window in window_type_strategy(),
    ) {
        let seen = RefCell::new(Vec::new());
        let strategy = from_fn("recorder", |h: &ReturnWindow<'_>| {
            seen.borrow_mut().push((h.offset(), h.len()));
            Ok(WeightVector::equal(h.columns()))
        });

        let engine = WalkForwardEngine::new(matrix);
        engine.run(&strategy, train, test, window).unwrap();

        for (i, &(offset, len)) in seen.borrow().iter().enumerate() {
            match window {
                WindowType::Rolling => {
                    prop_assert_eq!(len, train);
                    prop_assert_eq!(offset, i * test);
                }
                WindowType::Expanding => {
                    prop_assert_eq!(offset, 0);
                    prop_assert_eq!(len, train + i * test);
                }
            }
        }
    }

    #[test]
    fn weights_fixed_within_period_and_zero_filled(
        matrix in matrix_strategy(),
        train in 1..10usize,
        test in 1..6usize,
    ) {
        // Always hold only the first asset, plus an unknown label
        let strategy = from_fn("first", |h: &ReturnWindow<'_>| {
            let mut w = WeightVector::new();
            w.set(h.columns()[0].clone(), 0.5 + h.len() as f64);
            w.set("NOT_AN_ASSET", 1.0);
            Ok(w)
        });

        let engine = WalkForwardEngine::new(matrix);
        let result = engine.run(&strategy, train, test, WindowType::Expanding).unwrap();

        for chunk_start in (0..result.len()).step_by(test) {
            let first = result.weights(chunk_start).to_vec();
            prop_assert!(first[1..].iter().all(|w| *w == 0.0));
            for i in chunk_start..(chunk_start + test).min(result.len()) {
                prop_assert_eq!(result.weights(i), first.as_slice());
                let row = chunk_start + train + (i - chunk_start);
                let expected = engine.returns().value(row, 0) * first[0];
                prop_assert!((result.strategy_returns()[i] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn inverse_volatility_weights_are_normalized(matrix in matrix_strategy(), train in 2..20usize) {
        let engine = WalkForwardEngine::new(matrix);
        let result = engine.run(&InverseVolatility, train, 1, WindowType::Rolling).unwrap();

        for i in 0..result.len() {
            let weights = result.weights(i);
            prop_assert!(weights.iter().all(|w| *w >= 0.0));
            prop_assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        prop_assert!(result.failures().is_empty());
    }

    // ========================================================================
    // Metric Identities
    // ========================================================================

    #[test]
    fn drawdown_bounded_and_consistent(returns in returns_strategy()) {
        let dd = drawdown(&returns);
        prop_assert!(dd.drawdown.iter().all(|d| *d <= 0.0 && *d >= -1.0));
        prop_assert!(dd.peaks.iter().zip(&dd.wealth).all(|(p, w)| p >= w));
        prop_assert!(max_drawdown(&returns) <= 0.0);
    }

    #[test]
    fn cumulative_matches_total_return(returns in returns_strategy()) {
        let wealth = cumulative_returns(&returns);
        let last = *wealth.last().unwrap();
        prop_assert!((last - 1.0 - total_return(&returns)).abs() < 1e-9 * last.max(1.0));
    }

    #[test]
    fn constant_return_compounds(r in -0.1..0.1f64, k in 1..60usize) {
        let wealth = cumulative_returns(&vec![r; k]);
        let expected = r.exp().powi(k as i32);
        prop_assert!((wealth[k - 1] - expected).abs() < 1e-9 * expected.max(1.0));
    }

    #[test]
    fn forward_fill_leaves_only_leading_gaps(
        values in prop::collection::vec(prop::option::of(-1.0..1.0f64), 1..40)
    ) {
        let n = values.len();
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let index = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let raw: Vec<f64> = values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        let matrix = ReturnMatrix::new(index, vec!["A".into()], raw).unwrap();

        let filled = clean(&matrix, CleanMethod::ForwardFill);
        let leading = values.iter().take_while(|v| v.is_none()).count();
        prop_assert_eq!(filled.missing_count(), leading);
    }
}
