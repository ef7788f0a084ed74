//! Walk-forward backtest engine.
//!
//! The engine slides a training window over the return matrix, asks the
//! strategy for weights on each window, and holds those weights over the
//! following out-of-sample rows. Realized returns and held weights are
//! collected into a [`ResultTable`].

use crate::error::{BacktestError, Result};
use crate::frequency::check_monthly;
use crate::strategy::WeightStrategy;
use crate::types::{
    ResultTable, ReturnMatrix, ReturnWindow, StrategyFailure, WeightVector, WindowConfig, WindowType,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Walk-forward backtest engine over a fixed return matrix.
#[derive(Debug, Clone)]
pub struct WalkForwardEngine {
    returns: ReturnMatrix,
}

impl WalkForwardEngine {
    /// Create an engine that owns `returns` for its lifetime.
    ///
    /// Rows are put in chronological order if they are not already. Missing
    /// values are accepted as-is.
    pub fn new(mut returns: ReturnMatrix) -> Self {
        returns.sort_chronologically();
        Self { returns }
    }

    /// The return matrix the engine runs over.
    pub fn returns(&self) -> &ReturnMatrix {
        &self.returns
    }

    /// Run a walk-forward backtest.
    ///
    /// `train_steps` rows of history feed each strategy call and the
    /// resulting weights are held for the next `test_steps` rows. Step counts
    /// are rows, whatever the sampling frequency.
    pub fn run<S>(
        &self,
        strategy: &S,
        train_steps: usize,
        test_steps: usize,
        window_type: WindowType,
    ) -> Result<ResultTable>
    where
        S: WeightStrategy + ?Sized,
    {
        let config = WindowConfig::new(train_steps, test_steps, window_type)?;
        self.run_with_config(strategy, &config)
    }

    /// Run a walk-forward backtest with a prepared window configuration.
    pub fn run_with_config<S>(&self, strategy: &S, config: &WindowConfig) -> Result<ResultTable>
    where
        S: WeightStrategy + ?Sized,
    {
        config.validate()?;

        let data = &self.returns;
        let n = data.len();
        let assets = data.columns();

        info!(
            "Running walk-forward backtest: {} on {} rows x {} assets (train {}, test {}, {})",
            strategy.name(),
            n,
            assets.len(),
            config.train_steps,
            config.test_steps,
            config.window_type
        );

        check_monthly(data.index());

        let mut result = ResultTable::empty(assets.to_vec());
        let mut step = config.train_steps;
        let mut iterations = 0;

        while let Some(test_end) = step
            .checked_add(config.test_steps)
            .filter(|&end| end <= n)
        {
            let train = data.window(config.train_range(step));

            debug!(
                "Window {}: train rows {}..{}, test rows {}..{}",
                iterations,
                train.offset(),
                train.offset() + train.len(),
                step,
                test_end
            );

            let weights = match call_strategy(strategy, &train) {
                Ok(weights) => weights,
                Err(message) => {
                    warn!("Error in strategy at step {}: {}", step, message);
                    result.push_failure(StrategyFailure {
                        step,
                        timestamp: data.index()[step],
                        message,
                    });
                    WeightVector::zeros(assets)
                }
            };

            let (dense, dropped) = weights.reindex(assets);
            if !dropped.is_empty() {
                debug!("Ignoring weights for unknown assets: {:?}", dropped);
            }

            let realized: Vec<f64> = (step..test_end)
                .map(|row| {
                    data.row(row)
                        .iter()
                        .zip(&dense)
                        .map(|(r, w)| r * w)
                        .sum::<f64>()
                })
                .collect();

            result.push_period(&data.index()[step..test_end], &realized, &dense);

            step += config.test_steps;
            iterations += 1;
        }

        if result.is_empty() {
            info!(
                "No complete walk-forward window fits in {} rows (train {}, test {})",
                n, config.train_steps, config.test_steps
            );
        } else {
            info!(
                "Walk-forward complete: {} iterations, {} rows, {} strategy failures",
                iterations,
                result.len(),
                result.failures().len()
            );
        }

        Ok(result)
    }
}

/// Invoke the strategy, turning errors, panics and non-finite weights into
/// a failure message.
fn call_strategy<S>(strategy: &S, train: &ReturnWindow<'_>) -> std::result::Result<WeightVector, String>
where
    S: WeightStrategy + ?Sized,
{
    let outcome = catch_unwind(AssertUnwindSafe(|| strategy.weights(train)));

    match outcome {
        Ok(Ok(weights)) if weights.is_finite() => Ok(weights),
        Ok(Ok(_)) => Err(BacktestError::StrategyError(
            "strategy returned non-finite weights".to_string(),
        )
        .to_string()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => {
            let msg = panic.downcast_ref::<&str>().map_or_else(
                || {
                    panic
                        .downcast_ref::<String>()
                        .map_or_else(|| "Unknown panic".to_string(), ToString::to_string)
                },
                ToString::to_string,
            );
            Err(format!("Panic in strategy: {msg}"))
        }
    }
}
