//! Strategy Lab - walk-forward backtesting of portfolio weighting strategies.
//!
//! # Overview
//!
//! Strategy Lab re-estimates portfolio weights on a moving window of history
//! and evaluates them on the rows that follow, producing a time-indexed series
//! of realized out-of-sample returns together with the weights that earned
//! them.
//!
//! - **Walk-forward engine**: rolling or expanding training windows
//! - **Pluggable strategies**: the [`WeightStrategy`] trait, closures via
//!   [`strategy::from_fn`], and a named [`StrategyRegistry`]
//! - **Fault tolerant**: a failing or panicking strategy is held at zero
//!   weight for its period and the run continues
//! - **Data preparation**: wide CSV loading, gap filling, month-end
//!   resampling and log-return conversion
//! - **Analytics**: Sharpe, Sortino, Calmar, drawdown and higher moments
//! - **Configuration files**: TOML-based configuration for reproducible runs
//!
//! # Quick Start
//!
//! ```no_run
//! use strategy_lab::{
//!     analytics::{MetricsConfig, PerformanceMetrics},
//!     data::{load_csv, price_to_log_returns},
//!     strategies::InverseVolatility,
//!     WalkForwardEngine, WindowType,
//! };
//!
//! let prices = load_csv("data/prices.csv", &Default::default()).unwrap();
//! let returns = price_to_log_returns(&prices).unwrap();
//!
//! let engine = WalkForwardEngine::new(returns);
//! let result = engine
//!     .run(&InverseVolatility, 12, 1, WindowType::Rolling)
//!     .unwrap();
//!
//! let metrics =
//!     PerformanceMetrics::calculate(result.strategy_returns(), &MetricsConfig::default()).unwrap();
//! println!("Sharpe: {:.2}", metrics.sharpe_ratio);
//! ```
//!
//! # Custom Strategies
//!
//! ```
//! use strategy_lab::{Result, ReturnWindow, WeightStrategy, WeightVector};
//!
//! /// Everything in the asset with the best training-window return.
//! struct Winner;
//!
//! impl WeightStrategy for Winner {
//!     fn name(&self) -> &str {
//!         "winner"
//!     }
//!
//!     fn weights(&self, history: &ReturnWindow<'_>) -> Result<WeightVector> {
//!         let best = (0..history.n_assets())
//!             .max_by(|&a, &b| history.sum(a).total_cmp(&history.sum(b)));
//!         Ok(best
//!             .map(|col| WeightVector::from_pairs([(history.columns()[col].clone(), 1.0)]))
//!             .unwrap_or_default())
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`]: Return matrix, weight vectors, window configuration, results
//! - [`engine`]: Walk-forward engine
//! - [`strategy`]: Strategy trait, closure adapter and registry
//! - [`strategies`]: Built-in weighting strategies
//! - [`frequency`]: Sampling frequency inference
//! - [`data`]: CSV loading, validation and preparation
//! - [`analytics`]: Performance metrics
//! - [`export`]: CSV/JSON export and terminal reports
//! - [`config`]: TOML configuration file support

pub mod analytics;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod export;
pub mod frequency;
pub mod strategies;
pub mod strategy;
pub mod types;

// Re-exports for convenience
pub use analytics::{MetricsConfig, PerformanceMetrics};
pub use engine::WalkForwardEngine;
pub use error::{BacktestError, Result};
pub use frequency::Frequency;
pub use strategy::{StrategyParams, StrategyRegistry, WeightStrategy};
pub use types::{
    ResultRow, ResultTable, ReturnMatrix, ReturnWindow, StrategyFailure, WeightVector,
    WindowConfig, WindowType,
};
