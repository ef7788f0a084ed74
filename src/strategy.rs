//! Strategy trait and related utilities.
//!
//! A strategy maps a training window of returns to a set of portfolio
//! weights. Strategies are compiled Rust code: built-ins and user types
//! implement [`WeightStrategy`], closures are adapted with [`from_fn`], and
//! named strategies are looked up through a [`StrategyRegistry`].

use crate::error::{BacktestError, Result};
use crate::strategies::{EqualWeight, InverseVolatility, Momentum};
use crate::types::{ReturnWindow, WeightVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Trait for weight-producing portfolio strategies.
pub trait WeightStrategy {
    /// Returns the name of the strategy.
    fn name(&self) -> &str;

    /// Compute target weights from a training window.
    ///
    /// The window covers every asset column. Weights may cover only a subset
    /// of assets; the rest are held at zero.
    fn weights(&self, history: &ReturnWindow<'_>) -> Result<WeightVector>;
}

impl<S: WeightStrategy + ?Sized> WeightStrategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn weights(&self, history: &ReturnWindow<'_>) -> Result<WeightVector> {
        (**self).weights(history)
    }
}

/// Strategy backed by a closure.
pub struct FnStrategy<F> {
    name: String,
    func: F,
}

impl<F> fmt::Debug for FnStrategy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStrategy").field("name", &self.name).finish()
    }
}

impl<F> WeightStrategy for FnStrategy<F>
where
    F: Fn(&ReturnWindow<'_>) -> Result<WeightVector>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn weights(&self, history: &ReturnWindow<'_>) -> Result<WeightVector> {
        (self.func)(history)
    }
}

/// Wrap a closure as a named strategy.
///
/// ```
/// use strategy_lab::strategy::{from_fn, WeightStrategy};
/// use strategy_lab::WeightVector;
///
/// let all_in_first = from_fn("first", |history| {
///     Ok(WeightVector::from_pairs([(history.columns()[0].clone(), 1.0)]))
/// });
/// assert_eq!(all_in_first.name(), "first");
/// ```
pub fn from_fn<F>(name: impl Into<String>, func: F) -> FnStrategy<F>
where
    F: Fn(&ReturnWindow<'_>) -> Result<WeightVector>,
{
    FnStrategy {
        name: name.into(),
        func,
    }
}

/// Parameters handed to strategy factories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Number of assets to hold (momentum).
    pub top_n: Option<usize>,
}

type StrategyFactory = Box<dyn Fn(&StrategyParams) -> Result<Box<dyn WeightStrategy>>>;

struct RegistryEntry {
    description: String,
    factory: StrategyFactory,
}

/// Table of named strategy factories.
#[derive(Default)]
pub struct StrategyRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl StrategyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            EqualWeight::NAME,
            "1/N across every asset",
            |_: &StrategyParams| Ok(Box::new(EqualWeight) as Box<dyn WeightStrategy>),
        );
        registry.register(
            InverseVolatility::NAME,
            "Weights proportional to 1/volatility over the training window",
            |_: &StrategyParams| Ok(Box::new(InverseVolatility) as Box<dyn WeightStrategy>),
        );
        registry.register(
            Momentum::NAME,
            "Equal weight across the top N assets by cumulative return",
            |params: &StrategyParams| {
                let top_n = params.top_n.unwrap_or(Momentum::DEFAULT_TOP_N);
                Ok(Box::new(Momentum::new(top_n)?) as Box<dyn WeightStrategy>)
            },
        );
        registry
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, description: impl Into<String>, factory: F)
    where
        F: Fn(&StrategyParams) -> Result<Box<dyn WeightStrategy>> + 'static,
    {
        self.entries.insert(
            name.into(),
            RegistryEntry {
                description: description.into(),
                factory: Box::new(factory),
            },
        );
    }

    /// Build the strategy registered under `name`.
    pub fn create(&self, name: &str, params: &StrategyParams) -> Result<Box<dyn WeightStrategy>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| BacktestError::UnknownStrategy(name.to_string()))?;
        (entry.factory)(params)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// `(name, description)` pairs in sorted order.
    pub fn describe(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReturnMatrix;
    use chrono::{TimeZone, Utc};

    fn sample_matrix() -> ReturnMatrix {
        let index = (1..=4)
            .map(|d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap())
            .collect();
        ReturnMatrix::new(
            index,
            vec!["A".to_string(), "B".to_string()],
            vec![0.01, 0.02, 0.03, -0.01, 0.02, 0.00, 0.01, 0.01],
        )
        .unwrap()
    }

    #[test]
    fn test_from_fn() {
        let strategy = from_fn("first", |history: &ReturnWindow<'_>| {
            Ok(WeightVector::from_pairs([(history.columns()[0].clone(), 1.0)]))
        });
        let matrix = sample_matrix();

        let weights = strategy.weights(&matrix.full_window()).unwrap();
        assert_eq!(strategy.name(), "first");
        assert_eq!(weights.get("A"), Some(1.0));
        assert_eq!(weights.get("B"), None);
    }

    #[test]
    fn test_registry_builtins() {
        let registry = StrategyRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["equal_weight", "inverse_volatility", "momentum"]
        );
        assert!(registry.contains("momentum"));
        assert_eq!(registry.describe().len(), 3);

        let strategy = registry
            .create("equal_weight", &StrategyParams::default())
            .unwrap();
        let weights = strategy.weights(&sample_matrix().full_window()).unwrap();
        assert!((weights.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_registry_unknown() {
        let registry = StrategyRegistry::with_builtins();
        let result = registry.create("risk_parity", &StrategyParams::default());
        assert!(matches!(result, Err(BacktestError::UnknownStrategy(_))));
    }

    #[test]
    fn test_registry_custom_and_params() {
        let mut registry = StrategyRegistry::new();
        registry.register("all_b", "Everything in B", |_: &StrategyParams| {
            Ok(Box::new(from_fn("all_b", |_: &ReturnWindow<'_>| {
                Ok(WeightVector::from_pairs([("B", 1.0)]))
            })) as Box<dyn WeightStrategy>)
        });
        let strategy = registry.create("all_b", &StrategyParams::default()).unwrap();
        assert_eq!(strategy.name(), "all_b");

        let builtins = StrategyRegistry::with_builtins();
        let invalid = StrategyParams { top_n: Some(0) };
        assert!(matches!(
            builtins.create("momentum", &invalid),
            Err(BacktestError::InvalidConfiguration(_))
        ));
    }
}
