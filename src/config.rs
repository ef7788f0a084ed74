//! Configuration file support for walk-forward runs.
//!
//! Allows loading run configurations from TOML files for reproducibility.

use crate::analytics::MetricsConfig;
use crate::data::{CleanMethod, DataConfig, DataKind, PrepareOptions};
use crate::error::{BacktestError, Result};
use crate::strategy::StrategyParams;
use crate::types::{WindowConfig, WindowType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete run configuration loaded from a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Input data settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Walk-forward window settings.
    #[serde(default)]
    pub window: WindowSettings,
    /// Strategy settings.
    #[serde(default)]
    pub strategy: StrategySettings,
    /// Metric settings.
    #[serde(default)]
    pub metrics: MetricsSettings,
    /// Output settings.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Data settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    /// Path to the CSV file.
    pub path: Option<String>,
    /// Name of the date column.
    pub date_column: Option<String>,
    /// Date format in CSV.
    pub date_format: Option<String>,
    /// Whether the file holds prices or log returns.
    #[serde(default)]
    pub kind: DataKind,
    /// Missing-value method: "ffill", "bfill" or "fill_zero".
    pub clean: Option<String>,
    /// Resample to month-end before running.
    #[serde(default)]
    pub resample_monthly: bool,
}

/// Window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "default_train_steps")]
    pub train_steps: usize,
    #[serde(default = "default_test_steps")]
    pub test_steps: usize,
    #[serde(default)]
    pub window_type: WindowType,
}

fn default_train_steps() -> usize { 12 }
fn default_test_steps() -> usize { 1 }

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            train_steps: 12,
            test_steps: 1,
            window_type: WindowType::Rolling,
        }
    }
}

/// Strategy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    /// Registered strategy name.
    #[serde(default = "default_strategy")]
    pub name: String,
    /// Strategy parameters.
    #[serde(default)]
    pub params: StrategyParams,
}

fn default_strategy() -> String { "equal_weight".to_string() }

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            name: "equal_weight".to_string(),
            params: StrategyParams::default(),
        }
    }
}

/// Metric settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Annual risk-free rate (as decimal).
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
}

fn default_periods_per_year() -> u32 { 12 }

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            periods_per_year: 12,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Write the result table to this CSV path.
    pub export_csv: Option<String>,
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BacktestError::InvalidConfiguration(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validated window configuration for the engine.
    pub fn window_config(&self) -> Result<WindowConfig> {
        WindowConfig::new(
            self.window.train_steps,
            self.window.test_steps,
            self.window.window_type,
        )
    }

    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            risk_free_rate: self.metrics.risk_free_rate,
            periods_per_year: self.metrics.periods_per_year,
        }
    }

    pub fn data_config(&self) -> DataConfig {
        DataConfig {
            date_column: self.data.date_column.clone(),
            date_format: self.data.date_format.clone(),
            delimiter: None,
        }
    }

    /// Data preparation steps, with the cleaning method parsed.
    pub fn prepare_options(&self) -> Result<PrepareOptions> {
        let clean = self
            .data
            .clean
            .as_deref()
            .map(str::parse::<CleanMethod>)
            .transpose()?;

        Ok(PrepareOptions {
            kind: self.data.kind,
            clean,
            resample_monthly: self.data.resample_monthly,
        })
    }

    /// Path of the data file; required for a run.
    pub fn data_path(&self) -> Result<&str> {
        self.data.path.as_deref().ok_or_else(|| {
            BacktestError::InvalidConfiguration("data.path is not set".to_string())
        })
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# Strategy Lab configuration file
# Walk-forward backtest of a weighting strategy over monthly data

[data]
path = "data/prices.csv"
# date_column = "Date"
# date_format = "%Y-%m-%d"
kind = "prices"          # "prices" or "returns" (log returns)
clean = "ffill"          # "ffill", "bfill" or "fill_zero"
resample_monthly = true

[window]
train_steps = 12         # rows of history per strategy call
test_steps = 1           # rows each weight vector is held
window_type = "rolling"  # "rolling" or "expanding"

[strategy]
name = "inverse_volatility"

# Alternative strategies:
# [strategy]
# name = "momentum"
# [strategy.params]
# top_n = 3

[metrics]
risk_free_rate = 0.0
periods_per_year = 12

[output]
# export_csv = "results.csv"
"#
        .to_string()
    }
}
