//! Built-in weighting strategies.
//!
//! - [`EqualWeight`]: 1/N across every asset
//! - [`InverseVolatility`]: weights proportional to 1/volatility
//! - [`Momentum`]: equal weight across the top N assets by trailing return

mod equal_weight;
mod inverse_volatility;
mod momentum;

pub use equal_weight::EqualWeight;
pub use inverse_volatility::InverseVolatility;
pub use momentum::Momentum;
