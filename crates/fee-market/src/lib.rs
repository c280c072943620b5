//! # Fee Market
//!
//! EIP-1559-style adaptive base fee with percentile-driven fee-tier
//! classification, consumed by the banking stage's fee-classification
//! pipeline stage.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod market;
pub mod tier;
pub mod window;

pub use market::{FeeMarket, FeeMarketConfig};
pub use tier::FeeTier;
pub use window::{FeeSample, FeeStats, FeeWindow};
