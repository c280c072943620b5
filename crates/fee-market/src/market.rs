//! Adaptive fee market (C5).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::tier::{classify_empty_history, classify_with_percentiles, FeeTier};
use crate::window::{FeeStats, FeeWindow, DEFAULT_MAX_HISTORY};

const INITIAL_BASE_FEE: u64 = 5000;
const MIN_BASE_FEE: u64 = 1000;
const ADJUSTMENT_FACTOR: f64 = 0.125;
const MULTIPLIER_MIN: f64 = 0.875;
const MULTIPLIER_MAX: f64 = 1.125;

/// Fee market configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeMarketConfig {
    pub target_utilization: f64,
    pub adaptive_enabled: bool,
    pub max_history: usize,
}

impl Default for FeeMarketConfig {
    fn default() -> Self {
        Self {
            target_utilization: 0.5,
            adaptive_enabled: true,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

/// The adaptive base-fee market and its fee-sample window.
pub struct FeeMarket {
    base_fee: AtomicU64,
    target_utilization: f64,
    adaptive_enabled: AtomicBool,
    window: FeeWindow,
}

impl FeeMarket {
    pub fn new(config: FeeMarketConfig) -> Self {
        Self {
            base_fee: AtomicU64::new(INITIAL_BASE_FEE),
            target_utilization: config.target_utilization.clamp(0.0, 1.0),
            adaptive_enabled: AtomicBool::new(config.adaptive_enabled),
            window: FeeWindow::new(config.max_history),
        }
    }

    pub fn base_fee(&self) -> u64 {
        self.base_fee.load(Ordering::Acquire)
    }

    pub fn set_adaptive_enabled(&self, enabled: bool) {
        self.adaptive_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Record an observed fee into the rolling window, noting whether the
    /// transaction that paid it was included.
    pub fn record(&self, fee: u64, included: bool) {
        self.window.record(fee, included);
    }

    pub fn stats(&self) -> Option<FeeStats> {
        self.window.stats()
    }

    /// Classify `fee` against the window's p25/p90/p99 boundaries, or
    /// base-fee multiples when the window is empty.
    pub fn classify(&self, fee: u64) -> FeeTier {
        let base = self.base_fee();
        match self.window.percentile(0.90) {
            None => classify_empty_history(fee, base),
            Some(p90) => {
                let p25 = self.window.percentile(0.25).unwrap_or(base);
                let p99 = self.window.percentile(0.99).unwrap_or(p90);
                classify_with_percentiles(fee, p25, p90, p99)
            }
        }
    }

    /// Estimate a fee that lands in `tier`, using window percentiles when
    /// available, else base-fee multiples.
    pub fn estimate(&self, tier: FeeTier) -> u64 {
        let base = self.base_fee();
        match self.window.stats() {
            None => match tier {
                FeeTier::Low => base,
                FeeTier::Normal => base,
                FeeTier::High => base.saturating_mul(3),
                FeeTier::Urgent => base.saturating_mul(5),
            },
            Some(_) => match tier {
                FeeTier::Urgent => self.window.percentile(0.99).unwrap_or(base),
                FeeTier::High => self.window.percentile(0.90).unwrap_or(base),
                FeeTier::Normal => self.window.percentile(0.50).unwrap_or(base),
                FeeTier::Low => self.window.percentile(0.25).unwrap_or(base),
            },
        }
    }

    /// Adjust the base fee toward `target_utilization` given observed
    /// utilization `u`. No-op when adaptive adjustment is disabled.
    pub fn update_base_fee(&self, u: f64) -> u64 {
        if !self.adaptive_enabled.load(Ordering::Relaxed) {
            return self.base_fee();
        }
        let u = u.clamp(0.0, 1.0);
        let delta = u - self.target_utilization;
        let multiplier = (1.0 + delta * ADJUSTMENT_FACTOR).clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);

        let current = self.base_fee() as f64;
        let new_base = (current * multiplier).floor().max(MIN_BASE_FEE as f64) as u64;
        self.base_fee.store(new_base, Ordering::Release);
        tracing::debug!(utilization = u, multiplier, new_base, "base fee adjusted");
        new_base
    }

    /// Fraction of recent samples whose transaction was included.
    pub fn inclusion_rate(&self) -> f64 {
        self.window.inclusion_rate()
    }
}

impl Default for FeeMarket {
    fn default() -> Self {
        Self::new(FeeMarketConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_fee_starts_at_spec_default() {
        let market = FeeMarket::default();
        assert_eq!(market.base_fee(), 5000);
    }

    #[test]
    fn update_base_fee_raises_above_target_utilization() {
        let market = FeeMarket::default();
        let new_base = market.update_base_fee(1.0);
        assert!(new_base > 5000);
    }

    #[test]
    fn update_base_fee_lowers_below_target_utilization() {
        let market = FeeMarket::default();
        let new_base = market.update_base_fee(0.0);
        assert!(new_base < 5000);
    }

    #[test]
    fn update_base_fee_never_drops_below_floor() {
        let config = FeeMarketConfig {
            target_utilization: 0.5,
            adaptive_enabled: true,
            max_history: DEFAULT_MAX_HISTORY,
        };
        let market = FeeMarket::new(config);
        for _ in 0..200 {
            market.update_base_fee(0.0);
        }
        assert!(market.base_fee() >= 1000);
    }

    #[test]
    fn update_base_fee_is_noop_when_disabled() {
        let market = FeeMarket::new(FeeMarketConfig {
            adaptive_enabled: false,
            ..FeeMarketConfig::default()
        });
        assert_eq!(market.update_base_fee(1.0), 5000);
    }

    #[test]
    fn classify_falls_back_to_base_multiples_when_empty() {
        let market = FeeMarket::default();
        assert_eq!(market.classify(5000), FeeTier::Normal);
        assert_eq!(market.classify(25_000), FeeTier::Urgent);
    }

    #[test]
    fn classify_uses_percentiles_once_window_populated() {
        let market = FeeMarket::default();
        for fee in 1..=100u64 {
            market.record(fee * 100, true);
        }
        assert_eq!(market.classify(1), FeeTier::Low);
        assert_eq!(market.classify(9_900), FeeTier::Urgent);
    }

    #[test]
    fn stats_and_inclusion_rate_over_a_fully_included_window() {
        let market = FeeMarket::default();
        for fee in (1_000..=100_000).step_by(1_000) {
            market.record(fee, true);
        }
        let stats = market.stats().unwrap();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min, 1_000);
        assert!(stats.median >= 49_000 && stats.median <= 51_000);
        assert!(stats.p90 >= 89_000);
        assert!(stats.p99 >= 99_000);
        assert_eq!(stats.max, 100_000);
        assert_eq!(market.inclusion_rate(), 1.0);
    }
}
