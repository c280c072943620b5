//! Fee-tier classification.

use serde::{Deserialize, Serialize};

/// Priority tier a transaction's fee falls into relative to recent traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeeTier {
    Low,
    Normal,
    High,
    Urgent,
}

impl std::fmt::Display for FeeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FeeTier::Low => "low",
            FeeTier::Normal => "normal",
            FeeTier::High => "high",
            FeeTier::Urgent => "urgent",
        };
        write!(f, "{s}")
    }
}

/// Classify `fee` when the fee window is empty, using base-fee multiples.
pub fn classify_empty_history(fee: u64, base_fee: u64) -> FeeTier {
    if fee >= base_fee.saturating_mul(5) {
        FeeTier::Urgent
    } else if fee >= base_fee.saturating_mul(3) {
        FeeTier::High
    } else if fee >= base_fee {
        FeeTier::Normal
    } else {
        FeeTier::Low
    }
}

/// Classify `fee` against the window's p25/p90/p99 percentiles.
pub fn classify_with_percentiles(fee: u64, p25: u64, p90: u64, p99: u64) -> FeeTier {
    if fee >= p99 {
        FeeTier::Urgent
    } else if fee >= p90 {
        FeeTier::High
    } else if fee >= p25 {
        FeeTier::Normal
    } else {
        FeeTier::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_uses_base_multiples() {
        assert_eq!(classify_empty_history(4999, 1000), FeeTier::Low);
        assert_eq!(classify_empty_history(1000, 1000), FeeTier::Normal);
        assert_eq!(classify_empty_history(3000, 1000), FeeTier::High);
        assert_eq!(classify_empty_history(5000, 1000), FeeTier::Urgent);
    }

    #[test]
    fn percentile_classification_uses_boundaries() {
        assert_eq!(classify_with_percentiles(10, 20, 50, 90), FeeTier::Low);
        assert_eq!(classify_with_percentiles(20, 20, 50, 90), FeeTier::Normal);
        assert_eq!(classify_with_percentiles(50, 20, 50, 90), FeeTier::High);
        assert_eq!(classify_with_percentiles(90, 20, 50, 90), FeeTier::Urgent);
    }
}
