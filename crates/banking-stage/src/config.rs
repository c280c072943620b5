//! Top-level configuration for the banking stage pipeline.

use std::time::Duration;

use fee_market::FeeMarketConfig;
use serde::{Deserialize, Serialize};

use crate::mev_pass::MevPassConfig;
use crate::resource_monitor::ResourceMonitorConfig;

/// Adaptive batching knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    pub target_batch_wall_clock: Duration,
    pub min_batch_size: usize,
    pub max_batch_size: usize,
    pub adaptive_enabled: bool,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            target_batch_wall_clock: Duration::from_millis(50),
            min_batch_size: 8,
            max_batch_size: 1024,
            adaptive_enabled: true,
        }
    }
}

/// Per-stage bounded queue capacities, shared by every inter-stage channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub ingress_capacity: usize,
    pub sigverify_capacity: usize,
    pub fee_classify_capacity: usize,
    pub mev_pass_capacity: usize,
    pub conflict_capacity: usize,
    pub execution_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            ingress_capacity: 10_000,
            sigverify_capacity: 10_000,
            fee_classify_capacity: 10_000,
            mev_pass_capacity: 10_000,
            conflict_capacity: 10_000,
            execution_capacity: 10_000,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankingStageConfig {
    /// Number of worker threads fanned out over for signature verification
    /// and execution.
    pub parallel_stages: usize,
    /// Per-transaction compute budget handed to the BPF runtime.
    pub compute_budget: u64,
    /// Fee, in the smallest denomination, below which a transaction is
    /// rejected outright rather than classified.
    pub min_fee: u64,
    pub dedup_capacity: usize,
    pub queues: QueueConfig,
    pub batching: BatchingConfig,
    pub mev_pass: MevPassConfig,
    pub fee_market: FeeMarketConfig,
    pub resource_monitor: ResourceMonitorConfig,
}

impl Default for BankingStageConfig {
    fn default() -> Self {
        Self {
            parallel_stages: 4,
            compute_budget: 1_400_000,
            min_fee: 0,
            dedup_capacity: 100_000,
            queues: QueueConfig::default(),
            batching: BatchingConfig::default(),
            mev_pass: MevPassConfig::default(),
            fee_market: FeeMarketConfig::default(),
            resource_monitor: ResourceMonitorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parallel_stages_matches_the_documented_default() {
        assert_eq!(BankingStageConfig::default().parallel_stages, 4);
    }
}
