//! The validator's single typed configuration surface, loaded from TOML on
//! disk with environment-variable overrides.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use banking_stage::BankingStageConfig;
use cluster_membership::NetworkId;
use mev_protection::OrderingPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub network_id: NetworkId,

    pub enable_rpc: bool,
    pub enable_gossip: bool,
    pub enable_quic: bool,
    pub enable_secure_messaging: bool,
    pub require_mutual_tls: bool,
    pub enable_message_encryption: bool,
    pub enable_replay_protection: bool,

    pub rpc_bind_address: SocketAddr,
    pub gossip_bind_address: SocketAddr,

    pub identity_keypair_path: PathBuf,

    pub poh: PohConfig,
    pub fee_market: FeeMarketSurfaceConfig,
    pub mev_protection: MevProtectionSurfaceConfig,
    pub banking: BankingSurfaceConfig,
    pub resource_monitor: ResourceMonitorSurfaceConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            network_id: NetworkId::Localnet,
            enable_rpc: true,
            enable_gossip: true,
            enable_quic: true,
            enable_secure_messaging: true,
            require_mutual_tls: false,
            enable_message_encryption: true,
            enable_replay_protection: true,
            rpc_bind_address: "127.0.0.1:8545".parse().expect("valid default rpc address"),
            gossip_bind_address: "0.0.0.0:8001".parse().expect("valid default gossip address"),
            identity_keypair_path: PathBuf::from("./validator-identity.key"),
            poh: PohConfig::default(),
            fee_market: FeeMarketSurfaceConfig::default(),
            mev_protection: MevProtectionSurfaceConfig::default(),
            banking: BankingSurfaceConfig::default(),
            resource_monitor: ResourceMonitorSurfaceConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Loads a config from a TOML file, falling back to defaults if absent.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Builds the banking stage's own configuration from this surface,
    /// carrying through the fee-market, MEV and resource-monitor knobs.
    pub fn banking_stage_config(&self) -> BankingStageConfig {
        let mut config = BankingStageConfig {
            parallel_stages: self.banking.parallel_stages,
            ..BankingStageConfig::default()
        };
        config.fee_market.target_utilization = self.fee_market.target_utilization;
        config.fee_market.adaptive_enabled = self.fee_market.adaptive_fees;
        config.fee_market.max_history = self.fee_market.max_history_size;
        config.mev_pass.ordering_policy = self.mev_protection.protection_level;
        config.mev_pass.detection_enabled = self.mev_protection.detection_enabled;
        config.mev_pass.confidence_threshold = self.mev_protection.alert_threshold;
        config.resource_monitor.memory_warning = self.resource_monitor.memory_warning;
        config.resource_monitor.memory_critical = self.resource_monitor.memory_critical;
        config.resource_monitor.cpu_warning = self.resource_monitor.cpu_warning;
        config.resource_monitor.cpu_critical = self.resource_monitor.cpu_critical;
        config.resource_monitor.disk_warning = self.resource_monitor.disk_warning;
        config.resource_monitor.disk_critical = self.resource_monitor.disk_critical;
        config.resource_monitor.check_interval = self.resource_monitor.check_interval;
        config.resource_monitor.memory_headroom_mb = self.resource_monitor.memory_headroom_mb;
        config
    }
}

/// Carried through only so C10 can size worker pools; PoH generation itself
/// is out of scope here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PohConfig {
    pub tick_duration: Duration,
    pub ticks_per_slot: u64,
    pub hashing_threads: usize,
    pub batch_size: usize,
}

impl Default for PohConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_micros(500),
            ticks_per_slot: 64,
            hashing_threads: 2,
            batch_size: 128,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeMarketSurfaceConfig {
    pub target_utilization: f64,
    pub max_history_size: usize,
    pub adaptive_fees: bool,
}

impl Default for FeeMarketSurfaceConfig {
    fn default() -> Self {
        Self {
            target_utilization: 0.5,
            max_history_size: 1_000,
            adaptive_fees: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MevProtectionSurfaceConfig {
    pub protection_level: OrderingPolicy,
    pub alert_threshold: f64,
    pub detection_enabled: bool,
}

impl Default for MevProtectionSurfaceConfig {
    fn default() -> Self {
        Self {
            protection_level: OrderingPolicy::FairOrdering,
            alert_threshold: 0.8,
            detection_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankingSurfaceConfig {
    pub batch_size: usize,
    pub parallel_stages: usize,
    pub max_concurrent_batches: usize,
}

impl Default for BankingSurfaceConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            parallel_stages: 4,
            max_concurrent_batches: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMonitorSurfaceConfig {
    pub memory_warning: f64,
    pub memory_critical: f64,
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub disk_warning: f64,
    pub disk_critical: f64,
    pub check_interval: Duration,
    pub memory_headroom_mb: u64,
}

impl Default for ResourceMonitorSurfaceConfig {
    fn default() -> Self {
        Self {
            memory_warning: 0.80,
            memory_critical: 0.95,
            cpu_warning: 80.0,
            cpu_critical: 95.0,
            disk_warning: 0.85,
            disk_critical: 0.95,
            check_interval: Duration::from_secs(30),
            memory_headroom_mb: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ValidatorConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: ValidatorConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.rpc_bind_address, config.rpc_bind_address);
        assert_eq!(parsed.banking.parallel_stages, config.banking.parallel_stages);
    }

    #[test]
    fn loading_a_missing_path_falls_back_to_defaults() {
        let config = ValidatorConfig::load(std::path::Path::new("/nonexistent/path.toml")).unwrap();
        assert_eq!(config.network_id, NetworkId::Localnet);
    }

    #[test]
    fn banking_stage_config_carries_through_the_mev_protection_level() {
        let mut config = ValidatorConfig::default();
        config.mev_protection.protection_level = OrderingPolicy::Shuffled;
        let banking = config.banking_stage_config();
        assert_eq!(banking.mev_pass.ordering_policy, OrderingPolicy::Shuffled);
    }
}
