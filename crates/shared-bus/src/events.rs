//! # Validator Events
//!
//! Defines all event types that flow through the shared bus between the
//! validator's subsystems (banking stage, fee market, MEV protection,
//! cluster membership, QUIC transport, resource monitor).

use serde::{Deserialize, Serialize};
use shared_types::entities::NodeId;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValidatorEvent {
    /// A transaction passed ingress validation and entered the banking
    /// stage's pool.
    TransactionIngested {
        /// Hex-encoded transaction hash (first signature).
        hash: String,
    },

    /// A transaction was executed and committed to the ledger.
    TransactionCommitted {
        /// Hex-encoded transaction hash.
        hash: String,
        /// Compute units consumed during execution.
        compute_units: u64,
    },

    /// A transaction faulted during execution and was rolled back.
    TransactionFaulted {
        /// Hex-encoded transaction hash.
        hash: String,
        /// Reason for the fault.
        reason: String,
    },

    /// A batch was committed by the banking stage.
    BatchCommitted {
        /// Number of transactions in the batch.
        batch_size: usize,
        /// Total compute units consumed by the batch.
        compute_units: u64,
    },

    /// The fee market recomputed its base fee.
    BaseFeeUpdated {
        /// New base fee, in lamports.
        base_fee: u64,
        /// Utilization ratio that drove the adjustment.
        utilization: f64,
    },

    /// The MEV protection module raised an alert.
    MevAlertRaised {
        /// Alert kind, e.g. `"sandwich_attack"`.
        alert_type: String,
        /// Confidence score in `[0.0, 1.0]`.
        confidence: f64,
        /// Transaction hashes implicated in the alert.
        transaction_hashes: Vec<String>,
    },

    /// Resource pressure state changed (entered or left a warning/critical
    /// threshold).
    ResourcePressureChanged {
        /// Whether the validator is now under resource pressure.
        under_pressure: bool,
        /// Memory usage ratio at the time of the transition.
        memory_usage_ratio: f64,
    },

    /// A peer completed the cluster handshake and joined the membership
    /// table.
    PeerConnected {
        /// The peer's node id.
        node_id: NodeId,
    },

    /// A peer was evicted for heartbeat staleness or disconnected.
    PeerDisconnected {
        /// The peer's node id.
        node_id: NodeId,
    },

    /// A QUIC connection pool eviction occurred.
    ConnectionEvicted {
        /// The evicted peer's node id.
        node_id: NodeId,
        /// Reason for eviction, e.g. `"idle_timeout"`, `"pool_full"`.
        reason: String,
    },

    /// A block was announced to the cluster.
    BlockAnnounced {
        /// Slot number of the announced block.
        slot: u64,
        /// Hex-encoded block hash.
        hash: String,
    },

    /// Critical error requiring operator attention.
    CriticalError {
        /// The component that encountered the error, e.g. `"banking-stage"`.
        component: String,
        /// Error description.
        error: String,
    },
}

impl ValidatorEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::TransactionIngested { .. }
            | Self::TransactionCommitted { .. }
            | Self::TransactionFaulted { .. }
            | Self::BatchCommitted { .. } => EventTopic::BankingStage,
            Self::BaseFeeUpdated { .. } => EventTopic::FeeMarket,
            Self::MevAlertRaised { .. } => EventTopic::MevProtection,
            Self::ResourcePressureChanged { .. } => EventTopic::Resource,
            Self::PeerConnected { .. } | Self::PeerDisconnected { .. } => {
                EventTopic::ClusterMembership
            }
            Self::ConnectionEvicted { .. } => EventTopic::QuicTransport,
            Self::BlockAnnounced { .. } => EventTopic::ClusterMembership,
            Self::CriticalError { .. } => EventTopic::DeadLetterQueue,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    BankingStage,
    FeeMarket,
    MevProtection,
    ClusterMembership,
    QuicTransport,
    Resource,
    /// Dead Letter Queue for critical errors.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ValidatorEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_topic_mapping() {
        let event = ValidatorEvent::BaseFeeUpdated {
            base_fee: 5000,
            utilization: 0.5,
        };
        assert_eq!(event.topic(), EventTopic::FeeMarket);
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        let event = ValidatorEvent::BaseFeeUpdated {
            base_fee: 5000,
            utilization: 0.5,
        };
        assert!(filter.matches(&event));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::FeeMarket]);

        let fee_event = ValidatorEvent::BaseFeeUpdated {
            base_fee: 5000,
            utilization: 0.5,
        };
        assert!(filter.matches(&fee_event));

        let peer_event = ValidatorEvent::PeerConnected {
            node_id: "node_1".to_string(),
        };
        assert!(!filter.matches(&peer_event));
    }

    #[test]
    fn test_mev_alert_event() {
        let event = ValidatorEvent::MevAlertRaised {
            alert_type: "sandwich_attack".to_string(),
            confidence: 0.9,
            transaction_hashes: vec!["abc".to_string()],
        };
        assert_eq!(event.topic(), EventTopic::MevProtection);
    }
}
