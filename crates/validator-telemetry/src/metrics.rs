//! Prometheus metrics for the validator's components.
//!
//! All metrics follow the naming convention: `validator_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., transactions_committed_total)
//! - **Gauge**: Value that can go up or down (e.g., peers_connected)
//! - **Histogram**: Distribution of values (e.g., batch_execution_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BANKING STAGE METRICS
    // =========================================================================

    /// Total transactions ingested into the banking stage's pool.
    pub static ref TRANSACTIONS_INGESTED: Counter = Counter::new(
        "validator_banking_transactions_ingested_total",
        "Total number of transactions accepted into the banking stage"
    ).expect("metric creation failed");

    /// Total transactions committed to the ledger.
    pub static ref TRANSACTIONS_COMMITTED: Counter = Counter::new(
        "validator_banking_transactions_committed_total",
        "Total number of transactions executed and committed"
    ).expect("metric creation failed");

    /// Total transactions that faulted during execution.
    pub static ref TRANSACTIONS_FAULTED: CounterVec = CounterVec::new(
        Opts::new("validator_banking_transactions_faulted_total", "Transactions that faulted during execution"),
        &["reason"]
    ).expect("metric creation failed");

    /// Batch execution duration.
    pub static ref BATCH_EXECUTION_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "validator_banking_batch_execution_duration_seconds",
            "Time spent executing a transaction batch"
        ).buckets(exponential_buckets(0.0001, 2.0, 15).unwrap())
    ).expect("metric creation failed");

    /// Current banking-stage batch size.
    pub static ref BANKING_BATCH_SIZE: Gauge = Gauge::new(
        "validator_banking_batch_size",
        "Number of transactions in the most recently dispatched batch"
    ).expect("metric creation failed");

    /// Compute units consumed.
    pub static ref COMPUTE_UNITS_CONSUMED: Counter = Counter::new(
        "validator_bpf_compute_units_consumed_total",
        "Total compute units consumed by transaction execution"
    ).expect("metric creation failed");

    // =========================================================================
    // FEE MARKET METRICS
    // =========================================================================

    /// Current base fee.
    pub static ref FEE_BASE_FEE: Gauge = Gauge::new(
        "validator_fee_base_fee_lamports",
        "Current adaptive base fee, in lamports"
    ).expect("metric creation failed");

    /// Block utilization ratio that drove the last fee adjustment.
    pub static ref FEE_UTILIZATION_RATIO: Gauge = Gauge::new(
        "validator_fee_utilization_ratio",
        "Compute utilization ratio used for the last base fee adjustment"
    ).expect("metric creation failed");

    // =========================================================================
    // MEV PROTECTION METRICS
    // =========================================================================

    /// MEV alerts raised, by type.
    pub static ref MEV_ALERTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("validator_mev_alerts_total", "MEV alerts raised by type"),
        &["alert_type"]
    ).expect("metric creation failed");

    /// Transactions filtered as suspicious.
    pub static ref MEV_TRANSACTIONS_FILTERED: Counter = Counter::new(
        "validator_mev_transactions_filtered_total",
        "Total transactions filtered out as suspicious"
    ).expect("metric creation failed");

    // =========================================================================
    // CLUSTER MEMBERSHIP METRICS
    // =========================================================================

    /// Connected peers.
    pub static ref PEERS_CONNECTED: Gauge = Gauge::new(
        "validator_cluster_peers_connected",
        "Number of currently connected peers"
    ).expect("metric creation failed");

    /// Peers evicted for heartbeat staleness.
    pub static ref PEERS_EVICTED: Counter = Counter::new(
        "validator_cluster_peers_evicted_total",
        "Total peers evicted for heartbeat staleness"
    ).expect("metric creation failed");

    // =========================================================================
    // QUIC TRANSPORT METRICS
    // =========================================================================

    /// Bytes sent over QUIC connections.
    pub static ref QUIC_BYTES_SENT: Counter = Counter::new(
        "validator_quic_bytes_sent_total",
        "Total bytes sent over QUIC connections"
    ).expect("metric creation failed");

    /// Bytes received over QUIC connections.
    pub static ref QUIC_BYTES_RECEIVED: Counter = Counter::new(
        "validator_quic_bytes_received_total",
        "Total bytes received over QUIC connections"
    ).expect("metric creation failed");

    /// Active QUIC connections.
    pub static ref QUIC_CONNECTIONS_ACTIVE: Gauge = Gauge::new(
        "validator_quic_connections_active",
        "Number of currently open QUIC connections"
    ).expect("metric creation failed");

    /// Handshake rate limit rejections.
    pub static ref QUIC_HANDSHAKES_REJECTED: Counter = Counter::new(
        "validator_quic_handshakes_rejected_total",
        "Total QUIC handshakes rejected by the rate limiter"
    ).expect("metric creation failed");

    // =========================================================================
    // SIGNATURE VERIFICATION METRICS
    // =========================================================================

    /// Total signature verifications.
    pub static ref SIGNATURE_VERIFICATIONS: CounterVec = CounterVec::new(
        Opts::new("validator_signature_verifications_total", "Total signature verifications"),
        &["result"]  // result: valid/invalid
    ).expect("metric creation failed");

    /// Signature verification duration.
    pub static ref SIGNATURE_DURATION: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "validator_signature_verification_duration_seconds",
            "Time spent verifying signatures"
        ).buckets(exponential_buckets(0.00001, 2.0, 15).unwrap()),
        &["mode"]  // mode: single/batch
    ).expect("metric creation failed");

    // =========================================================================
    // RESOURCE MONITOR METRICS
    // =========================================================================

    /// Whether the validator is currently under resource pressure.
    pub static ref RESOURCE_PRESSURE: Gauge = Gauge::new(
        "validator_resource_pressure",
        "1 if the validator is under memory/cpu/disk pressure, else 0"
    ).expect("metric creation failed");

    /// Memory usage ratio.
    pub static ref RESOURCE_MEMORY_USAGE_RATIO: Gauge = Gauge::new(
        "validator_resource_memory_usage_ratio",
        "Fraction of total memory currently in use"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    /// Messages published via the event bus.
    pub static ref EVENT_BUS_MESSAGES_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("validator_eventbus_messages_published_total", "Messages published via the event bus"),
        &["topic"]
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Component errors by type.
    pub static ref COMPONENT_ERRORS: CounterVec = CounterVec::new(
        Opts::new("validator_component_errors_total", "Errors by component and type"),
        &["component", "error_type"]
    ).expect("metric creation failed");
}

/// Handle for the metrics server
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Banking stage
        Box::new(TRANSACTIONS_INGESTED.clone()),
        Box::new(TRANSACTIONS_COMMITTED.clone()),
        Box::new(TRANSACTIONS_FAULTED.clone()),
        Box::new(BATCH_EXECUTION_DURATION.clone()),
        Box::new(BANKING_BATCH_SIZE.clone()),
        Box::new(COMPUTE_UNITS_CONSUMED.clone()),
        // Fee market
        Box::new(FEE_BASE_FEE.clone()),
        Box::new(FEE_UTILIZATION_RATIO.clone()),
        // MEV protection
        Box::new(MEV_ALERTS_TOTAL.clone()),
        Box::new(MEV_TRANSACTIONS_FILTERED.clone()),
        // Cluster membership
        Box::new(PEERS_CONNECTED.clone()),
        Box::new(PEERS_EVICTED.clone()),
        // QUIC transport
        Box::new(QUIC_BYTES_SENT.clone()),
        Box::new(QUIC_BYTES_RECEIVED.clone()),
        Box::new(QUIC_CONNECTIONS_ACTIVE.clone()),
        Box::new(QUIC_HANDSHAKES_REJECTED.clone()),
        // Signatures
        Box::new(SIGNATURE_VERIFICATIONS.clone()),
        Box::new(SIGNATURE_DURATION.clone()),
        // Resource monitor
        Box::new(RESOURCE_PRESSURE.clone()),
        Box::new(RESOURCE_MEMORY_USAGE_RATIO.clone()),
        // Event bus
        Box::new(EVENT_BUS_MESSAGES_PUBLISHED.clone()),
        // Errors
        Box::new(COMPONENT_ERRORS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // Create a new registry for testing
        let result = register_metrics();
        // May fail if already registered, which is fine
        let _ = result;
    }

    #[test]
    fn test_counter_increment() {
        TRANSACTIONS_COMMITTED.inc();
        assert!(TRANSACTIONS_COMMITTED.get() >= 1.0);
    }

    #[test]
    fn test_gauge_set() {
        BANKING_BATCH_SIZE.set(64.0);
        assert_eq!(BANKING_BATCH_SIZE.get(), 64.0);
    }

    #[test]
    fn test_histogram_timer() {
        let _timer = HistogramTimer::new(&BATCH_EXECUTION_DURATION);
        std::thread::sleep(std::time::Duration::from_millis(1));
        // Timer observes on drop
    }
}
