//! Startup and shutdown sequencing: wires identity, telemetry, the event
//! bus, the banking stage, transport and cluster membership together, then
//! runs until told to stop.
//!
//! The banking stage's [`EventSink`](banking_stage::commit::EventSink) and
//! [`BlockNotifier`](banking_stage::commit::BlockNotifier) traits are plain
//! synchronous callbacks invoked from the commit stage's own thread; both
//! adapters here capture a [`tokio::runtime::Handle`] and hand the async
//! work off with `spawn`, mirroring the sync-to-async boundary the
//! commit stage's own doc comment calls out.

use std::sync::{Arc, Weak};

use anyhow::Context;
use banking_stage::commit::{BlockNotifier, EventSink};
use banking_stage::execution::ExecutedTransaction;
use banking_stage::{BankingStage, TransactionVerifier};
use cluster_membership::{ClusterConfig, ClusterMembership};
use crypto_iface::Ed25519Verifier;
use quic_transport::{QuicClient, QuicServer, TransportConfig};
use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus, ValidatorEvent};
use shared_types::entities::Transaction;
use shared_types::wire::ClusterMessageType;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use validator_telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};

use crate::alerts::{AlertDispatcher, AlertEntry};
use crate::config::ValidatorConfig;
use crate::identity::Identity;

/// Bridges the banking stage's synchronous [`EventSink`] onto the async
/// event bus, re-entering the runtime from whatever thread the commit
/// stage calls `emit` on.
struct BusEventSink {
    bus: Arc<InMemoryEventBus>,
    runtime: Handle,
}

impl EventSink for BusEventSink {
    fn emit(&self, event: ValidatorEvent) {
        let bus = self.bus.clone();
        self.runtime.spawn(async move {
            bus.publish(event).await;
        });
    }
}

/// Bridges the banking stage's synchronous [`BlockNotifier`] onto
/// [`ClusterMembership::broadcast`], announcing every committed batch to
/// the rest of the cluster.
struct GossipBlockNotifier {
    membership: Arc<ClusterMembership>,
    runtime: Handle,
}

impl BlockNotifier for GossipBlockNotifier {
    fn notify(&self, committed: &[ExecutedTransaction]) {
        if committed.is_empty() {
            return;
        }
        let slot = self.membership.current_slot();
        let hash = committed
            .last()
            .and_then(|tx| tx.transaction.signatures.first())
            .map(|sig| sig.iter().map(|b| format!("{b:02x}")).collect::<String>())
            .unwrap_or_default();
        let payload = match serde_json::to_vec(&shared_types::wire::BlockAnnouncementPayload {
            slot,
            hash,
            size: committed.len() as u64,
        }) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to encode block announcement payload");
                return;
            }
        };

        let membership = self.membership.clone();
        self.runtime.spawn(async move {
            membership
                .broadcast(ClusterMessageType::BlockAnnouncement, payload)
                .await;
        });
    }
}

/// Everything started up, held for the life of the process and torn down
/// in reverse order on shutdown.
pub struct Orchestrator {
    event_bus: Arc<InMemoryEventBus>,
    alerts: Arc<AlertDispatcher>,
    membership: Arc<ClusterMembership>,
    banking: Option<Arc<BankingStage>>,
    server: Option<Arc<QuicServer>>,
    heartbeat: Option<JoinHandle<()>>,
    dlq_forwarder: Option<JoinHandle<()>>,
    _telemetry: TelemetryGuard,
}

impl Orchestrator {
    /// Loads identity, starts telemetry, spawns the banking stage behind
    /// bus/gossip adapters, binds QUIC, bootstraps cluster membership and
    /// registers the inbound transaction-forward route.
    pub async fn start(config: ValidatorConfig) -> anyhow::Result<Self> {
        let identity = Identity::load_or_generate(&config.identity_keypair_path)
            .context("loading validator identity")?;
        info!(node_id = %identity.node_id, "identity loaded");

        let telemetry = init_telemetry(TelemetryConfig::for_component("validator-node"))
            .await
            .map_err(|e| anyhow::anyhow!("telemetry init failed: {e}"))?;

        let event_bus = Arc::new(InMemoryEventBus::new());
        let alerts = Arc::new(AlertDispatcher::with_logging());
        let dlq_forwarder = Some(spawn_alert_forwarder(event_bus.clone(), alerts.clone()));

        let runtime = Handle::current();
        let sink = Arc::new(BusEventSink {
            bus: event_bus.clone(),
            runtime: runtime.clone(),
        });

        let transport_config = TransportConfig {
            bind_addr: config.gossip_bind_address,
            ..TransportConfig::default()
        };
        let client = Arc::new(QuicClient::new(transport_config.clone())?);
        let server = if config.enable_gossip {
            Some(Arc::new(QuicServer::bind(&transport_config)?))
        } else {
            None
        };

        let membership = Arc::new(ClusterMembership::new(
            ClusterConfig {
                network_id: config.network_id,
                ..ClusterConfig::default()
            },
            identity.node_id.clone(),
            client,
            Arc::new(|node_id| warn!(%node_id, "peer disconnected")),
        ));

        let verifier = Arc::new(TransactionVerifier::new(Arc::new(Ed25519Verifier)));
        let notifier = Arc::new(GossipBlockNotifier {
            membership: membership.clone(),
            runtime,
        });
        let banking = Arc::new(BankingStage::spawn(
            config.banking_stage_config(),
            verifier,
            sink,
            notifier,
        ));

        // Weak, so the router's registered closure never keeps the
        // banking stage alive past `Orchestrator::shutdown`.
        let forward_target = Arc::downgrade(&banking);
        membership.router().register(
            ClusterMessageType::TransactionForward,
            Box::new(move |frame| forward_to_banking_stage(&forward_target, frame)),
        );

        if config.enable_gossip {
            let connected = membership.bootstrap().await;
            info!(connected, "cluster bootstrap complete");
        }
        let heartbeat = Some(membership.clone().spawn_heartbeat());

        Ok(Self {
            event_bus,
            alerts,
            membership,
            banking: Some(banking),
            server,
            heartbeat,
            dlq_forwarder,
            _telemetry: telemetry,
        })
    }

    /// Blocks until the process receives a shutdown signal, then tears
    /// every component down in reverse startup order.
    pub async fn run_until_shutdown(mut self) -> anyhow::Result<()> {
        tokio::signal::ctrl_c()
            .await
            .context("waiting for shutdown signal")?;
        info!("shutdown signal received");
        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        self.membership.stop();
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
        if let Some(handle) = self.dlq_forwarder.take() {
            handle.abort();
        }
        drop(self.server.take());

        if let Some(banking) = self.banking.take() {
            match Arc::try_unwrap(banking) {
                Ok(banking) => banking.shutdown(),
                Err(_) => warn!("banking stage still referenced at shutdown, skipping join"),
            }
        }

        info!(
            events_published = self.event_bus.events_published(),
            "validator node shut down"
        );
    }
}

/// Decodes a forwarded transaction and resubmits it to the local banking
/// stage. Silently drops the frame if the stage has already shut down.
fn forward_to_banking_stage(target: &Weak<BankingStage>, frame: &shared_types::wire::ClusterFrame) {
    let Some(banking) = target.upgrade() else {
        return;
    };
    match bincode::deserialize::<Transaction>(&frame.payload) {
        Ok(tx) => {
            if let Err(e) = banking.submit(tx) {
                warn!(error = %e, "failed to resubmit forwarded transaction");
            }
        }
        Err(e) => warn!(error = %e, "malformed transaction-forward payload"),
    }
}

/// Subscribes to the dead-letter-queue topic and forwards every
/// `CriticalError` event into the alert dispatcher.
fn spawn_alert_forwarder(
    bus: Arc<InMemoryEventBus>,
    alerts: Arc<AlertDispatcher>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sub = bus.subscribe(EventFilter::topics(vec![shared_bus::EventTopic::DeadLetterQueue]));
        while let Some(event) = sub.recv().await {
            if let ValidatorEvent::CriticalError { component, error } = event {
                alerts.fire(AlertEntry {
                    component,
                    code: "critical_error".to_string(),
                    message: error,
                });
            } else {
                error!(?event, "unexpected event on dead-letter-queue topic");
            }
        }
    })
}
