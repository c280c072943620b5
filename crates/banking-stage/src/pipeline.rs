//! Wires the seven pipeline stages together: ingress, signature
//! verification, fee classification, MEV pass, account-conflict resolution,
//! execution, commit. Each stage is its own thread, connected to its
//! neighbors by bounded `crossbeam_channel` queues, the same
//! thread-per-stage-with-an-exit-flag shape the TPU fetch stage uses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Builder, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use fee_market::FeeMarket;
use mev_protection::AlertHistory;
use rayon::prelude::*;
use shared_types::entities::Transaction;

use crate::batching::AdaptiveBatcher;
use crate::commit::{self, BlockNotifier, EventSink};
use crate::config::BankingStageConfig;
use crate::conflict::{self, ConflictGroup};
use crate::execution::{self, ExecutedTransaction};
use crate::fee_classify;
use crate::ingress::{self, DedupCache};
use crate::mev_pass;
use crate::resource_monitor::{ResourceMonitor, SystemSampler, SystemStatSampler};
use crate::verification::TransactionVerifier;

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

fn recv_batch<T>(rx: &Receiver<T>, exit: &AtomicBool) -> Option<T> {
    loop {
        if exit.load(Ordering::Relaxed) {
            return None;
        }
        match rx.recv_timeout(RECV_TIMEOUT) {
            Ok(item) => return Some(item),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

/// The running pipeline: an ingress handle plus the join handles of every
/// stage thread.
pub struct BankingStage {
    ingress_tx: Sender<Transaction>,
    exit: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    resource_monitor: Option<ResourceMonitor>,
    pub fee_market: Arc<FeeMarket>,
    pub alert_history: Arc<AlertHistory>,
}

impl BankingStage {
    /// Spawn all seven stages and return a handle for feeding transactions
    /// in and shutting the pipeline down.
    pub fn spawn(
        config: BankingStageConfig,
        verifier: Arc<TransactionVerifier>,
        sink: Arc<dyn EventSink>,
        notifier: Arc<dyn BlockNotifier>,
    ) -> Self {
        Self::spawn_with_sampler(config, verifier, sink, notifier, Arc::new(SystemStatSampler::default()))
    }

    pub fn spawn_with_sampler(
        config: BankingStageConfig,
        verifier: Arc<TransactionVerifier>,
        sink: Arc<dyn EventSink>,
        notifier: Arc<dyn BlockNotifier>,
        sampler: Arc<dyn SystemSampler>,
    ) -> Self {
        let exit = Arc::new(AtomicBool::new(false));
        let fee_market = Arc::new(FeeMarket::new(config.fee_market.clone()));
        let alert_history = Arc::new(AlertHistory::new());
        let dedup = Arc::new(DedupCache::new(config.dedup_capacity));
        let batcher = Arc::new(AdaptiveBatcher::new(
            config.batching.target_batch_wall_clock,
            config.batching.min_batch_size,
            config.batching.max_batch_size,
            config.batching.adaptive_enabled,
        ));
        let resource_monitor = ResourceMonitor::spawn(config.resource_monitor.clone(), sampler);

        let (ingress_tx, ingress_rx) = bounded::<Transaction>(config.queues.ingress_capacity);
        let (sigverify_tx, sigverify_rx) = bounded::<Vec<Transaction>>(config.queues.sigverify_capacity);
        let (fee_tx, fee_rx) = bounded::<Vec<Transaction>>(config.queues.fee_classify_capacity);
        let (mev_tx, mev_rx) = bounded::<Vec<Transaction>>(config.queues.mev_pass_capacity);
        let (conflict_tx, conflict_rx) = bounded::<Vec<ConflictGroup>>(config.queues.conflict_capacity);
        let (execution_tx, execution_rx) =
            bounded::<Vec<ExecutedTransaction>>(config.queues.execution_capacity);

        let mut threads = Vec::with_capacity(6);

        // Stage 1: ingress. Batches admitted transactions, halving the
        // batch size under resource warning and pausing entirely under
        // critical pressure.
        {
            let exit = exit.clone();
            let dedup = dedup.clone();
            let batcher = batcher.clone();
            let monitor = resource_monitor.handle();
            threads.push(
                Builder::new()
                    .name("banking-ingress".into())
                    .spawn(move || {
                        let mut buf = Vec::new();
                        let mut last_flush = Instant::now();
                        while !exit.load(Ordering::Relaxed) {
                            if monitor.critical() {
                                thread::sleep(Duration::from_millis(50));
                                continue;
                            }
                            match ingress_rx.recv_timeout(RECV_TIMEOUT) {
                                Ok(tx) => {
                                    if ingress::admit(&tx, &dedup).is_ok() {
                                        buf.push(tx);
                                    }
                                }
                                Err(RecvTimeoutError::Timeout) => {}
                                Err(RecvTimeoutError::Disconnected) => break,
                            }

                            let target = if monitor.pressure() {
                                batcher.halve()
                            } else {
                                batcher.batch_size()
                            };
                            let should_flush = buf.len() >= target
                                || (!buf.is_empty() && last_flush.elapsed() >= RECV_TIMEOUT);
                            if should_flush {
                                let batch = std::mem::take(&mut buf);
                                if sigverify_tx.send(batch).is_err() {
                                    break;
                                }
                                last_flush = Instant::now();
                            }
                        }
                    })
                    .expect("failed to spawn banking-ingress thread"),
            );
        }

        // Stage 2: signature verification, fanned out across the Rayon pool.
        {
            let exit = exit.clone();
            let verifier = verifier.clone();
            threads.push(
                Builder::new()
                    .name("banking-sigverify".into())
                    .spawn(move || {
                        while let Some(batch) = recv_batch(&sigverify_rx, &exit) {
                            let (ok, rejected): (Vec<_>, Vec<_>) = batch
                                .into_par_iter()
                                .map(|tx| match verifier.verify(&tx) {
                                    Ok(()) => (Some(tx), None),
                                    Err(reason) => (None, Some(reason)),
                                })
                                .unzip();
                            for reason in rejected.into_iter().flatten() {
                                tracing::debug!(%reason, "transaction rejected at sigverify");
                            }
                            let verified: Vec<Transaction> = ok.into_iter().flatten().collect();
                            if !verified.is_empty() && fee_tx.send(verified).is_err() {
                                break;
                            }
                        }
                    })
                    .expect("failed to spawn banking-sigverify thread"),
            );
        }

        // Stage 3: fee classification against the shared fee market.
        {
            let exit = exit.clone();
            let fee_market = fee_market.clone();
            let min_fee = config.min_fee;
            threads.push(
                Builder::new()
                    .name("banking-fee-classify".into())
                    .spawn(move || {
                        while let Some(batch) = recv_batch(&fee_rx, &exit) {
                            let (accepted, rejected) = fee_classify::run(batch, &fee_market, min_fee);
                            for (_, reason) in &rejected {
                                tracing::debug!(%reason, "transaction rejected at fee classification");
                            }
                            let batch: Vec<Transaction> =
                                accepted.into_iter().map(|c| c.transaction).collect();
                            if !batch.is_empty() && mev_tx.send(batch).is_err() {
                                break;
                            }
                        }
                    })
                    .expect("failed to spawn banking-fee-classify thread"),
            );
        }

        // Stage 4: MEV detection, filtering and ordering.
        {
            let exit = exit.clone();
            let alert_history = alert_history.clone();
            let mev_config = config.mev_pass.clone();
            threads.push(
                Builder::new()
                    .name("banking-mev-pass".into())
                    .spawn(move || {
                        while let Some(batch) = recv_batch(&mev_rx, &exit) {
                            let batch = mev_pass::run(batch, &mev_config, &alert_history);
                            let groups = conflict::group(batch);
                            if !groups.is_empty() && conflict_tx.send(groups).is_err() {
                                break;
                            }
                        }
                    })
                    .expect("failed to spawn banking-mev-pass thread"),
            );
        }

        // Stage 5 (grouping happens inline above) + stage 6: execution.
        {
            let exit = exit.clone();
            let batcher = batcher.clone();
            let compute_budget = config.compute_budget;
            threads.push(
                Builder::new()
                    .name("banking-execution".into())
                    .spawn(move || {
                        while let Some(groups) = recv_batch(&conflict_rx, &exit) {
                            let tx_count: usize = groups.iter().map(|g| g.transactions.len()).sum();
                            let start = Instant::now();
                            let executed = execution::execute_groups(groups, compute_budget);
                            if tx_count > 0 {
                                batcher.record_tx_latency(start.elapsed() / tx_count as u32);
                            }
                            if !executed.is_empty() && execution_tx.send(executed).is_err() {
                                break;
                            }
                        }
                    })
                    .expect("failed to spawn banking-execution thread"),
            );
        }

        // Stage 7: commit.
        {
            let exit = exit.clone();
            threads.push(
                Builder::new()
                    .name("banking-commit".into())
                    .spawn(move || {
                        while let Some(executed) = recv_batch(&execution_rx, &exit) {
                            commit::commit(executed, sink.as_ref(), notifier.as_ref());
                        }
                    })
                    .expect("failed to spawn banking-commit thread"),
            );
        }

        Self {
            ingress_tx,
            exit,
            threads,
            resource_monitor: Some(resource_monitor),
            fee_market,
            alert_history,
        }
    }

    /// Submit a transaction to the pipeline. Blocks briefly if the ingress
    /// queue is full.
    pub fn submit(&self, tx: Transaction) -> Result<(), crate::errors::BankingStageError> {
        self.ingress_tx
            .send(tx)
            .map_err(|_| crate::errors::BankingStageError::ChannelClosed)
    }

    pub fn shutdown(mut self) {
        self.exit.store(true, Ordering::Relaxed);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        if let Some(monitor) = self.resource_monitor.take() {
            monitor.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::NullSink;
    use crypto_iface::Ed25519Verifier;
    use std::sync::atomic::AtomicUsize;

    fn config() -> BankingStageConfig {
        BankingStageConfig {
            min_fee: 0,
            batching: crate::config::BatchingConfig {
                target_batch_wall_clock: Duration::from_millis(5),
                min_batch_size: 1,
                max_batch_size: 16,
                adaptive_enabled: false,
            },
            ..BankingStageConfig::default()
        }
    }

    #[test]
    fn a_submitted_transaction_is_committed() {
        let committed = Arc::new(AtomicUsize::new(0));
        let committed_clone = committed.clone();
        let notifier = move |batch: &[ExecutedTransaction]| {
            committed_clone.fetch_add(batch.len(), Ordering::SeqCst);
        };

        let verifier = Arc::new(TransactionVerifier::new(Arc::new(Ed25519Verifier)));
        let stage = BankingStage::spawn(
            config(),
            verifier,
            Arc::new(NullSink),
            Arc::new(notifier),
        );

        let keypair = crypto_iface::Ed25519KeyPair::generate();
        let mut message = keypair.public_key().as_bytes().to_vec();
        message.extend_from_slice(&0u64.to_le_bytes());
        let signature = keypair.sign(&message);
        let tx = Transaction::new(vec![*signature.as_bytes()], message);

        stage.submit(tx).unwrap();
        thread::sleep(Duration::from_millis(500));
        stage.shutdown();

        assert_eq!(committed.load(Ordering::SeqCst), 1);
    }
}
