//! Adaptive batch sizing: tracks a moving average of per-transaction
//! execution latency and adjusts the batch size to target a configured
//! wall-clock budget per batch.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Smoothing factor for the exponential moving average (0, 1].
const EMA_ALPHA: f64 = 0.2;

/// Adaptive batcher. Not a queue itself — just the sizing policy consulted
/// before each batch is drawn from the ingress queue.
pub struct AdaptiveBatcher {
    target_batch_wall_clock: Duration,
    min_batch_size: usize,
    max_batch_size: usize,
    ema_latency_micros: AtomicU64,
    current_size: AtomicUsize,
    enabled: bool,
}

impl AdaptiveBatcher {
    pub fn new(
        target_batch_wall_clock: Duration,
        min_batch_size: usize,
        max_batch_size: usize,
        enabled: bool,
    ) -> Self {
        Self {
            target_batch_wall_clock,
            min_batch_size,
            max_batch_size,
            ema_latency_micros: AtomicU64::new(0),
            current_size: AtomicUsize::new(max_batch_size),
            enabled,
        }
    }

    /// Record the wall-clock time it took to execute a single transaction
    /// and update the target batch size.
    pub fn record_tx_latency(&self, latency: Duration) {
        if !self.enabled {
            return;
        }
        let sample = latency.as_micros() as f64;
        let prev = self.ema_latency_micros.load(Ordering::Relaxed) as f64;
        let updated = if prev == 0.0 {
            sample
        } else {
            EMA_ALPHA * sample + (1.0 - EMA_ALPHA) * prev
        };
        self.ema_latency_micros
            .store(updated as u64, Ordering::Relaxed);

        if updated > 0.0 {
            let target_micros = self.target_batch_wall_clock.as_micros() as f64;
            let size = (target_micros / updated).floor() as usize;
            let clamped = size.clamp(self.min_batch_size, self.max_batch_size);
            self.current_size.store(clamped, Ordering::Relaxed);
        }
    }

    /// The batch size to draw next, after applying any resource-pressure
    /// halving the caller has already decided on.
    pub fn batch_size(&self) -> usize {
        self.current_size.load(Ordering::Relaxed)
    }

    pub fn halve(&self) -> usize {
        let current = self.current_size.load(Ordering::Relaxed);
        let halved = (current / 2).max(1);
        self.current_size.store(halved, Ordering::Relaxed);
        halved
    }

    pub fn reset_to_max(&self) {
        self.current_size.store(self.max_batch_size, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batcher_starts_at_max_size() {
        let batcher = AdaptiveBatcher::new(Duration::from_millis(50), 8, 256, true);
        assert_eq!(batcher.batch_size(), 256);
    }

    #[test]
    fn fast_transactions_grow_toward_max() {
        let batcher = AdaptiveBatcher::new(Duration::from_millis(10), 8, 1000, true);
        batcher.record_tx_latency(Duration::from_micros(1));
        assert!(batcher.batch_size() > 8);
    }

    #[test]
    fn slow_transactions_shrink_batch_size() {
        let batcher = AdaptiveBatcher::new(Duration::from_millis(1), 8, 1000, true);
        batcher.record_tx_latency(Duration::from_millis(1));
        assert!(batcher.batch_size() <= 1000);
    }

    #[test]
    fn halve_never_drops_below_one() {
        let batcher = AdaptiveBatcher::new(Duration::from_millis(50), 1, 2, true);
        batcher.halve();
        assert_eq!(batcher.batch_size(), 1);
        batcher.halve();
        assert_eq!(batcher.batch_size(), 1);
    }

    #[test]
    fn disabled_batcher_ignores_latency_samples() {
        let batcher = AdaptiveBatcher::new(Duration::from_millis(50), 8, 256, false);
        batcher.record_tx_latency(Duration::from_secs(1));
        assert_eq!(batcher.batch_size(), 256);
    }
}
