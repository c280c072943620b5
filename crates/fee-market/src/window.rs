//! FIFO fee-sample window guarded by a single mutex.

use parking_lot::Mutex;

/// A single recorded fee observation: the fee paid and whether the
/// transaction that paid it was included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSample {
    pub fee: u64,
    pub included: bool,
}

/// Aggregate statistics over the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeStats {
    pub count: usize,
    pub min: u64,
    pub median: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
}

/// Default cap on the number of samples retained.
pub const DEFAULT_MAX_HISTORY: usize = 10_000;

/// FIFO window of recent fee samples. Sorting for percentile queries is
/// done per-call; the window is small enough that caching isn't needed.
pub struct FeeWindow {
    max_history: usize,
    samples: Mutex<Vec<FeeSample>>,
}

impl FeeWindow {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            samples: Mutex::new(Vec::with_capacity(max_history.min(1024))),
        }
    }

    pub fn record(&self, fee: u64, included: bool) {
        let mut samples = self.samples.lock();
        samples.push(FeeSample { fee, included });
        if samples.len() > self.max_history {
            let overflow = samples.len() - self.max_history;
            samples.drain(0..overflow);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort the current window ascending and return `window[floor(p * (n-1))]`.
    pub fn percentile(&self, p: f64) -> Option<u64> {
        let mut samples = self.samples.lock();
        if samples.is_empty() {
            return None;
        }
        samples.sort_by_key(|s| s.fee);
        let idx = (p.clamp(0.0, 1.0) * (samples.len() - 1) as f64).floor() as usize;
        Some(samples[idx].fee)
    }

    /// Fraction of samples in the window that were included.
    pub fn inclusion_rate(&self) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 1.0;
        }
        let included = samples.iter().filter(|s| s.included).count();
        included as f64 / samples.len() as f64
    }

    pub fn stats(&self) -> Option<FeeStats> {
        let mut samples = self.samples.lock();
        if samples.is_empty() {
            return None;
        }
        samples.sort_by_key(|s| s.fee);
        let n = samples.len();
        let at = |p: f64| samples[(p * (n - 1) as f64).floor() as usize].fee;
        Some(FeeStats {
            count: n,
            min: samples[0].fee,
            median: at(0.50),
            p90: at(0.90),
            p99: at(0.99),
            max: samples[n - 1].fee,
        })
    }
}

impl Default for FeeWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
