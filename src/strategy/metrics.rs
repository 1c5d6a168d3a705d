//! Transfer metrics with EWMA smoothing

use std::collections::VecDeque;
use std::time::Duration;

use tracing::debug;

/// Default EWMA smoothing factor
pub const DEFAULT_EWMA_ALPHA: f64 = 0.2;
/// Default number of recent chunks kept for throughput
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Outcome of a single confirmed chunk
#[derive(Debug, Clone, Copy)]
pub struct ChunkSample {
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Latency and throughput tracking for progress reporting
#[derive(Debug, Clone)]
pub struct TransferMetrics {
    /// EWMA smoothing factor (0.0-1.0, higher = more responsive to recent values)
    alpha: f64,
    /// Current EWMA latency in milliseconds
    ewma_latency_ms: f64,
    /// Recent chunks for throughput calculation
    samples: VecDeque<ChunkSample>,
    /// Maximum window size for samples
    window_size: usize,
    /// Whether metrics have been initialized with first sample
    initialized: bool,
}

impl Default for TransferMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_EWMA_ALPHA, DEFAULT_WINDOW_SIZE)
    }
}

impl TransferMetrics {
    pub fn new(alpha: f64, window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            alpha,
            ewma_latency_ms: 0.0,
            samples: VecDeque::with_capacity(window_size),
            window_size,
            initialized: false,
        }
    }

    /// Record a confirmed chunk
    pub fn record(&mut self, sample: ChunkSample) {
        let latency = sample.elapsed.as_secs_f64() * 1000.0;
        if !self.initialized {
            self.ewma_latency_ms = latency;
            self.initialized = true;
        } else {
            self.ewma_latency_ms = self.alpha * latency + (1.0 - self.alpha) * self.ewma_latency_ms;
        }

        if self.samples.len() >= self.window_size {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);

        debug!(
            "Chunk sample: {} bytes in {:.0}ms (ewma={:.0}ms)",
            sample.bytes, latency, self.ewma_latency_ms
        );
    }

    /// Current EWMA latency, `None` before the first sample
    pub fn ewma_latency_ms(&self) -> Option<f64> {
        self.initialized.then_some(self.ewma_latency_ms)
    }

    /// Bytes per second over the sample window, `None` without usable samples
    pub fn bytes_per_sec(&self) -> Option<u64> {
        let bytes: u64 = self.samples.iter().map(|s| s.bytes).sum();
        let secs: f64 = self.samples.iter().map(|s| s.elapsed.as_secs_f64()).sum();
        if secs <= 0.0 {
            return None;
        }
        Some((bytes as f64 / secs) as u64)
    }

    /// Get sample count
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
