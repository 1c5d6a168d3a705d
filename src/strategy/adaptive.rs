//! Latency-driven chunk sizing with a hysteresis band

use std::time::Duration;

use tracing::info;

/// Smallest chunk the controller will shrink to (64KB)
pub const MIN_CHUNK: u64 = 64 * 1024;
/// Largest chunk the controller will grow to (1MB)
pub const MAX_CHUNK: u64 = 1024 * 1024;
/// Chunk size a fresh session starts with (256KB)
pub const INITIAL_CHUNK: u64 = 256 * 1024;
/// Below this latency the chunk size doubles
const FAST_THRESHOLD: Duration = Duration::from_millis(300);
/// Above this latency the chunk size halves
const SLOW_THRESHOLD: Duration = Duration::from_millis(800);

/// Direction of a chunk size change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeAdjustment {
    Grow,
    Shrink,
    NoChange,
}

/// Compute the chunk size to use after a chunk of `current_size` took `elapsed`.
///
/// Deterministic in its two inputs. Latencies between 300ms and 800ms
/// (inclusive) leave the size alone so borderline links do not oscillate.
pub fn next_size(current_size: u64, elapsed: Duration) -> u64 {
    if elapsed < FAST_THRESHOLD && current_size < MAX_CHUNK {
        current_size.saturating_mul(2).min(MAX_CHUNK)
    } else if elapsed > SLOW_THRESHOLD && current_size > MIN_CHUNK {
        (current_size / 2).max(MIN_CHUNK)
    } else {
        current_size
    }
}

/// Chunk size policy for one session
///
/// Holds no size of its own; the session record owns the current size and
/// passes it in after every confirmed chunk.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveSizingController {
    /// Whether latency feedback changes the size at all
    adaptive_enabled: bool,
}

impl AdaptiveSizingController {
    pub fn new(adaptive_enabled: bool) -> Self {
        Self { adaptive_enabled }
    }

    /// Whether the controller adapts to latency
    pub fn is_adaptive(&self) -> bool {
        self.adaptive_enabled
    }

    /// Size a session starts with for a requested size
    pub fn initial_size(&self, requested: u64) -> u64 {
        let chunk_size = requested.clamp(MIN_CHUNK, MAX_CHUNK);
        info!(
            "Chunk sizing initialized: size={}KB, adaptive={}",
            chunk_size / 1024,
            self.adaptive_enabled
        );
        chunk_size
    }

    /// Next size after a successful chunk of `current_size` took `elapsed`
    pub fn adjust(&self, current_size: u64, elapsed: Duration) -> (u64, SizeAdjustment) {
        if !self.adaptive_enabled {
            return (current_size, SizeAdjustment::NoChange);
        }

        let new_size = next_size(current_size, elapsed);
        let adjustment = match new_size.cmp(&current_size) {
            std::cmp::Ordering::Greater => SizeAdjustment::Grow,
            std::cmp::Ordering::Less => SizeAdjustment::Shrink,
            std::cmp::Ordering::Equal => SizeAdjustment::NoChange,
        };

        if adjustment != SizeAdjustment::NoChange {
            info!(
                "Chunk size {:?}: {}KB→{}KB (elapsed={}ms)",
                adjustment,
                current_size / 1024,
                new_size / 1024,
                elapsed.as_millis()
            );
        }

        (new_size, adjustment)
    }
}
