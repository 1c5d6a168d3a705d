//! Adaptive chunk sizing module
//!
//! Doubles the chunk size when chunks land quickly and halves it when they
//! are slow, with a dead band in between. Also tracks smoothed latency and
//! throughput for progress reporting.

mod adaptive;
mod metrics;

pub use adaptive::{
    next_size, AdaptiveSizingController, SizeAdjustment, INITIAL_CHUNK, MAX_CHUNK, MIN_CHUNK,
};
pub use metrics::{ChunkSample, TransferMetrics};
