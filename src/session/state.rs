//! Session state record and progress snapshots

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::{OffsetParseError, UploadError};
use crate::protocol::ChunkResult;
use crate::strategy::TransferMetrics;

/// Lifecycle state of an upload session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Initiating,
    Transferring,
    Paused,
    Completed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initiating => write!(f, "initiating"),
            Self::Transferring => write!(f, "transferring"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl SessionState {
    /// No further progress is possible from this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine permits moving from `self` to `to`
    pub fn can_transition_to(&self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Initiating)
                | (Initiating, Transferring)
                | (Initiating, Paused)
                | (Initiating, Failed)
                | (Transferring, Paused)
                | (Transferring, Completed)
                | (Transferring, Failed)
                | (Paused, Transferring)
        )
    }
}

/// Owned state of one upload session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Remote resource id, set once by initiation
    pub resource_id: Option<String>,
    pub file_size: u64,
    /// Bytes confirmed by the server
    pub offset: u64,
    pub chunk_size: u64,
    pub state: SessionState,
    /// Re-attempts made for the chunk at the current offset
    pub retry_count: u32,
    /// Consecutive successful chunks that did not advance the offset
    pub stalled_chunks: u32,
    pub last_offset_error: Option<OffsetParseError>,
    pub failure: Option<UploadError>,
    pub metrics: TransferMetrics,
}

impl SessionRecord {
    pub fn new(file_size: u64, chunk_size: u64) -> Self {
        Self {
            resource_id: None,
            file_size,
            offset: 0,
            chunk_size,
            state: SessionState::Idle,
            retry_count: 0,
            stalled_chunks: 0,
            last_offset_error: None,
            failure: None,
            metrics: TransferMetrics::default(),
        }
    }

    /// Move to `to`, rejecting transitions the state machine does not allow
    pub fn transition(&mut self, to: SessionState, operation: &'static str) -> Result<(), UploadError> {
        if !self.state.can_transition_to(to) {
            return Err(UploadError::InvalidState {
                operation,
                state: self.state,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Exclusive end of the next chunk
    pub fn next_chunk_end(&self) -> u64 {
        self.offset
            .saturating_add(self.chunk_size)
            .min(self.file_size)
    }

    pub fn is_complete(&self) -> bool {
        self.offset == self.file_size
    }

    /// Rounded progress percentage
    pub fn progress_percent(&self) -> u8 {
        if self.file_size == 0 {
            return 0;
        }
        ((self.offset as f64 / self.file_size as f64) * 100.0).round() as u8
    }

    /// Adopt the offset confirmed by a successful chunk.
    ///
    /// The offset never regresses and never passes `file_size`; an unusable
    /// value is replaced and reported as a soft error. Returns whether the
    /// offset advanced.
    pub fn apply_confirmed(&mut self, result: &ChunkResult) -> bool {
        let prior = self.offset;
        let chunk_end = (result.offset + result.bytes_sent).min(self.file_size);
        let confirmed = result.confirmed_offset;

        let (new_offset, soft_error) = if confirmed < prior {
            (
                prior,
                Some(OffsetParseError {
                    reported: Some(confirmed.to_string()),
                    prior,
                    fallback: prior,
                }),
            )
        } else if confirmed > self.file_size {
            (
                chunk_end,
                Some(OffsetParseError {
                    reported: Some(confirmed.to_string()),
                    prior,
                    fallback: chunk_end,
                }),
            )
        } else {
            (confirmed, result.offset_error.clone())
        };

        if let Some(err) = &soft_error {
            if result.offset_error.as_ref() != Some(err) {
                warn!("{}", err);
            }
            self.last_offset_error = Some(err.clone());
        }

        self.offset = new_offset;
        new_offset > prior
    }

    /// Snapshot for observers
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            state: self.state,
            resource_id: self.resource_id.clone(),
            offset: self.offset,
            file_size: self.file_size,
            chunk_size: self.chunk_size,
            percent: self.progress_percent(),
            ewma_latency_ms: self.metrics.ewma_latency_ms(),
            bytes_per_sec: self.metrics.bytes_per_sec(),
            failure: self.failure.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Read-only view of a session published to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub state: SessionState,
    pub resource_id: Option<String>,
    pub offset: u64,
    pub file_size: u64,
    pub chunk_size: u64,
    pub percent: u8,
    pub ewma_latency_ms: Option<f64>,
    pub bytes_per_sec: Option<u64>,
    /// Failure reason once the session is `Failed`
    pub failure: Option<String>,
}
