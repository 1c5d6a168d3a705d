//! Upload session orchestrator - drives the chunked transfer loop

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use super::control::PauseToken;
use super::state::{ProgressSnapshot, SessionRecord, SessionState};
use crate::config::Config;
use crate::error::UploadError;
use crate::protocol::{build_client, ChunkTransferClient, RetryPolicy, SessionInitiator};
use crate::strategy::{AdaptiveSizingController, ChunkSample};
use crate::target::UploadTarget;

/// How a run of the transfer loop ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every byte is confirmed by the server
    Completed { resource_id: String, file_size: u64 },
    /// Stopped at a chunk boundary on request; `resume()` continues
    Paused { resource_id: String, offset: u64 },
}

/// One resumable upload of one target
pub struct UploadSession {
    config: Arc<Config>,
    target: UploadTarget,
    initiator: SessionInitiator,
    transfer_client: ChunkTransferClient,
    retry_policy: RetryPolicy,
    sizing: AdaptiveSizingController,
    record: SessionRecord,
    pause: PauseToken,
    progress_tx: watch::Sender<ProgressSnapshot>,
}

impl UploadSession {
    /// Create an idle session for `target`
    pub fn new(config: Arc<Config>, target: UploadTarget) -> Result<Self, UploadError> {
        let client = build_client()?;
        let sizing = AdaptiveSizingController::new(!config.no_adaptive);
        let record = SessionRecord::new(
            target.file_size(),
            sizing.initial_size(config.initial_chunk_size),
        );
        let (progress_tx, _) = watch::channel(record.snapshot());

        Ok(Self {
            initiator: SessionInitiator::new(client.clone(), config.clone()),
            transfer_client: ChunkTransferClient::new(client, config.clone()),
            retry_policy: RetryPolicy::new(config.max_retries),
            sizing,
            record,
            pause: PauseToken::new(),
            progress_tx,
            config,
            target,
        })
    }

    /// Continue an existing remote resource from the offset the server reports.
    ///
    /// The returned session is `Paused`; call `resume()` to transfer.
    pub async fn reattach(
        config: Arc<Config>,
        target: UploadTarget,
        resource_id: impl Into<String>,
    ) -> Result<Self, UploadError> {
        let resource_id = resource_id.into();
        let mut session = Self::new(config, target)?;
        session.record.transition(SessionState::Initiating, "reattach")?;
        session.publish();

        match session
            .initiator
            .probe_offset(&resource_id, session.target.file_size())
            .await
        {
            Ok(offset) => {
                session.record.resource_id = Some(resource_id);
                session.record.offset = offset;
                session.record.transition(SessionState::Paused, "reattach")?;
                session.publish();
                Ok(session)
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    /// Create the remote resource and transfer until completion, pause or failure
    pub async fn start(&mut self) -> Result<SessionOutcome, UploadError> {
        self.record.transition(SessionState::Initiating, "start")?;
        self.publish();

        let resource_id = match self.initiator.initiate(&self.target).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(e)),
        };

        self.record.resource_id = Some(resource_id);
        self.record.transition(SessionState::Transferring, "start")?;
        self.publish();

        self.run_transfer_loop().await
    }

    /// Continue a paused session from its last confirmed offset
    pub async fn resume(&mut self) -> Result<SessionOutcome, UploadError> {
        self.record.transition(SessionState::Transferring, "resume")?;
        self.pause.clear();
        info!(
            "Resuming upload {} at offset {}/{}",
            self.resource_id().unwrap_or_default(),
            self.record.offset,
            self.record.file_size
        );
        self.publish();

        self.run_transfer_loop().await
    }

    /// Request a pause at the next chunk boundary.
    ///
    /// While `start()`/`resume()` hold the session, pause through a
    /// [`PauseToken`] obtained from `pause_token()` instead.
    pub fn pause(&self) {
        self.pause.request();
    }

    /// Handle for requesting a pause from another task
    pub fn pause_token(&self) -> PauseToken {
        self.pause.clone()
    }

    /// Observe progress snapshots
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_tx.subscribe()
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn state(&self) -> SessionState {
        self.record.state
    }

    pub fn offset(&self) -> u64 {
        self.record.offset
    }

    pub fn chunk_size(&self) -> u64 {
        self.record.chunk_size
    }

    pub fn file_size(&self) -> u64 {
        self.record.file_size
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.record.resource_id.as_deref()
    }

    pub fn progress_percent(&self) -> u8 {
        self.record.progress_percent()
    }

    /// Reason the session failed, once `Failed`
    pub fn failure(&self) -> Option<&UploadError> {
        self.record.failure.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Transfer chunks until the offset reaches the file size or a pause lands
    async fn run_transfer_loop(&mut self) -> Result<SessionOutcome, UploadError> {
        loop {
            let resource_id = match self.record.resource_id.clone() {
                Some(id) => id,
                None => {
                    return Err(self.fail(UploadError::InvalidState {
                        operation: "transfer without a resource id",
                        state: self.record.state,
                    }))
                }
            };

            if self.record.is_complete() {
                self.record.transition(SessionState::Completed, "complete")?;
                info!(
                    "Upload {} complete ({} bytes)",
                    resource_id, self.record.file_size
                );
                self.publish();
                return Ok(SessionOutcome::Completed {
                    resource_id,
                    file_size: self.record.file_size,
                });
            }

            // Chunk boundary: the only point a pause takes effect
            if self.pause.is_requested() {
                self.record.transition(SessionState::Paused, "pause")?;
                info!(
                    "Upload {} paused at offset {}/{}",
                    resource_id, self.record.offset, self.record.file_size
                );
                self.publish();
                return Ok(SessionOutcome::Paused {
                    resource_id,
                    offset: self.record.offset,
                });
            }

            match self.transfer_next_chunk(self.record.clone(), &resource_id).await {
                Ok(next) => {
                    self.record = next;
                    self.publish();
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Transfer the chunk at `record.offset` and return the updated record
    async fn transfer_next_chunk(
        &self,
        mut record: SessionRecord,
        resource_id: &str,
    ) -> Result<SessionRecord, UploadError> {
        let offset = record.offset;
        let end = record.next_chunk_end();
        let bytes = self.target.read_range(offset, end).await?;

        let client = &self.transfer_client;
        let chunk = bytes.as_slice();
        let outcome = self
            .retry_policy
            .attempt(resource_id, offset, move |_attempt| {
                client.transfer(resource_id, offset, chunk)
            })
            .await?;

        record.retry_count = outcome.retries();
        let result = outcome.value;

        if record.apply_confirmed(&result) {
            record.retry_count = 0;
            record.stalled_chunks = 0;
        } else {
            record.stalled_chunks = record.stalled_chunks.saturating_add(1);
            if record.stalled_chunks > self.retry_policy.max_retries() {
                return Err(UploadError::RetryExhausted {
                    resource_id: resource_id.to_string(),
                    offset,
                    attempts: record.stalled_chunks,
                    last_error: "server did not advance the upload offset".to_string(),
                });
            }
        }

        record.metrics.record(ChunkSample {
            bytes: result.bytes_sent,
            elapsed: result.elapsed,
        });
        let (next_size, _) = self.sizing.adjust(record.chunk_size, result.elapsed);
        record.chunk_size = next_size;

        info!(
            "Uploaded {}..{} of {} ({}%), next chunk {}KB",
            offset,
            record.offset,
            record.file_size,
            record.progress_percent(),
            record.chunk_size / 1024
        );

        Ok(record)
    }

    /// Record a fatal error and move to `Failed`
    fn fail(&mut self, err: UploadError) -> UploadError {
        error!(
            "Upload {} failed at offset {}: {}",
            self.resource_id().unwrap_or("<none>"),
            self.record.offset,
            err
        );
        if let UploadError::RetryExhausted { .. } = &err {
            self.record.retry_count = self.retry_policy.max_retries();
        }
        self.record.state = SessionState::Failed;
        self.record.failure = Some(err.clone());
        self.publish();
        err
    }

    fn publish(&self) {
        self.progress_tx.send_replace(self.record.snapshot());
    }
}
