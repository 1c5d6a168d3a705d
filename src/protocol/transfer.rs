//! Single chunk transfer over PATCH

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::common::{
    apply_headers, base_headers, describe_send_error, parse_upload_offset, send_logged,
    HEADER_UPLOAD_OFFSET, OFFSET_OCTET_STREAM,
};
use crate::config::Config;
use crate::error::{OffsetParseError, UploadError};
use crate::http_logger;

/// Outcome of one chunk attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkResult {
    /// Offset the chunk was sent at
    pub offset: u64,
    pub bytes_sent: u64,
    /// Offset reported by the server (or the computed fallback)
    pub confirmed_offset: u64,
    /// Wall-clock duration of the request
    pub elapsed: Duration,
    /// Always `true` on a returned result; failed attempts surface as `Err`
    pub succeeded: bool,
    /// Set when the confirmed offset is the computed fallback
    pub offset_error: Option<OffsetParseError>,
}

/// Resolve the confirmed offset from the response header.
///
/// A missing or unparsable header is not a failure: the server is assumed
/// to have accepted the whole chunk.
pub(crate) fn confirmed_offset(
    raw: Option<&str>,
    offset: u64,
    bytes_sent: u64,
) -> (u64, Option<OffsetParseError>) {
    match parse_upload_offset(raw) {
        Some(value) => (value, None),
        None => {
            let fallback = offset + bytes_sent;
            (
                fallback,
                Some(OffsetParseError {
                    reported: raw.map(|v| v.to_string()),
                    prior: offset,
                    fallback,
                }),
            )
        }
    }
}

/// Performs single-attempt chunk transfers; no retry, no sizing policy
#[derive(Clone)]
pub struct ChunkTransferClient {
    client: Client,
    config: Arc<Config>,
}

impl ChunkTransferClient {
    pub fn new(client: Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Send `bytes` as the range starting at `offset` of resource `resource_id`
    pub async fn transfer(
        &self,
        resource_id: &str,
        offset: u64,
        bytes: &[u8],
    ) -> Result<ChunkResult, UploadError> {
        let bytes_sent = bytes.len() as u64;
        let url = self.config.resource_url(resource_id);

        let mut headers = base_headers(&self.config);
        headers.push(("Content-Type", OFFSET_OCTET_STREAM.to_string()));
        headers.push((HEADER_UPLOAD_OFFSET, offset.to_string()));

        let request_log = http_logger::build_request_log_if_enabled(
            "PATCH",
            &url,
            &headers,
            Some(http_logger::binary_body_placeholder(bytes.len())),
        );

        // Content-Length is set by the client from the exact body length
        let builder = apply_headers(self.client.patch(&url), &headers)
            .timeout(self.config.attempt_timeout())
            .body(bytes.to_vec());

        let (result, elapsed) = send_logged(builder, request_log).await;

        let response = result.map_err(|e| {
            UploadError::transfer(
                offset,
                None,
                describe_send_error(&e, self.config.attempt_timeout_secs),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UploadError::transfer(
                offset,
                Some(status.as_u16()),
                format!("HTTP {} {}", status, text).trim_end().to_string(),
            ));
        }

        let raw = response
            .headers()
            .get(HEADER_UPLOAD_OFFSET)
            .and_then(|v| v.to_str().ok());
        let (confirmed, offset_error) = confirmed_offset(raw, offset, bytes_sent);

        if let Some(err) = &offset_error {
            warn!("Resource {}: {}", resource_id, err);
        }

        debug!(
            "Chunk {}..{} of {} confirmed at {} in {}ms",
            offset,
            offset + bytes_sent,
            resource_id,
            confirmed,
            elapsed.as_millis()
        );

        Ok(ChunkResult {
            offset,
            bytes_sent,
            confirmed_offset: confirmed,
            elapsed,
            succeeded: true,
            offset_error,
        })
    }
}
