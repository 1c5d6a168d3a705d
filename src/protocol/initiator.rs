//! Upload resource creation and offset probing

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use super::common::{
    apply_headers, base_headers, describe_send_error, parse_upload_offset,
    resource_id_from_location, send_logged, HEADER_UPLOAD_LENGTH, HEADER_UPLOAD_OFFSET,
};
use crate::config::Config;
use crate::error::UploadError;
use crate::http_logger;
use crate::target::UploadTarget;

/// Creation request body
#[derive(Debug, Serialize)]
struct CreationRequest<'a> {
    name: &'a str,
    description: &'a str,
    distributor: &'a str,
    /// ISO-8601 timestamp of the request
    timeline: String,
}

/// Creates upload resources on the remote endpoint
#[derive(Clone)]
pub struct SessionInitiator {
    client: Client,
    config: Arc<Config>,
}

impl SessionInitiator {
    pub fn new(client: Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Create the upload resource for `target` and return its id.
    ///
    /// No retry at this layer: every failure is fatal for the session.
    pub async fn initiate(&self, target: &UploadTarget) -> Result<String, UploadError> {
        let file_size = target.file_size();
        if file_size == 0 {
            return Err(UploadError::initiation(
                None,
                "file size must be greater than zero",
            ));
        }

        let body = CreationRequest {
            name: target.name(),
            description: target
                .metadata_value("description")
                .unwrap_or(&self.config.description),
            distributor: target
                .metadata_value("distributor")
                .unwrap_or(&self.config.distributor),
            timeline: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let mut headers = base_headers(&self.config);
        headers.push((HEADER_UPLOAD_LENGTH, file_size.to_string()));
        headers.push(("Content-Type", "application/json".to_string()));

        let url = &self.config.endpoint;
        let request_log = http_logger::build_request_log_if_enabled(
            "POST",
            url,
            &headers,
            serde_json::to_string(&body).ok(),
        );

        let builder = apply_headers(self.client.post(url), &headers)
            .timeout(self.config.attempt_timeout())
            .json(&body);

        let (result, _) = send_logged(builder, request_log).await;
        let response = result.map_err(|e| {
            UploadError::initiation(
                None,
                describe_send_error(&e, self.config.attempt_timeout_secs),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Creation request rejected: {} {}", status, text);
            return Err(UploadError::initiation(
                Some(status.as_u16()),
                format!("HTTP {} {}", status, text).trim_end().to_string(),
            ));
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                UploadError::initiation(Some(status.as_u16()), "no Location header in response")
            })?;

        let resource_id = resource_id_from_location(location).ok_or_else(|| {
            UploadError::initiation(
                Some(status.as_u16()),
                format!("unusable Location header: {:?}", location),
            )
        })?;

        info!(
            "Created upload resource {} for {} ({} bytes)",
            resource_id,
            target.name(),
            file_size
        );

        Ok(resource_id)
    }

    /// Ask the server how many bytes of an existing resource it holds
    pub async fn probe_offset(&self, resource_id: &str, file_size: u64) -> Result<u64, UploadError> {
        let headers = base_headers(&self.config);
        let url = self.config.resource_url(resource_id);
        let request_log = http_logger::build_request_log_if_enabled("HEAD", &url, &headers, None);

        let builder =
            apply_headers(self.client.head(&url), &headers).timeout(self.config.attempt_timeout());

        let (result, _) = send_logged(builder, request_log).await;
        let response = result.map_err(|e| {
            UploadError::initiation(
                None,
                describe_send_error(&e, self.config.attempt_timeout_secs),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::initiation(
                Some(status.as_u16()),
                format!("HTTP {} probing resource {}", status, resource_id),
            ));
        }

        let raw = response
            .headers()
            .get(HEADER_UPLOAD_OFFSET)
            .and_then(|v| v.to_str().ok());
        let offset = parse_upload_offset(raw)
            .filter(|offset| *offset <= file_size)
            .ok_or_else(|| {
                UploadError::initiation(
                    Some(status.as_u16()),
                    format!("unusable Upload-Offset {:?} for resource {}", raw, resource_id),
                )
            })?;

        info!(
            "Resource {} holds {}/{} bytes",
            resource_id, offset, file_size
        );

        Ok(offset)
    }
}
