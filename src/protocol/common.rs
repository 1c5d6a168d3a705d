//! Common constants and helpers for protocol requests

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response};
use uuid::Uuid;

use crate::config::Config;
use crate::error::UploadError;
use crate::http_logger::{self, HttpRequestLog};

/// Protocol version sent on every request
pub const TUS_VERSION: &str = "1.0.0";

pub const HEADER_TUS_RESUMABLE: &str = "Tus-Resumable";
pub const HEADER_UPLOAD_LENGTH: &str = "Upload-Length";
pub const HEADER_UPLOAD_OFFSET: &str = "Upload-Offset";

/// Content type of chunk bodies
pub const OFFSET_OCTET_STREAM: &str = "application/offset+octet-stream";

/// User-Agent header value
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by initiation and transfer.
///
/// Timeouts are applied per request, never on the client.
pub fn build_client() -> Result<Client, UploadError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| UploadError::Client {
            message: e.to_string(),
        })
}

/// Generate a unique request ID
fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Headers common to every protocol request
pub(crate) fn base_headers(config: &Config) -> Vec<(&'static str, String)> {
    let mut headers = vec![
        (HEADER_TUS_RESUMABLE, TUS_VERSION.to_string()),
        ("x-request-id", generate_request_id()),
    ];
    if let Some(token) = &config.token {
        headers.push(("Authorization", format!("Bearer {}", token)));
    }
    headers
}

/// Apply a header list to a request builder
pub(crate) fn apply_headers(
    mut builder: RequestBuilder,
    headers: &[(&'static str, String)],
) -> RequestBuilder {
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    builder
}

/// Send a request, recording it in the HTTP log when enabled.
///
/// The returned duration covers the request only, not the log write.
pub(crate) async fn send_logged(
    builder: RequestBuilder,
    log: Option<HttpRequestLog>,
) -> (Result<Response, reqwest::Error>, Duration) {
    let started = Instant::now();
    let result = builder.send().await;
    let elapsed = started.elapsed();

    if let Some(request_log) = log {
        let duration_ms = elapsed.as_millis() as u64;
        match &result {
            Ok(response) => http_logger::log_request(
                &request_log,
                Some(&http_logger::response_log(response)),
                duration_ms,
                None,
            ),
            Err(e) => {
                http_logger::log_request(&request_log, None, duration_ms, Some(&e.to_string()))
            }
        }
    }

    (result, elapsed)
}

/// Describe a transport error for logs and error messages
pub(crate) fn describe_send_error(e: &reqwest::Error, timeout_secs: u64) -> String {
    if e.is_timeout() {
        format!("request timed out after {}s", timeout_secs)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Parse an `Upload-Offset` header value
pub fn parse_upload_offset(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

/// Derive the resource id from a `Location` header.
///
/// Accepts a bare id, a path or an absolute URL; the id is the last
/// non-empty path segment with any query or fragment removed.
pub fn resource_id_from_location(location: &str) -> Option<String> {
    let location = location.trim();
    let location = location.split(['?', '#']).next().unwrap_or_default();

    location
        .split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
        .filter(|segment| !segment.ends_with(':'))
        .map(|segment| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_logger::binary_body_placeholder;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_logged_measures_request_time() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(200)))
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let url = format!("{}/upload/abc123", server.uri());
        let log = HttpRequestLog {
            method: "PATCH".to_string(),
            url: url.clone(),
            headers: Vec::new(),
            body: Some(binary_body_placeholder(4)),
        };

        let builder = client.patch(&url).body(vec![0u8; 4]);
        let (result, elapsed) = send_logged(builder, Some(log)).await;

        assert_eq!(result.unwrap().status().as_u16(), 204);
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_resource_id_from_bare_id() {
        assert_eq!(
            resource_id_from_location("abc123"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_resource_id_from_path_and_url() {
        assert_eq!(
            resource_id_from_location("/upload/abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            resource_id_from_location("http://localhost:8082/upload/abc123/?x=1#f"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_resource_id_rejects_empty() {
        assert_eq!(resource_id_from_location(""), None);
        assert_eq!(resource_id_from_location("  /  "), None);
        assert_eq!(resource_id_from_location("http://"), None);
    }

    #[test]
    fn test_parse_upload_offset() {
        assert_eq!(parse_upload_offset(Some("1024")), Some(1024));
        assert_eq!(parse_upload_offset(Some(" 7 ")), Some(7));
        assert_eq!(parse_upload_offset(Some("-1")), None);
        assert_eq!(parse_upload_offset(Some("abc")), None);
        assert_eq!(parse_upload_offset(None), None);
    }
}
