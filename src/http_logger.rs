//! HTTP Request Logger
//!
//! Appends every upload protocol exchange to a file when enabled via
//! environment variable. Set `TUS_HTTP_LOG=1` or `TUS_HTTP_LOG=true` to enable.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::Local;
use tracing::warn;

/// Environment variable to control HTTP logging
const ENV_HTTP_LOG: &str = "TUS_HTTP_LOG";

/// Directory the log file lives in, relative to the working directory
const LOG_DIR_NAME: &str = ".tus-upload";

/// Log file name
const LOG_FILE_NAME: &str = "http_requests.log";

/// Maximum body size to log (10KB)
const MAX_BODY_SIZE: usize = 10000;

/// Sensitive headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "set-cookie",
    "cookie",
    "x-api-key",
    "x-auth-token",
    "proxy-authorization",
];

/// Global mutex for thread-safe log writing
static LOG_MUTEX: Mutex<()> = Mutex::new(());

/// Check if HTTP logging is enabled
pub fn is_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var(ENV_HTTP_LOG)
            .map(|v| {
                let v = v.trim().to_lowercase();
                v == "1" || v == "true" || v == "yes" || v == "on"
            })
            .unwrap_or(false)
    })
}

/// Get log file path, creating the log directory if needed
fn get_log_file_path() -> PathBuf {
    let log_dir = PathBuf::from(LOG_DIR_NAME);
    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(&log_dir) {
            warn!("Failed to create {} directory: {}", LOG_DIR_NAME, e);
        }
    }
    log_dir.join(LOG_FILE_NAME)
}

/// HTTP request log entry
pub struct HttpRequestLog {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// HTTP response log entry
pub struct HttpResponseLog {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

/// Log an HTTP request and its response or error
pub fn log_request(
    request: &HttpRequestLog,
    response: Option<&HttpResponseLog>,
    duration_ms: u64,
    error: Option<&str>,
) {
    if !is_enabled() {
        return;
    }

    let log_content = render_entry(request, response, duration_ms, error);

    if let Err(e) = write_log(&get_log_file_path(), &log_content) {
        warn!("Failed to write HTTP log: {}", e);
    }
}

/// Render one log entry
pub fn render_entry(
    request: &HttpRequestLog,
    response: Option<&HttpResponseLog>,
    duration_ms: u64,
    error: Option<&str>,
) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let separator = "=".repeat(80);

    let mut log_content = String::new();
    log_content.push_str(&format!(
        "\n{}\n[{}] {} {}\n{}\n",
        separator, timestamp, request.method, request.url, separator
    ));

    log_content.push_str("\n--- Request Headers ---\n");
    for (name, value) in &request.headers {
        let display_value = mask_sensitive_header(name, value);
        log_content.push_str(&format!("{}: {}\n", name, display_value));
    }

    if let Some(body) = &request.body {
        log_content.push_str("\n--- Request Body ---\n");
        log_content.push_str(&format_body(body));
        log_content.push('\n');
    }

    if let Some(resp) = response {
        log_content.push_str(&format!("\n--- Response ({}ms) ---\n", duration_ms));
        log_content.push_str(&format!("Status: {}\n", resp.status));

        log_content.push_str("\n--- Response Headers ---\n");
        for (name, value) in &resp.headers {
            let display_value = mask_sensitive_header(name, value);
            log_content.push_str(&format!("{}: {}\n", name, display_value));
        }
    }

    if let Some(err) = error {
        log_content.push_str(&format!("\n--- Error ({}ms) ---\n", duration_ms));
        log_content.push_str(err);
        log_content.push('\n');
    }

    log_content.push_str(&format!("\n{}\n", separator));
    log_content
}

/// Write log content to file (thread-safe)
fn write_log(path: &Path, content: &str) -> std::io::Result<()> {
    // Acquire lock to prevent interleaved writes from concurrent sessions
    let _guard = LOG_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Check if a header is sensitive and should be masked
pub fn is_sensitive_header(name: &str) -> bool {
    let name_lower = name.to_lowercase();
    SENSITIVE_HEADERS.iter().any(|h| name_lower == *h)
}

/// Mask sensitive header values
fn mask_sensitive_header(name: &str, value: &str) -> String {
    if is_sensitive_header(name) {
        mask_token(value)
    } else {
        value.to_string()
    }
}

/// Mask a credential, keeping four characters at each end of long values
pub fn mask_token(value: &str) -> String {
    let (prefix, secret) = match value.strip_prefix("Bearer ") {
        Some(token) => ("Bearer ", token),
        None => ("", value),
    };

    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}...{}", prefix, head, tail)
    } else {
        format!("{}****", prefix)
    }
}

/// Format body for logging with truncation (UTF-8 safe)
fn format_body(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let pretty = serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.to_string());
        truncate_utf8_safe(&pretty, MAX_BODY_SIZE)
    } else {
        truncate_utf8_safe(body, MAX_BODY_SIZE)
    }
}

/// Truncate string at UTF-8 character boundary (safe for multi-byte chars)
pub fn truncate_utf8_safe(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...\n[truncated, total {} bytes]", &s[..end], s.len())
}

/// Placeholder logged instead of raw chunk bytes
pub fn binary_body_placeholder(len: usize) -> String {
    format!("<{} bytes of application/offset+octet-stream>", len)
}

/// Build a request log entry, or None if logging is disabled (for lazy evaluation)
pub fn build_request_log_if_enabled(
    method: &str,
    url: &str,
    headers: &[(&str, String)],
    body: Option<String>,
) -> Option<HttpRequestLog> {
    if !is_enabled() {
        return None;
    }

    Some(HttpRequestLog {
        method: method.to_string(),
        url: url.to_string(),
        headers: headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
        body,
    })
}

/// Extract response headers for logging
pub fn response_log(response: &reqwest::Response) -> HttpResponseLog {
    HttpResponseLog {
        status: response.status().as_u16(),
        headers: response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_utf8_safe_unicode() {
        let s = "你好世界Hello";
        let truncated = truncate_utf8_safe(s, 10);
        assert!(truncated.contains("..."));
        assert!(truncated.contains("[truncated"));
    }

    #[test]
    fn test_render_entry_masks_authorization() {
        let request = HttpRequestLog {
            method: "PATCH".to_string(),
            url: "http://localhost/upload/abc123".to_string(),
            headers: vec![
                ("Upload-Offset".to_string(), "0".to_string()),
                (
                    "Authorization".to_string(),
                    "Bearer abcdefghijklmnop".to_string(),
                ),
            ],
            body: Some(binary_body_placeholder(1024)),
        };
        let response = HttpResponseLog {
            status: 204,
            headers: vec![("upload-offset".to_string(), "1024".to_string())],
        };

        let entry = render_entry(&request, Some(&response), 12, None);

        assert!(entry.contains("PATCH http://localhost/upload/abc123"));
        assert!(entry.contains("Authorization: Bearer abcd...mnop"));
        assert!(!entry.contains("abcdefghijklmnop"));
        assert!(entry.contains("<1024 bytes"));
        assert!(entry.contains("Status: 204"));
        assert!(entry.contains("upload-offset: 1024"));
    }

    #[test]
    fn test_render_entry_with_error() {
        let request = HttpRequestLog {
            method: "POST".to_string(),
            url: "http://localhost/upload".to_string(),
            headers: Vec::new(),
            body: Some(r#"{"name":"clip.mp4"}"#.to_string()),
        };

        let entry = render_entry(&request, None, 30000, Some("operation timed out"));

        assert!(entry.contains("\"name\": \"clip.mp4\""));
        assert!(entry.contains("--- Error (30000ms) ---"));
        assert!(!entry.contains("--- Response"));
    }
}
