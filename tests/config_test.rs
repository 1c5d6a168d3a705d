//! Tests for config module

use resumable_upload::config::{
    Config, ConfigOptions, DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_DESCRIPTION, DEFAULT_MAX_RETRIES,
};
use resumable_upload::strategy::{INITIAL_CHUNK, MAX_CHUNK, MIN_CHUNK};

fn test_config(endpoint: &str) -> Result<std::sync::Arc<Config>, anyhow::Error> {
    Config::new(endpoint.to_string(), ConfigOptions::default())
}

#[test]
fn test_config_new_with_valid_endpoint() {
    let config = test_config("https://api.example.com/files").unwrap();
    assert_eq!(config.endpoint, "https://api.example.com/files");
}

#[test]
fn test_config_keeps_plain_http() {
    let config = test_config("http://localhost:8082/upload").unwrap();
    assert_eq!(config.endpoint, "http://localhost:8082/upload");
}

#[test]
fn test_config_adds_https_prefix() {
    let config = test_config("api.example.com/files").unwrap();
    assert_eq!(config.endpoint, "https://api.example.com/files");
}

#[test]
fn test_config_removes_multiple_trailing_slashes() {
    let config = test_config("  https://api.example.com/files///  ").unwrap();
    assert_eq!(config.endpoint, "https://api.example.com/files");
}

#[test]
fn test_config_empty_endpoint_fails() {
    let config = test_config("   ");
    assert!(config.is_err());
    assert!(config.unwrap_err().to_string().contains("endpoint"));
}

#[test]
fn test_config_default_values() {
    let config = test_config("https://api.example.com/files").unwrap();
    assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    assert_eq!(config.attempt_timeout_secs, DEFAULT_ATTEMPT_TIMEOUT_SECS);
    assert_eq!(config.initial_chunk_size, INITIAL_CHUNK);
    assert!(!config.no_adaptive);
    assert!(config.token.is_none());
    assert_eq!(config.description, DEFAULT_DESCRIPTION);
    assert_eq!(config.distributor, "resumable-upload");
}

#[test]
fn test_config_with_custom_values() {
    let config = Config::new(
        "https://api.example.com/files".to_string(),
        ConfigOptions {
            token: Some(" secret ".to_string()),
            max_retries: Some(5),
            attempt_timeout_secs: Some(10),
            initial_chunk_size: Some(128 * 1024),
            no_adaptive: true,
            description: Some("Holiday video".to_string()),
            distributor: Some("Desktop".to_string()),
        },
    )
    .unwrap();
    assert_eq!(config.token.as_deref(), Some("secret"));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.attempt_timeout_secs, 10);
    assert_eq!(config.initial_chunk_size, 128 * 1024);
    assert!(config.no_adaptive);
    assert_eq!(config.description, "Holiday video");
    assert_eq!(config.distributor, "Desktop");
}

#[test]
fn test_config_blank_token_is_dropped() {
    let config = Config::new(
        "https://api.example.com/files".to_string(),
        ConfigOptions {
            token: Some("   ".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(config.token.is_none());
}

#[test]
fn test_config_clamps_initial_chunk_size() {
    let small = Config::new(
        "https://api.example.com/files".to_string(),
        ConfigOptions {
            initial_chunk_size: Some(1),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(small.initial_chunk_size, MIN_CHUNK);

    let large = Config::new(
        "https://api.example.com/files".to_string(),
        ConfigOptions {
            initial_chunk_size: Some(100 * 1024 * 1024),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(large.initial_chunk_size, MAX_CHUNK);
}

#[test]
fn test_config_zero_timeout_fails() {
    let config = Config::new(
        "https://api.example.com/files".to_string(),
        ConfigOptions {
            attempt_timeout_secs: Some(0),
            ..Default::default()
        },
    );
    assert!(config.is_err());
    assert!(config.unwrap_err().to_string().contains("timeout"));
}

#[test]
fn test_config_options_default() {
    let options = ConfigOptions::default();
    assert!(options.token.is_none());
    assert!(options.max_retries.is_none());
    assert!(options.attempt_timeout_secs.is_none());
    assert!(options.initial_chunk_size.is_none());
    assert!(!options.no_adaptive);
}
