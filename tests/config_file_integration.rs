// Configuration files as the CLI loads them
// WHY: Partial files must keep defaults and bad files must fail before any model call

use promoscan::{ClassifierConfig, ConfigError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_partial_config_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("promoscan.toml");
    fs::write(
        &path,
        r#"
debug = true

[model]
base_url = "http://localhost:11434"
model = "llama3"
timeout_ms = 5000

[batching]
max_concurrent_batches = 4
"#,
    )
    .expect("Failed to write config file");

    let config = ClassifierConfig::load(&path).expect("Config should load");
    assert!(config.debug);
    assert_eq!(config.model.base_url, "http://localhost:11434");
    assert_eq!(config.model.model, "llama3");
    assert_eq!(config.model.timeout().as_millis(), 5000);
    assert_eq!(config.batching.max_concurrent_batches, 4);
    // Untouched sections keep their defaults
    assert_eq!(config.batching.max_sentences_per_batch, 20);
    assert_eq!(config.retry.max_attempts, 3);
    assert!(config.model.api_key.is_none());
}

#[test]
fn test_missing_file_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("absent.toml");

    match ClassifierConfig::load(&path) {
        Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("bad.toml");
    fs::write(&path, "[batching]\nmax_concurrent_batches = 0\n").expect("Failed to write config file");

    assert!(matches!(ClassifierConfig::load(&path), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_api_key_is_never_written_back() {
    let mut config = ClassifierConfig::default();
    config.model.api_key = Some("secret".to_string());
    let rendered = toml::to_string(&config).expect("Config should serialize");
    assert!(!rendered.contains("secret"));
}
