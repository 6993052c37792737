use crate::config::{BridgeConfig, CONFIG_TEMP_FILE_NAME, DEFAULT_PORT};
use crate::error::config::ConfigError;

use tempfile::TempDir;

#[test]
fn given_missing_file_when_loaded_then_defaults() {
    // GIVEN: An empty config directory
    let dir = TempDir::new().expect("temp dir");

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).expect("load succeeds");

    // THEN: Defaults are used
    assert_eq!(config, BridgeConfig::default());
    assert_eq!(config.server.port, DEFAULT_PORT);
    assert!(config.server.loopback_only);
    assert_eq!(config.server.bind_address(), "127.0.0.1:19876");
}

/// **VALUE**: Verifies a saved config loads back unchanged.
///
/// **BUG THIS CATCHES**: Would catch a renamed serde field silently resetting
/// user settings to defaults.
#[test]
fn given_saved_config_when_loaded_then_equal() {
    // GIVEN: A non-default config saved to disk
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.server.port = 0;
    config.server.loopback_only = false;
    config.limits.max_frame_bytes = 64 * 1024;
    config.save(dir.path()).expect("save succeeds");

    // WHEN: Loading it back
    let loaded = BridgeConfig::load(dir.path()).expect("load succeeds");

    // THEN: Every field survives and no temp file is left behind
    assert_eq!(loaded, config);
    assert_eq!(CONFIG_TEMP_FILE_NAME, "callmux.json.tmp");
    assert!(!dir.path().join(CONFIG_TEMP_FILE_NAME).exists());
}

#[test]
fn given_partial_file_when_loaded_then_missing_fields_defaulted() {
    // GIVEN: A file that only sets the port
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("callmux.json"), r#"{"server": {"port": 4000}}"#)
        .expect("write config");

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).expect("load succeeds");

    // THEN: The port is taken, everything else defaults
    assert_eq!(config.server.port, 4000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.limits, BridgeConfig::default().limits);
}

#[test]
fn given_invalid_json_when_loaded_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("callmux.json"), "{ not json").expect("write config");

    let result = BridgeConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

/// **VALUE**: Verifies out-of-range frame limits are rejected on load.
///
/// **WHY THIS MATTERS**: A zero limit would make every frame "too large" and
/// silently drop all traffic.
#[test]
fn given_frame_limit_out_of_range_when_validated_then_validation_error() {
    // GIVEN: Limits below and above the accepted range
    let mut too_small = BridgeConfig::default();
    too_small.limits.max_frame_bytes = 16;
    let mut too_large = BridgeConfig::default();
    too_large.limits.max_frame_bytes = usize::MAX;

    // WHEN/THEN: Both are rejected
    assert!(matches!(too_small.validate(), Err(ConfigError::Validation { .. })));
    assert!(matches!(too_large.validate(), Err(ConfigError::Validation { .. })));
}

#[test]
fn given_empty_host_when_saved_then_validation_error_and_nothing_written() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.server.host = String::from("  ");

    let result = config.save(dir.path());

    assert!(matches!(result, Err(ConfigError::Validation { .. })));
    assert!(!dir.path().join("callmux.json").exists());
}

#[test]
fn given_future_version_when_validated_then_validation_error() {
    let mut config = BridgeConfig::default();
    config.version = 99;

    assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));
}
