//! Unit tests for bootstrap configuration
//!
//! Tests the implementation of:
//! - TOML parsing with defaults for omitted fields
//! - Priority order for root folder resolution (CLI > env > TOML > default)
//! - Explicit vs default config file handling
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate WEBLABEL_ROOT_FOLDER are marked with #[serial].

use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use weblabel_common::config::{
    default_root_folder, load_bootstrap_config, load_toml_config, resolve_root_folder,
    LoggingConfig, TomlConfig, ROOT_FOLDER_ENV,
};

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert_eq!(config.port, 8080);
    assert_eq!(config.bind_address, "0.0.0.0");
    assert!(config.root_folder.is_none());
    assert!(config.static_assets.is_none());
    assert!(config.expected_aux_vectors.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_partial_toml_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
root_folder = "/data/recordings"
expected_aux_vectors = 2

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/data/recordings")));
    assert_eq!(config.expected_aux_vectors, Some(2));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.port, 8080);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "port = \"not a number\"").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Invalid TOML"));
}

#[test]
fn test_explicit_missing_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");
    assert!(load_bootstrap_config(Some(&missing)).is_err());
}

#[test]
fn test_logging_filter_directive() {
    let logging = LoggingConfig {
        level: "warn".to_string(),
    };
    assert_eq!(
        logging.filter_directive(),
        "weblabel_server=warn,weblabel_common=warn,tower_http=warn"
    );
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let root = resolve_root_folder(Some(Path::new("/from/cli")), &config);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(root, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let root = resolve_root_folder(None, &config);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(root, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_toml_beats_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_falls_back_to_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let root = resolve_root_folder(None, &TomlConfig::default());
    assert_eq!(root, default_root_folder());
    assert!(!root.as_os_str().is_empty());
}

#[test]
fn test_explicit_file_is_recorded_as_source() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "port = 9000\n").unwrap();

    let loaded = load_bootstrap_config(Some(&path)).unwrap();
    assert_eq!(loaded.source, Some(path));
    assert_eq!(loaded.toml.port, 9000);
}
