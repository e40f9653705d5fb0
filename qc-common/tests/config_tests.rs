//! Tests for bootstrap configuration loading and database path resolution
//!
//! Tests that manipulate QC_INDEX_DB / QC_INDEX_CONFIG are marked #[serial]
//! so they never race on the process environment.

use qc_common::config::{
    default_database_path, resolve_database_path, TomlConfig, CONFIG_ENV_VAR, DATABASE_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let config = TomlConfig::load(&temp_dir.path().join("absent.toml")).unwrap();

    assert!(config.database_path.is_none());
    assert_eq!(config.busy_timeout_ms, 5000);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_file_values_are_read() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
database_path = "/data/qc/index.db"
busy_timeout_ms = 250

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();

    assert_eq!(config.database_path, Some(PathBuf::from("/data/qc/index.db")));
    assert_eq!(config.busy_timeout_ms, 250);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "database_path = [").unwrap();

    let result = TomlConfig::load(&path);

    assert!(matches!(result, Err(qc_common::Error::Toml { .. })));
}

#[test]
fn test_unknown_log_level_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

    let result = TomlConfig::load(&path);

    assert!(matches!(result, Err(qc_common::Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(DATABASE_ENV_VAR, "/tmp/qc-env.db");
    let config = TomlConfig {
        database_path: Some(PathBuf::from("/tmp/qc-toml.db")),
        ..TomlConfig::default()
    };

    let resolved = resolve_database_path(Some(Path::new("/tmp/qc-cli.db")), &config);

    assert_eq!(resolved, PathBuf::from("/tmp/qc-cli.db"));
    env::remove_var(DATABASE_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(DATABASE_ENV_VAR, "/tmp/qc-env.db");
    let config = TomlConfig {
        database_path: Some(PathBuf::from("/tmp/qc-toml.db")),
        ..TomlConfig::default()
    };

    let resolved = resolve_database_path(None, &config);

    assert_eq!(resolved, PathBuf::from("/tmp/qc-env.db"));
    env::remove_var(DATABASE_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_then_compiled_default() {
    env::remove_var(DATABASE_ENV_VAR);

    let config = TomlConfig {
        database_path: Some(PathBuf::from("/tmp/qc-toml.db")),
        ..TomlConfig::default()
    };
    assert_eq!(
        resolve_database_path(None, &config),
        PathBuf::from("/tmp/qc-toml.db")
    );

    let resolved = resolve_database_path(None, &TomlConfig::default());
    assert_eq!(resolved, default_database_path());
}

#[test]
#[serial]
fn test_config_env_var_points_at_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("from-env.toml");
    std::fs::write(&path, "busy_timeout_ms = 42\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = TomlConfig::load_default(None).unwrap();

    assert_eq!(config.busy_timeout_ms, 42);
    env::remove_var(CONFIG_ENV_VAR);
}
