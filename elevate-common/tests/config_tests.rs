//! Configuration resolution tests
//!
//! Tests that touch ELEVATE_CONFIG are marked #[serial] so they never run
//! alongside each other.

use elevate_common::config::{CompiledDefaults, ReconcileOverrides, ReconcileToml, TomlConfig, CONFIG_ENV_VAR};
use elevate_common::reconcile::{ReconcileError, RewriteTarget, TargetForm};
use elevate_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const SAMPLE: &str = r#"
database_path = "/srv/elevate/elevate.db"
port = 8080

[reconcile]
stale_host = "192.168.0.100:5000"
production_origin = "https://example-host.test"
target_form = "production-absolute"
store_timeout_ms = 2500
"#;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(defaults.port, 5000);
    assert_eq!(defaults.uploads_segment, "uploads");
    assert_eq!(defaults.target_form, TargetForm::RootRelative);
    assert!(!defaults.database_path.as_os_str().is_empty());
}

#[test]
fn test_parse_full_config() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::from_file(&write_config(&dir, SAMPLE)).unwrap();

    assert_eq!(config.port, Some(8080));
    assert_eq!(config.database_path, Some(PathBuf::from("/srv/elevate/elevate.db")));
    assert_eq!(config.reconcile.target_form, Some(TargetForm::ProductionAbsolute));
    assert_eq!(config.reconcile.store_timeout_ms, Some(2500));
    assert_eq!(config.reconcile.uploads_segment, None);
}

#[test]
fn test_empty_config_is_valid() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::from_file(&write_config(&dir, "")).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[reconcile]\ntarget_form = \"sideways\"\n");
    let err = TomlConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
}

#[test]
#[serial]
fn test_load_uses_env_var_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, SAMPLE);
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = TomlConfig::load(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.unwrap().port, Some(8080));
}

#[test]
#[serial]
fn test_explicit_missing_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let err = TomlConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
    assert!(matches!(err, Error::ConfigRead { .. }));
}

#[test]
fn test_cli_beats_toml_beats_default() {
    let config = TomlConfig {
        port: Some(8080),
        ..Default::default()
    };
    assert_eq!(config.resolve_port(Some(9000)), 9000);
    assert_eq!(config.resolve_port(None), 8080);
    assert_eq!(TomlConfig::default().resolve_port(None), 5000);

    assert_eq!(
        config.resolve_database_path(Some(PathBuf::from("/tmp/x.db"))),
        PathBuf::from("/tmp/x.db")
    );
}

#[test]
fn test_reconcile_overrides_merge_with_toml() {
    let toml = ReconcileToml {
        stale_host: Some("192.168.0.100:5000".to_string()),
        production_origin: Some("https://example-host.test".to_string()),
        target_form: Some(TargetForm::ProductionAbsolute),
        uploads_segment: None,
        store_timeout_ms: Some(2500),
    };

    let settings = ReconcileOverrides::default().resolve(&toml).unwrap();
    assert_eq!(settings.target_form(), TargetForm::ProductionAbsolute);
    assert_eq!(settings.uploads_segment(), "uploads");
    assert_eq!(settings.store_timeout(), Duration::from_millis(2500));

    let overridden = ReconcileOverrides {
        target_form: Some(TargetForm::RootRelative),
        uploads_segment: Some("media".to_string()),
        ..Default::default()
    }
    .resolve(&toml)
    .unwrap();
    assert_eq!(
        overridden.rewrite_target(),
        RewriteTarget::RootRelative {
            uploads_segment: "media".to_string()
        }
    );
}

#[test]
fn test_missing_stale_host_is_invalid_configuration() {
    let err = ReconcileOverrides::default()
        .resolve(&ReconcileToml::default())
        .unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidConfiguration(_)));
}
