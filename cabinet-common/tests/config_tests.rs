//! Tests for root folder resolution and config file loading
//!
//! Tests that manipulate CABINET_ROOT_FOLDER or CABINET_CONFIG are marked
//! #[serial] so they never run in parallel.

use cabinet_common::config::{
    database_path, default_root_folder, resolve_root_folder, TomlConfig, CONFIG_FILE_ENV,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = resolve_root_folder(None, &TomlConfig::default());

    assert!(!root_folder.as_os_str().is_empty());
    assert_eq!(root_folder, default_root_folder());
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/cabinet-env");
    let toml = TomlConfig::from_toml_str(r#"root_folder = "/tmp/cabinet-toml""#).unwrap();

    let root_folder = resolve_root_folder(Some(Path::new("/tmp/cabinet-cli")), &toml);
    assert_eq!(root_folder, PathBuf::from("/tmp/cabinet-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_overrides_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/cabinet-env");
    let toml = TomlConfig::from_toml_str(r#"root_folder = "/tmp/cabinet-toml""#).unwrap();

    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/tmp/cabinet-env"));

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/tmp/cabinet-toml"));
}

#[test]
fn test_database_path_inside_root() {
    assert_eq!(
        database_path(Path::new("/srv/cabinet")),
        PathBuf::from("/srv/cabinet/cabinet.db")
    );
}

#[test]
#[serial]
fn test_load_explicit_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
        root_folder = "/srv/cabinet"
        log_level = "debug"

        [import]
        batch_size = 250
        source_dir = "/srv/exports"
        "#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/cabinet")));
    assert_eq!(config.log_level.as_deref(), Some("debug"));
    assert_eq!(config.import.batch_size, Some(250));
    assert_eq!(config.import.progress_interval, None);
    assert_eq!(config.import.source_dir, Some(PathBuf::from("/srv/exports")));
}

#[test]
#[serial]
fn test_missing_explicit_config_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = TomlConfig::load(Some(&temp_dir.path().join("absent.toml")));
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_config_env_var_used_when_no_explicit_path() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("env.toml");
    std::fs::write(&config_path, "log_level = \"warn\"\n").unwrap();

    env::set_var(CONFIG_FILE_ENV, &config_path);
    let config = TomlConfig::load(None).unwrap();
    env::remove_var(CONFIG_FILE_ENV);

    assert_eq!(config.log_level.as_deref(), Some("warn"));
}
