//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CABINET_ROOT_FOLDER";

/// Environment variable overriding the TOML config file location
pub const CONFIG_FILE_ENV: &str = "CABINET_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "cabinet.db";

/// Default number of records per bulk insert call
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Default number of records between progress lines
pub const DEFAULT_PROGRESS_INTERVAL: usize = 500;

/// Contents of the TOML config file
///
/// Every field is optional; absent values fall back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub import: ImportSection,
}

/// `[import]` table of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportSection {
    pub batch_size: Option<usize>,
    pub progress_interval: Option<usize>,
    pub source_dir: Option<PathBuf>,
}

/// Resolved import settings used by every job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Records per bulk insert call
    pub batch_size: usize,
    /// Records between progress log lines
    pub progress_interval: usize,
    /// Directory default source file names are resolved against
    pub source_dir: PathBuf,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            source_dir: PathBuf::from("."),
        }
    }
}

impl ImportSettings {
    /// Merge TOML values over compiled defaults, then command-line overrides over both
    pub fn resolve(
        toml: &TomlConfig,
        cli_batch_size: Option<usize>,
        cli_progress_interval: Option<usize>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let batch_size = cli_batch_size
            .or(toml.import.batch_size)
            .unwrap_or(defaults.batch_size);
        if batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than zero".to_string()));
        }

        let progress_interval = cli_progress_interval
            .or(toml.import.progress_interval)
            .unwrap_or(defaults.progress_interval);

        Ok(Self {
            batch_size,
            progress_interval,
            source_dir: toml
                .import
                .source_dir
                .clone()
                .unwrap_or(defaults.source_dir),
        })
    }

    /// Path of a source file: the explicit path if given, else `source_dir/default_name`
    pub fn source_path(&self, explicit: Option<&Path>, default_name: &str) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => self.source_dir.join(default_name),
        }
    }
}

impl TomlConfig {
    /// Load the config file
    ///
    /// An explicit path must exist. Without one, the env var and then the
    /// platform config location are tried; a missing file there is not an
    /// error and yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            return Self::from_file(Path::new(&path));
        }

        match default_config_file() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                warn!("Config file not found at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a config file that must exist
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Platform config file location (`<config_dir>/cabinet/config.toml`)
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cabinet").join("config.toml"))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/cabinet
        dirs::data_local_dir()
            .map(|d| d.join("cabinet"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/cabinet"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("cabinet"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/cabinet"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("cabinet"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\cabinet"))
    } else {
        PathBuf::from("./cabinet_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_without_overrides() {
        let settings = ImportSettings::resolve(&TomlConfig::default(), None, None).unwrap();
        assert_eq!(settings, ImportSettings::default());
        assert_eq!(settings.batch_size, 2000);
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml = TomlConfig::from_toml_str(
            r#"
            [import]
            batch_size = 500
            progress_interval = 10
            "#,
        )
        .unwrap();

        let settings = ImportSettings::resolve(&toml, Some(50), None).unwrap();
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.progress_interval, 10);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = ImportSettings::resolve(&TomlConfig::default(), Some(0), None);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_source_path_prefers_explicit() {
        let settings = ImportSettings {
            source_dir: PathBuf::from("/data/exports"),
            ..ImportSettings::default()
        };

        assert_eq!(
            settings.source_path(None, "honoraires.xml"),
            PathBuf::from("/data/exports/honoraires.xml")
        );
        assert_eq!(
            settings.source_path(Some(Path::new("/tmp/h.xml")), "honoraires.xml"),
            PathBuf::from("/tmp/h.xml")
        );
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("root_folder = [");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
