//! Configuration loading
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (clap `env` fallbacks in the binaries)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Only operational knobs have compiled defaults. The stale host and the
//! production origin describe a specific deployment and must be supplied.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::reconcile::{ReconcileError, ReconcileSettings, TargetForm};
use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ELEVATE_CONFIG";

/// Compiled defaults for settings not present anywhere else
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub bind_address: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub uploads_segment: String,
    pub target_form: TargetForm,
    pub store_timeout_ms: u64,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            database_path: default_database_path(),
            uploads_dir: PathBuf::from("uploads"),
            uploads_segment: "uploads".to_string(),
            target_form: TargetForm::RootRelative,
            store_timeout_ms: 10_000,
        }
    }
}

/// `[reconcile]` table of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileToml {
    pub stale_host: Option<String>,
    pub production_origin: Option<String>,
    pub target_form: Option<TargetForm>,
    pub uploads_segment: Option<String>,
    pub store_timeout_ms: Option<u64>,
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub uploads_dir: Option<PathBuf>,
    pub reconcile: ReconcileToml,
}

impl TomlConfig {
    /// Parse a specific config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config file.
    ///
    /// An explicit path (argument, then `ELEVATE_CONFIG`) must exist. The
    /// per-user default location is optional: if it is missing, defaults are
    /// used and a warning is logged.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        if let Some(path) = explicit {
            let config = Self::from_file(&path)?;
            info!("Loaded config from {}", path.display());
            return Ok(config);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                let config = Self::from_file(&path)?;
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Some(path) => {
                warn!("No config file at {}; using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn resolve_database_path(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.database_path.clone())
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().database_path)
    }

    pub fn resolve_uploads_dir(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.uploads_dir.clone())
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().uploads_dir)
    }

    pub fn resolve_port(&self, cli: Option<u16>) -> u16 {
        cli.or(self.port)
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().port)
    }

    pub fn resolve_bind_address(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.bind_address.clone())
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().bind_address)
    }
}

/// Reconciliation values taken from the command line or environment
#[derive(Debug, Clone, Default)]
pub struct ReconcileOverrides {
    pub stale_host: Option<String>,
    pub production_origin: Option<String>,
    pub target_form: Option<TargetForm>,
    pub uploads_segment: Option<String>,
    pub store_timeout_ms: Option<u64>,
}

impl ReconcileOverrides {
    /// Merge with the config file and validate
    pub fn resolve(self, toml: &ReconcileToml) -> std::result::Result<ReconcileSettings, ReconcileError> {
        let defaults = CompiledDefaults::for_current_platform();

        let stale_host = self
            .stale_host
            .or_else(|| toml.stale_host.clone())
            .ok_or_else(|| {
                ReconcileError::InvalidConfiguration(
                    "stale host marker not configured (--stale-host, ELEVATE_STALE_HOST or [reconcile].stale_host)"
                        .to_string(),
                )
            })?;
        let production_origin = self
            .production_origin
            .or_else(|| toml.production_origin.clone());
        let target_form = self
            .target_form
            .or(toml.target_form)
            .unwrap_or(defaults.target_form);
        let uploads_segment = self
            .uploads_segment
            .or_else(|| toml.uploads_segment.clone())
            .unwrap_or(defaults.uploads_segment);
        let store_timeout_ms = self
            .store_timeout_ms
            .or(toml.store_timeout_ms)
            .unwrap_or(defaults.store_timeout_ms);

        ReconcileSettings::new(
            &stale_host,
            production_origin.as_deref(),
            target_form,
            &uploads_segment,
            Duration::from_millis(store_timeout_ms),
        )
    }
}

/// `<config dir>/elevate/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("elevate").join("config.toml"))
}

/// `<local data dir>/elevate/elevate.db`, or `./elevate.db` if the platform
/// has no data directory
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("elevate").join("elevate.db"))
        .unwrap_or_else(|| PathBuf::from("elevate.db"))
}

/// Reconciliation flags shared by the binaries
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ReconcileArgs {
    /// Development host token to replace, e.g. 192.168.0.100:5000
    #[arg(long, env = "ELEVATE_STALE_HOST")]
    pub stale_host: Option<String>,

    /// Public origin for the production-absolute form, e.g. https://media.example.com
    #[arg(long, env = "ELEVATE_PRODUCTION_ORIGIN")]
    pub production_origin: Option<String>,

    /// production-absolute or root-relative
    #[arg(long = "target", env = "ELEVATE_TARGET_FORM")]
    pub target_form: Option<TargetForm>,

    /// Path segment used for root-relative references
    #[arg(long, env = "ELEVATE_UPLOADS_SEGMENT")]
    pub uploads_segment: Option<String>,

    /// Ceiling for each individual store operation
    #[arg(long = "timeout-ms", env = "ELEVATE_STORE_TIMEOUT_MS")]
    pub store_timeout_ms: Option<u64>,
}

#[cfg(feature = "cli")]
impl From<ReconcileArgs> for ReconcileOverrides {
    fn from(args: ReconcileArgs) -> Self {
        Self {
            stale_host: args.stale_host,
            production_origin: args.production_origin,
            target_form: args.target_form,
            uploads_segment: args.uploads_segment,
            store_timeout_ms: args.store_timeout_ms,
        }
    }
}
