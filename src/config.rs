//! Service configuration.
//!
//! Configuration is layered: the stock defaults are overridden by an optional
//! TOML file, `storefront-media.toml` in the working directory or the path
//! given with `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [category]
//! max_width = 800           # Bounding box
//! max_height = 800
//! max_upload_mib = 5        # Raw upload ceiling
//! format = "original"       # original | jpg | png | webp
//! tier = "high"             # none | high | auto | medium | low
//! budget_bytes = 1048576    # Encoded size ceiling
//!
//! [product]                 # same keys; 1200x1200, 10 MiB
//! [banner]                  # same keys; 1600x600, 5 MiB
//!
//! [store]
//! backend = "local"         # local | drive
//! upload_attempts = 3
//! timeout_secs = 30
//!
//! [store.local]
//! root = "media"
//! base_url = "http://localhost:8000/media"
//!
//! [store.drive]
//! folder_id_env = "GOOGLE_DRIVE_FOLDER_ID"
//! client_id_env = "GOOGLE_CLIENT_ID"
//! client_secret_env = "GOOGLE_CLIENT_SECRET"
//! refresh_token_env = "GOOGLE_REFRESH_TOKEN"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [logging]
//! level = "info"            # RUST_LOG overrides
//! format = "text"           # text | json
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [product]
//! tier = "medium"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::catalog::{ContextSettings, ImageContext};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "storefront-media.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration.
///
/// User files need only specify the values they want to override. Unknown
/// keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub category: ContextSettings,
    pub product: ContextSettings,
    pub banner: ContextSettings,
    /// Where processed images are uploaded.
    pub store: StoreConfig,
    /// Parallel processing settings (batch command).
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            category: ContextSettings::defaults_for(ImageContext::Category),
            product: ContextSettings::defaults_for(ImageContext::Product),
            banner: ContextSettings::defaults_for(ImageContext::Banner),
            store: StoreConfig::default(),
            processing: ProcessingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Settings for one call site.
    pub fn context(&self, context: ImageContext) -> &ContextSettings {
        match context {
            ImageContext::Category => &self.category,
            ImageContext::Product => &self.product,
            ImageContext::Banner => &self.banner,
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for context in ImageContext::ALL {
            self.context(context)
                .validate(&context.to_string())
                .map_err(ConfigError::Validation)?;
        }
        if self.store.upload_attempts == 0 {
            return Err(ConfigError::Validation(
                "store.upload_attempts must be at least 1".into(),
            ));
        }
        if self.store.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "store.timeout_secs must be non-zero".into(),
            ));
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not a valid filter: {e}",
                self.logging.level
            )));
        }
        Ok(())
    }
}

/// Which object store uploads go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Local,
    Drive,
}

/// Object store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Upload tries per image, first try included. Retries reuse the
    /// encoded bytes.
    pub upload_attempts: u32,
    /// HTTP timeout for remote stores.
    pub timeout_secs: u64,
    pub local: LocalStoreConfig,
    pub drive: DriveConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Local,
            upload_attempts: 3,
            timeout_secs: 30,
            local: LocalStoreConfig::default(),
            drive: DriveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalStoreConfig {
    /// Directory objects are written into.
    pub root: String,
    /// URL prefix the directory is served under.
    pub base_url: String,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            root: "media".to_string(),
            base_url: "http://localhost:8000/media".to_string(),
        }
    }
}

/// Google Drive settings. Secrets live in the environment; this only names
/// the variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriveConfig {
    pub folder_id_env: String,
    pub client_id_env: String,
    pub client_secret_env: String,
    pub refresh_token_env: String,
    pub api_base: String,
    pub token_url: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_id_env: "GOOGLE_DRIVE_FOLDER_ID".to_string(),
            client_id_env: "GOOGLE_CLIENT_ID".to_string(),
            client_secret_env: "GOOGLE_CLIENT_SECRET".to_string(),
            refresh_token_env: "GOOGLE_REFRESH_TOKEN".to_string(),
            api_base: "https://www.googleapis.com".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `storefront_media=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServiceConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the service config.
///
/// An explicit `path` must exist. Without one, [`CONFIG_FILE_NAME`] in the
/// working directory is used when present, stock defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str(&content)?)
        }
        None => load_raw_config(Path::new(CONFIG_FILE_NAME))?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# storefront-media configuration
# ==============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Save as storefront-media.toml in the working directory, or pass
# --config <path>. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Call sites
# ---------------------------------------------------------------------------
# Each record type that carries an image has its own section.
#
#   max_width / max_height  bounding box; images are shrunk to fit, never enlarged
#   max_upload_mib          largest raw upload accepted
#   format                  original | jpg | png | webp
#                           ("original" keeps jpeg/png/webp uploads, else jpg)
#   tier                    none | high | auto | medium | low
#                           ("none" fails instead of recompressing when over budget)
#   budget_bytes            encoded size ceiling

[category]
max_width = 800
max_height = 800
max_upload_mib = 5
format = "original"
tier = "high"
budget_bytes = 1048576

[product]
max_width = 1200
max_height = 1200
max_upload_mib = 10
format = "original"
tier = "high"
budget_bytes = 1048576

[banner]
max_width = 1600
max_height = 600
max_upload_mib = 5
format = "original"
tier = "high"
budget_bytes = 1048576

# ---------------------------------------------------------------------------
# Object store
# ---------------------------------------------------------------------------
[store]
# local | drive
backend = "local"

# Upload tries per image, first try included.
upload_attempts = 3

# HTTP timeout for remote stores, in seconds.
timeout_secs = 30

[store.local]
# Directory objects are written into, and the URL it is served under.
root = "media"
base_url = "http://localhost:8000/media"

[store.drive]
# Names of the environment variables holding the Drive folder and OAuth
# credentials. The values themselves never go in this file.
folder_id_env = "GOOGLE_DRIVE_FOLDER_ID"
client_id_env = "GOOGLE_CLIENT_ID"
client_secret_env = "GOOGLE_CLIENT_SECRET"
refresh_token_env = "GOOGLE_REFRESH_TOKEN"
api_base = "https://www.googleapis.com"
token_url = "https://oauth2.googleapis.com/token"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers for the batch command.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# tracing filter directive; the RUST_LOG environment variable overrides it.
level = "info"

# text | json
format = "text"
"##
}
