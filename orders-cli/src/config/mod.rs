//! Configuration file handling
//!
//! Looked up in order: `--config`, `$ORDERS_CLI_CONFIG`, then
//! `<config_dir>/orders-cli/config.toml`. Without any file the defaults
//! apply (local `orders.xlsx` in the working directory).
//!
//! ```toml
//! [storage]
//! backend = "google-sheets"
//! spreadsheet_id = "1GAP0m..."
//! worksheet_gid = 2113617863
//! credentials_env = "GCP_SERVICE_ACCOUNT_JSON"
//!
//! [ingest]
//! scan_rows = 20
//!
//! [geocoder]
//! country = "PL"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::ingest::IngestOptions;

pub const CONFIG_ENV: &str = "ORDERS_CLI_CONFIG";
pub const DEFAULT_CREDENTIALS_ENV: &str = "GCP_SERVICE_ACCOUNT_JSON";
const DEFAULT_DATASET_URL: &str = "https://symerio.github.io/postal-codes-data/data/geonames";
const DEFAULT_SHEETS_API: &str = "https://sheets.googleapis.com";
const DEFAULT_LOCAL_PATH: &str = "orders.xlsx";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub ingest: IngestOptions,
    pub geocoder: GeocoderConfig,
    pub http: HttpConfig,
}

/// Where the orders table lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum StorageConfig {
    /// Excel or CSV file, chosen by extension
    Local {
        path: PathBuf,
        /// Worksheet name for Excel files; the first sheet when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
    },
    GoogleSheets(GoogleSheetsConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            path: PathBuf::from(DEFAULT_LOCAL_PATH),
            sheet: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleSheetsConfig {
    pub spreadsheet_id: String,
    /// Tab title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worksheet: Option<String>,
    /// Tab id (the `gid=` part of the sheet URL); wins over `worksheet`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worksheet_gid: Option<i64>,
    /// Environment variable holding the service account JSON key
    #[serde(default = "default_credentials_env")]
    pub credentials_env: String,
    /// Key file used when the environment variable is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
    #[serde(default = "default_sheets_api")]
    pub api_base: String,
}

fn default_credentials_env() -> String {
    DEFAULT_CREDENTIALS_ENV.to_string()
}

fn default_sheets_api() -> String {
    DEFAULT_SHEETS_API.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// ISO country code of the postal-code dataset
    pub country: String,
    /// Local dataset file; skips the download when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,
    /// Download location override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_url: Option<String>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            country: "PL".to_string(),
            dataset_path: None,
            dataset_url: None,
        }
    }
}

impl GeocoderConfig {
    pub fn dataset_url(&self) -> String {
        self.dataset_url.clone().unwrap_or_else(|| {
            format!("{}/{}.txt", DEFAULT_DATASET_URL, self.country.to_uppercase())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Default location: `<config_dir>/orders-cli/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orders-cli")
        .join("config.toml")
}

/// A loaded configuration and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: Option<PathBuf>,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Relative paths are relative to the config file
        if let Some(dir) = path.parent() {
            config.anchor_paths(dir);
        }
        Ok(config)
    }

    /// Resolve the config location and load it
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file does not exist: {}", path.display());
            }
            return Ok(LoadedConfig {
                config: Self::from_file(path)?,
                source: Some(path.to_path_buf()),
            });
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            if !path.exists() {
                bail!(
                    "Config file from ${} does not exist: {}",
                    CONFIG_ENV,
                    path.display()
                );
            }
            return Ok(LoadedConfig {
                config: Self::from_file(&path)?,
                source: Some(path),
            });
        }

        let default_path = default_config_path();
        if default_path.exists() {
            return Ok(LoadedConfig {
                config: Self::from_file(&default_path)?,
                source: Some(default_path),
            });
        }

        log::debug!(
            "No config file at {}, using defaults",
            default_path.display()
        );
        Ok(LoadedConfig {
            config: Self::default(),
            source: None,
        })
    }

    fn anchor_paths(&mut self, dir: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };

        match self.storage {
            StorageConfig::Local { ref mut path, .. } => anchor(path),
            StorageConfig::GoogleSheets(ref mut sheets) => {
                if let Some(ref mut file) = sheets.credentials_file {
                    anchor(file);
                }
            }
        }
        if let Some(ref mut dataset) = self.geocoder.dataset_path {
            anchor(dataset);
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
