//! Configuration loading for the catalog index.
//!
//! Layered config: defaults -> config file -> env vars (`CATALOG_*`).
//! Nested keys use a double underscore, e.g. `CATALOG_BUFFER__MAX_BUFF_LEN`.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kind::CatalogKind;

/// Write buffer settings for incrementally indexed stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSettings {
    /// Buffered records that trigger an immediate flush.
    #[serde(default = "default_max_buff_len")]
    pub max_buff_len: usize,

    /// Age (ms) after which buffered records are flushed regardless of count.
    #[serde(default = "default_max_buff_age_ms")]
    pub max_buff_age_ms: u64,
}

fn default_max_buff_len() -> usize {
    1000
}

fn default_max_buff_age_ms() -> u64 {
    5_000
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            max_buff_len: default_max_buff_len(),
            max_buff_age_ms: default_max_buff_age_ms(),
        }
    }
}

/// Main settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory holding one index directory per catalog
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Memory budget for index writers in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    #[serde(default)]
    pub buffer: BufferSettings,
}

fn default_data_dir() -> String {
    ProjectDirs::from("", "", "catalog-index")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./catalog-data"))
        .to_string_lossy()
        .to_string()
}

/// Smallest writer memory budget Tantivy accepts, in MB
pub const MIN_WRITER_MEMORY_MB: usize = 15;

/// Writer memory budget used when none is configured, in MB
pub const DEFAULT_WRITER_MEMORY_MB: usize = 50;

fn default_writer_memory_mb() -> usize {
    DEFAULT_WRITER_MEMORY_MB
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            writer_memory_mb: default_writer_memory_mb(),
            buffer: BufferSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/catalog-index/config.toml)
    /// 3. Explicit config file (optional)
    /// 4. Environment variables (CATALOG_*)
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "catalog-index")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("data_dir", default_data_dir())?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)?
            .set_default("buffer.max_buff_len", default_max_buff_len() as i64)?
            .set_default("buffer.max_buff_age_ms", default_max_buff_age_ms() as i64)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer.max_buff_len == 0 {
            return Err(ConfigError::Invalid("buffer.max_buff_len must be > 0".into()));
        }
        if self.buffer.max_buff_age_ms == 0 {
            return Err(ConfigError::Invalid(
                "buffer.max_buff_age_ms must be > 0".into(),
            ));
        }
        if self.writer_memory_mb < MIN_WRITER_MEMORY_MB {
            return Err(ConfigError::Invalid(format!(
                "writer_memory_mb must be at least {}, got {}",
                MIN_WRITER_MEMORY_MB, self.writer_memory_mb
            )));
        }
        Ok(())
    }

    /// Expand ~ in data_dir to the home directory
    pub fn expanded_data_dir(&self) -> PathBuf {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.data_dir)
    }

    /// Index directory for one catalog.
    pub fn index_path(&self, kind: CatalogKind) -> PathBuf {
        self.expanded_data_dir().join(kind.as_str())
    }
}
