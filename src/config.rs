use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Store and logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// CSV upload handling
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Parent directory for per-request temporary upload directories.
    #[serde(default = "default_temp_files_dir")]
    pub temp_files_dir: PathBuf,
    /// Longest accepted uploaded filename, in characters.
    #[serde(default = "default_max_filename_len")]
    pub max_filename_len: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            temp_files_dir: default_temp_files_dir(),
            max_filename_len: default_max_filename_len(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_temp_files_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_max_filename_len() -> usize {
    50
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in DATACATALOG_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("DATACATALOG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_file(&config_path)
    }

    /// Load and validate configuration from an explicit path
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.upload.max_filename_len == 0 {
            anyhow::bail!("upload.max_filename_len must be greater than 0");
        }

        let temp_dir = &self.upload.temp_files_dir;
        if temp_dir.exists() && !temp_dir.is_dir() {
            anyhow::bail!(
                "upload.temp_files_dir must be a directory, not a file: {}",
                temp_dir.display()
            );
        }

        Ok(())
    }

    /// Install env_logger with the configured level as the default filter.
    ///
    /// `RUST_LOG` still takes precedence. Returns false if a logger was already set.
    pub fn init_logging(&self) -> bool {
        env_logger::Builder::from_env(
            env_logger::Env::default().filter_or("RUST_LOG", &self.catalog.log_level),
        )
        .try_init()
        .is_ok()
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.catalog.db_path
    }

    /// Get the SQL migrations directory
    pub fn migrations_dir(&self) -> &Path {
        &self.catalog.migrations_dir
    }
}
