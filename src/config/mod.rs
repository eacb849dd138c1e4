use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Mode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Panopto API configuration
    pub api: ApiConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Site origin, e.g. https://example.hosted.panopto.com
    pub base_url: String,

    /// Number of sessions the listing endpoint returns per page
    pub page_size: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retries for transient failures (0 disables retrying)
    pub max_retries: u32,

    /// Delay before the first retry, doubled on every attempt
    pub retry_base_delay_ms: u64,

    /// Cookie header from an existing browser login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory archives are saved to (current directory when unset)
    pub output_dir: Option<PathBuf>,

    /// First component of every archive file name
    pub file_prefix: String,

    /// Folder names longer than this are cut in archive file names
    pub max_folder_name_len: usize,

    /// Caption downloads allowed in flight at once
    pub max_concurrent_fetches: usize,

    /// Mode used when none is given on the command line
    pub default_mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://demo.hosted.panopto.com".to_string(),
                page_size: 50,
                request_timeout_secs: 30,
                max_retries: 2,
                retry_base_delay_ms: 500,
                cookie: None,
            },
            app: AppConfig {
                output_dir: None,
                file_prefix: "panopto".to_string(),
                max_folder_name_len: 30,
                max_concurrent_fetches: 1,
                default_mode: Mode::Transcripts,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("panopto-caption-archiver").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        crate::utils::validate_and_normalize_url(&self.api.base_url)
            .context("api.base_url is not a valid site URL")?;

        if self.api.page_size == 0 {
            anyhow::bail!("api.page_size must be greater than zero");
        }

        if self.app.max_concurrent_fetches == 0 {
            anyhow::bail!("app.max_concurrent_fetches must be greater than zero");
        }

        if self.app.max_folder_name_len == 0 {
            anyhow::bail!("app.max_folder_name_len must be greater than zero");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Site: {}", self.api.base_url);
        println!("  Page Size: {}", self.api.page_size);
        println!("  Request Timeout: {}s", self.api.request_timeout_secs);
        println!("  Max Retries: {}", self.api.max_retries);
        println!("  Cookie: {}", if self.api.cookie.is_some() { "set" } else { "not set" });
        match &self.app.output_dir {
            Some(dir) => println!("  Output Dir: {}", dir.display()),
            None => println!("  Output Dir: (current directory)"),
        }
        println!("  File Prefix: {}", self.app.file_prefix);
        println!("  Concurrent Fetches: {}", self.app.max_concurrent_fetches);
        println!("  Default Mode: {}", self.app.default_mode);
    }

    /// REST root for the configured site
    pub fn api_root(&self) -> String {
        format!("{}/Panopto/api/v1", self.api.base_url.trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// Directory archives are written to
    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.app.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Could not determine current directory"),
        }
    }
}
