use crate::Result;
use crate::crawl::{DEFAULT_CONCURRENCY, DEFAULT_REPORT_INTERVAL};
use crate::github::{ClientSettings, DEFAULT_ACCEPT, DEFAULT_API_BASE_URL, DEFAULT_USER_AGENT};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use url::Url;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "census.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding the records to crawl
    #[serde(default = "default_records_dir")]
    pub records_dir: Utf8PathBuf,

    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    /// Maximum number of records updated at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retries for transient request failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between transient-failure retries
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Delay before resubmitting a request the API is still computing
    #[serde(default = "default_busy_delay", with = "humantime_serde")]
    pub busy_delay: Duration,

    /// Interval between crawl status lines
    #[serde(default = "default_report_interval", with = "humantime_serde")]
    pub report_interval: Duration,
}

fn default_records_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("records")
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

const fn default_max_retries() -> u32 {
    10
}

const fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

const fn default_busy_delay() -> Duration {
    Duration::from_secs(10)
}

const fn default_report_interval() -> Duration {
    DEFAULT_REPORT_INTERVAL
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `census.toml` in `base_dir` is used if present.
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Settings for the API client.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api_base_url.clone(),
            user_agent: self.user_agent.clone(),
            accept: self.accept.clone(),
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            busy_delay: self.busy_delay,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(app_err!("concurrency must be at least 1"));
        }

        if self.api_base_url.trim().is_empty() {
            return Err(app_err!("api_base_url must not be empty"));
        }

        let _ = Url::parse(&self.api_base_url).map_err(|e| app_err!("api_base_url '{}' is not a valid URL: {e}", self.api_base_url))?;

        if self.report_interval.is_zero() {
            return Err(app_err!("report_interval must be greater than zero"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
