//! Setup shared by every network command.

use super::ProgressReporter;
use super::config::Config;
use crate::Result;
use crate::github::{CallCounter, CredentialPool, GitHubClient};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use core::time::Duration;
use ohno::bail;
use std::sync::Arc;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments shared by every command that talks to the API
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// GitHub personal access token; repeat to rotate over several
    #[arg(
        long = "github-token",
        value_name = "TOKEN",
        env = "GITHUB_TOKENS",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub github_tokens: Vec<String>,

    /// Path to configuration file (default is `census.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// Everything a network command needs: configuration, an API client, and a progress bar.
#[derive(Debug)]
pub struct Session {
    pub config: Config,
    pub client: Arc<GitHubClient>,
    pub progress: ProgressReporter,
}

impl Session {
    pub fn new(args: &CommonArgs) -> Result<Self> {
        init_logging(args.log_level);

        let config = Config::load(Utf8Path::new("."), args.config.as_ref())?;

        let tokens: Vec<&str> = args.github_tokens.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            bail!("no GitHub API tokens given, use --github-token or set GITHUB_TOKENS");
        }

        let pool = Arc::new(CredentialPool::new(tokens)?);
        let client = Arc::new(GitHubClient::new(config.client_settings(), pool, Arc::new(CallCounter::new()))?);

        let delay = if args.log_level == LogLevel::None {
            Duration::from_millis(300)
        } else {
            Duration::from_hours(365 * 24)
        };

        let use_colors = match args.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                use std::io::{IsTerminal, stderr};
                stderr().is_terminal()
            }
        };

        Ok(Self {
            config,
            client,
            progress: ProgressReporter::new(delay, use_colors),
        })
    }
}

/// Initialize the logger based on log level
///
/// Subsequent calls are ignored, so commands can be run repeatedly in-process.
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
