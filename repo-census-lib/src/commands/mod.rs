//! Command-line interface for repo-census
//!
//! # Commands
//!
//! - **crawl**: Walk the records directory and bring every record up to date
//! - **update**: Bring a single record up to date
//! - **count**: Count issues, commits, or contributors of one repository
//! - **init**: Generate a default configuration file
//!
//! The `run` function parses command-line arguments using clap and routes
//! to the appropriate command handler. Network commands share a
//! [`common::Session`] that loads the configuration, sets up logging, and
//! builds the API client from the supplied tokens.

mod common;
mod config;
mod count;
mod crawl;
mod host;
mod init;
mod progress_reporter;
mod run;
mod update;

pub use common::{ColorMode, CommonArgs, LogLevel, init_logging};
pub use config::{CONFIG_FILE_NAME, Config, DEFAULT_CONFIG_TOML};
pub use count::{CountArgs, CountKind, process_count};
pub use crawl::{CrawlArgs, process_crawl};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use run::run;
pub use update::{UpdateArgs, process_update};
