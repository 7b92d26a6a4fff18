#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for repo-census
//!
//! This library consolidates all functionality for the repo-census tool, which
//! incrementally enriches a directory of per-repository JSON records with data
//! fetched from the GitHub API.
//!
//! # Module Organization
//!
//! - [`github`]: Rate-limited multi-token API client and paginated counting
//! - [`records`]: Record schema, storage, discovery, and the update pipeline
//! - [`crawl`]: Bounded-concurrency crawl over a record tree with periodic reporting
//! - [`commands`]: Command-line interface and orchestration

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod commands;
pub mod crawl;
pub mod github;
pub mod records;

pub use crate::commands::{Host, run};
