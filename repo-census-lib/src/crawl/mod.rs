//! Bounded-concurrency crawl over a tree of records.
//!
//! Discovery, dispatch, and periodic status reporting run as separate tasks.
//! A crawl finishes once discovery is complete and every dispatched record has
//! been processed.

mod orchestrator;
mod progress;
mod report;

pub use orchestrator::{CrawlOptions, CrawlStats, DEFAULT_CONCURRENCY, DEFAULT_REPORT_INTERVAL, RecordFailure, run_crawl};
pub use progress::{NoProgress, Progress};
pub use report::{TickReport, format_hms};
