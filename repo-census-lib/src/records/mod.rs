//! Per-repository records on disk and the pipeline that keeps them current.

mod discovery;
mod pipeline;
mod record;
mod store;

pub use discovery::{DiscoveryStats, discover_records, is_record_file};
pub use pipeline::{Pipeline, Stage, UpdateOutcome, update_record};
pub use record::{CountStats, IssueStats, RepoRecord, WorkingRecord};
pub use store::{load_record, save_file, save_record};
