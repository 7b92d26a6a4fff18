//! Recursive enumeration of record files.

use crate::Result;
use ohno::IntoAppError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const LOG_TARGET: &str = " discovery";

/// Totals reported once a walk has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Every file seen, including skipped ones.
    pub total: u64,

    /// Files rejected by the filter plus entries that could not be read.
    pub skipped: u64,
}

impl DiscoveryStats {
    /// Files handed to the sink.
    #[must_use]
    pub const fn accepted(&self) -> u64 {
        self.total - self.skipped
    }
}

/// The default filter: JSON files only.
#[must_use]
pub fn is_record_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Walk `root` recursively, passing every file accepted by `filter` to `sink`.
///
/// Entries are visited in file name order. Unreadable entries are logged and
/// counted as skipped. Only a missing or unreadable `root`, or an error returned
/// by `sink`, aborts the walk.
pub fn discover_records<F, S>(root: impl AsRef<Path>, mut filter: F, mut sink: S) -> Result<DiscoveryStats>
where
    F: FnMut(&Path) -> bool,
    S: FnMut(PathBuf) -> Result<()>,
{
    let root = root.as_ref();
    let _ = std::fs::read_dir(root).into_app_err_with(|| format!("unable to read records directory '{}'", root.display()))?;

    let mut stats = DiscoveryStats::default();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Skipping unreadable entry: {e}");
                stats.total += 1;
                stats.skipped += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        stats.total += 1;
        if filter(entry.path()) {
            sink(entry.into_path())?;
        } else {
            stats.skipped += 1;
        }
    }

    log::info!(
        target: LOG_TARGET,
        "Found {} files under '{}', {} skipped",
        stats.total,
        root.display(),
        stats.skipped
    );

    Ok(stats)
}
