use super::progress::Progress;
use super::report::TickReport;
use crate::Result;
use crate::github::RepoApi;
use crate::records::{DiscoveryStats, UpdateOutcome, discover_records, is_record_file, update_record};
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use ohno::{app_err, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;

const LOG_TARGET: &str = "     crawl";

/// Paths buffered between the discovery walk and the dispatcher.
const DISCOVERY_CHANNEL_CAPACITY: usize = 1024;

pub const DEFAULT_CONCURRENCY: usize = 50;
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Knobs for a crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Maximum number of records updated at once.
    pub concurrency: usize,

    /// Refresh every facet of every record.
    pub force: bool,

    /// How often a status line is logged.
    pub report_interval: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            force: false,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

/// A record that could not be updated.
#[derive(Debug, Clone)]
pub struct RecordFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Results of a finished crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    /// Files found under the root, including skipped ones.
    pub files: u64,

    /// Files not processed, either filtered out or unreadable.
    pub skipped: u64,

    /// Records successfully updated, whether or not they changed.
    pub completed: u64,

    /// Records written back to disk.
    pub written: u64,

    pub failures: Vec<RecordFailure>,

    /// API calls issued during the crawl.
    pub calls: u64,

    pub elapsed: Duration,
}

impl CrawlStats {
    /// Records handed to the pipeline.
    #[must_use]
    pub const fn discovered(&self) -> u64 {
        self.files - self.skipped
    }
}

#[derive(Debug, Default)]
struct CrawlCounters {
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    written: AtomicU64,

    /// Known once discovery has finished.
    total: OnceLock<u64>,
}

impl CrawlCounters {
    fn finished(&self) -> u64 {
        self.completed.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }
}

/// Update every record under `root`.
///
/// Records are discovered on a blocking thread and streamed to a dispatcher
/// that runs at most `options.concurrency` pipelines at once. Failures are
/// isolated per record and returned in the stats. Only a missing or unreadable
/// root fails the crawl as a whole.
pub async fn run_crawl<A: RepoApi>(
    api: Arc<A>,
    root: impl AsRef<Path>,
    options: &CrawlOptions,
    progress: &dyn Progress,
) -> Result<CrawlStats> {
    crawl_with_reports(api, root, options, progress, |report| {
        log::info!(target: LOG_TARGET, "{report}");
    })
    .await
}

/// Same as [`run_crawl`], handing every periodic status report to `on_tick`.
async fn crawl_with_reports<A, F>(
    api: Arc<A>,
    root: impl AsRef<Path>,
    options: &CrawlOptions,
    progress: &dyn Progress,
    on_tick: F,
) -> Result<CrawlStats>
where
    A: RepoApi,
    F: FnMut(TickReport) + Send + 'static,
{
    if options.concurrency == 0 {
        bail!("crawl concurrency must be at least 1");
    }

    if options.report_interval.is_zero() {
        bail!("crawl report interval must be greater than zero");
    }

    let root = root.as_ref().to_path_buf();
    let start = Instant::now();
    let calls_at_start = api.calls().total();
    let counters = Arc::new(CrawlCounters::default());

    log::info!(
        target: LOG_TARGET,
        "Crawling '{}' with up to {} concurrent updates{}",
        root.display(),
        options.concurrency,
        if options.force { " (forced)" } else { "" }
    );

    progress.set_phase("Crawling");
    let progress_counters = Arc::clone(&counters);
    progress.set_determinate(Box::new(move || {
        let finished = progress_counters.finished();
        let total = progress_counters
            .total
            .get()
            .copied()
            .unwrap_or_else(|| progress_counters.dispatched.load(Ordering::Relaxed));
        (total, finished, format!("{finished}/{total} records"))
    }));

    let ticker = tokio::spawn(report_ticks(
        Arc::clone(&api),
        Arc::clone(&counters),
        options.report_interval,
        on_tick,
    ));

    let (tx, mut rx) = mpsc::channel::<PathBuf>(DISCOVERY_CHANNEL_CAPACITY);
    let discovery = tokio::task::spawn_blocking(move || {
        discover_records(&root, is_record_file, |path| {
            tx.blocking_send(path).map_err(|e| app_err!("crawl dispatcher stopped: {e}"))
        })
    });

    let semaphore = Arc::new(Semaphore::new(options.concurrency));
    let mut workers = JoinSet::new();
    let mut in_flight: HashMap<Id, PathBuf> = HashMap::new();
    let mut failures = Vec::new();

    while let Some(path) = rx.recv().await {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .expect("semaphore not closed");

        let _ = counters.dispatched.fetch_add(1, Ordering::Relaxed);

        let api = Arc::clone(&api);
        let task_path = path.clone();
        let force = options.force;
        let handle = workers.spawn(async move {
            let result = update_record(api.as_ref(), &task_path, force).await;
            drop(permit);
            result
        });
        let _ = in_flight.insert(handle.id(), path);

        while let Some(joined) = workers.try_join_next_with_id() {
            finish_record(joined, &mut in_flight, &counters, &mut failures);
        }
    }

    let discovery_result = match discovery.await {
        Ok(result) => result,
        Err(e) => Err(app_err!("record discovery task failed: {e}")),
    };

    if let Ok(stats) = &discovery_result {
        let _ = counters.total.set(stats.accepted());
        log::info!(target: LOG_TARGET, "Discovery finished, {} records to process", stats.accepted());
    }

    while let Some(joined) = workers.join_next_with_id().await {
        finish_record(joined, &mut in_flight, &counters, &mut failures);
    }

    ticker.abort();
    progress.done();

    let DiscoveryStats { total: files, skipped } = discovery_result?;

    let stats = CrawlStats {
        files,
        skipped,
        completed: counters.completed.load(Ordering::Relaxed),
        written: counters.written.load(Ordering::Relaxed),
        failures,
        calls: api.calls().total() - calls_at_start,
        elapsed: start.elapsed(),
    };

    log::info!(
        target: LOG_TARGET,
        "Crawl finished: {} completed, {} written, {} failed, {} skipped, {} calls",
        stats.completed,
        stats.written,
        stats.failures.len(),
        stats.skipped,
        stats.calls
    );

    Ok(stats)
}

fn finish_record(
    joined: core::result::Result<(Id, Result<UpdateOutcome>), JoinError>,
    in_flight: &mut HashMap<Id, PathBuf>,
    counters: &CrawlCounters,
    failures: &mut Vec<RecordFailure>,
) {
    let (id, result) = match joined {
        Ok((id, result)) => (id, result),
        Err(e) => (e.id(), Err(app_err!("record update task failed: {e}"))),
    };

    let path = in_flight.remove(&id).unwrap_or_default();

    match result {
        Ok(outcome) => {
            let _ = counters.completed.fetch_add(1, Ordering::Relaxed);
            if outcome == UpdateOutcome::Written {
                let _ = counters.written.fetch_add(1, Ordering::Relaxed);
            }
        }

        Err(e) => {
            let _ = counters.failed.fetch_add(1, Ordering::Relaxed);
            log::warn!(target: LOG_TARGET, "Could not update '{}': {e:#}", path.display());
            failures.push(RecordFailure {
                path,
                error: format!("{e:#}"),
            });
        }
    }
}

/// Produce a status report every `interval` until aborted.
async fn report_ticks<A, F>(api: Arc<A>, counters: Arc<CrawlCounters>, interval: Duration, mut on_tick: F)
where
    A: RepoApi,
    F: FnMut(TickReport) + Send + 'static,
{
    let start = Instant::now();
    let mut ticker = tokio::time::interval_at(start + interval, interval);

    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = ticker.tick().await;

        let report = TickReport {
            elapsed: start.elapsed(),
            calls: api.calls().take_since_report(),
            completed: counters.completed.load(Ordering::Relaxed),
            total: counters.total.get().copied(),
        };

        on_tick(report);
    }
}
