use core::sync::atomic::{AtomicU64, Ordering};

/// Counts physical API calls, including retries and resubmissions.
///
/// Keeps a lifetime total plus a window that is reset each time it is read,
/// which is what the periodic crawl report consumes.
#[derive(Debug, Default)]
pub struct CallCounter {
    since_report: AtomicU64,
    total: AtomicU64,
}

impl CallCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call attempt.
    pub fn record(&self) {
        let _ = self.since_report.fetch_add(1, Ordering::Relaxed);
        let _ = self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Return the number of calls since the previous invocation and reset the window.
    pub fn take_since_report(&self) -> u64 {
        self.since_report.swap(0, Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
