use core::fmt::{Display, Formatter};
use core::time::Duration;

/// Format a duration as `H:MM:SS`.
#[must_use]
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// One periodic crawl status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Time since the crawl started.
    pub elapsed: Duration,

    /// API calls issued since the previous report.
    pub calls: u64,

    /// Records finished so far.
    pub completed: u64,

    /// Records to process, once discovery has finished.
    pub total: Option<u64>,
}

impl TickReport {
    /// Completion in percent, truncated to two decimals.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "record counts stay far below 2^52")]
    pub fn percent(&self) -> Option<f64> {
        let total = self.total.filter(|&t| t > 0)?;
        let ratio = self.completed as f64 / total as f64;
        Some((ratio * 10_000.0).floor() / 100.0)
    }

    /// Estimated time remaining, extrapolated linearly from throughput so far.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "record counts stay far below 2^52")]
    pub fn remaining(&self) -> Option<Duration> {
        let total = self.total?;
        if self.completed == 0 {
            return None;
        }

        let left = total.saturating_sub(self.completed);
        let per_record = self.elapsed.as_secs_f64() / self.completed as f64;
        Some(Duration::from_secs_f64(per_record * left as f64))
    }
}

impl Display for TickReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "T: {}, R: {}, P: {}", format_hms(self.elapsed), self.calls, self.completed)?;

        if let Some(percent) = self.percent() {
            write!(f, ", %: {percent:.2}")?;
            match self.remaining() {
                Some(eta) => write!(f, ", ETA: {}", format_hms(eta))?,
                None => write!(f, ", ETA: --")?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::ZERO), "0:00:00");
        assert_eq!(format_hms(Duration::from_secs(59)), "0:00:59");
        assert_eq!(format_hms(Duration::from_secs(3600 + 62)), "1:01:02");
        assert_eq!(format_hms(Duration::from_secs(27 * 3600)), "27:00:00");
    }

    #[test]
    fn test_report_before_total_is_known() {
        let report = TickReport {
            elapsed: Duration::from_secs(60),
            calls: 120,
            completed: 10,
            total: None,
        };
        assert_eq!(report.to_string(), "T: 0:01:00, R: 120, P: 10");
    }

    #[test]
    fn test_report_with_total() {
        let report = TickReport {
            elapsed: Duration::from_secs(120),
            calls: 300,
            completed: 1,
            total: Some(3),
        };
        assert_eq!(report.to_string(), "T: 0:02:00, R: 300, P: 1, %: 33.33, ETA: 0:04:00");
    }

    #[test]
    fn test_report_with_nothing_completed() {
        let report = TickReport {
            elapsed: Duration::from_secs(60),
            calls: 5,
            completed: 0,
            total: Some(10),
        };
        assert_eq!(report.to_string(), "T: 0:01:00, R: 5, P: 0, %: 0.00, ETA: --");
    }

    #[test]
    fn test_report_with_empty_total() {
        let report = TickReport {
            elapsed: Duration::from_secs(60),
            calls: 0,
            completed: 0,
            total: Some(0),
        };
        assert_eq!(report.to_string(), "T: 0:01:00, R: 0, P: 0");
    }
}
