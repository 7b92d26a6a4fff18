//! In-memory [`RepoApi`] for unit tests.

use super::{CallCounter, RepoApi};
use crate::Result;
use core::time::Duration;
use ohno::bail;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

pub const FAKE_BASE_URL: &str = "https://api.github.com";

/// Answers every query with fixed values and counts calls per operation.
#[derive(Debug, Default)]
pub struct FakeApi {
    calls: CallCounter,
    failing: Mutex<HashSet<&'static str>>,
    log: Mutex<Vec<String>>,
    latency: Duration,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every query only after `latency` has passed.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make an operation (`"languages"`, `"issues"`, ...) fail from now on.
    pub fn fail(&self, operation: &'static str) {
        let _ = self.failing.lock().unwrap().insert(operation);
    }

    /// Operations invoked so far, as `operation:repo`.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    async fn enter(&self, operation: &'static str, repo: &str) -> Result<()> {
        self.calls.record();
        self.log.lock().unwrap().push(format!("{operation}:{repo}"));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing.lock().unwrap().contains(operation) {
            bail!("{operation} failed for '{repo}'");
        }
        Ok(())
    }
}

impl RepoApi for FakeApi {
    fn calls(&self) -> &CallCounter {
        &self.calls
    }

    fn base_url(&self) -> &str {
        FAKE_BASE_URL
    }

    async fn languages(&self, repo: &str) -> Result<BTreeMap<String, u64>> {
        self.enter("languages", repo).await?;
        Ok(BTreeMap::from([("Rust".to_string(), 4096), ("Shell".to_string(), 128)]))
    }

    async fn topics(&self, repo: &str) -> Result<Vec<String>> {
        self.enter("topics", repo).await?;
        Ok(vec!["cli".to_string(), "github".to_string()])
    }

    async fn issue_count(&self, repo: &str) -> Result<u64> {
        self.enter("issues", repo).await?;
        Ok(42)
    }

    async fn commit_count(&self, repo: &str) -> Result<u64> {
        self.enter("commits", repo).await?;
        Ok(1234)
    }

    async fn contributor_count(&self, repo: &str) -> Result<u64> {
        self.enter("contributors", repo).await?;
        Ok(7)
    }
}
