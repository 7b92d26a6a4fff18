use crate::Result;
use ohno::app_err;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Issue counts for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStats {
    /// Issues and pull requests in any state.
    pub total: u64,

    /// Open issues, as last reported by the repository metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<u64>,
}

/// A single count, used for contributors and commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountStats {
    pub total: u64,
}

/// One repository as persisted on disk.
///
/// Facets that have not been fetched yet are `None`. Fields written by other
/// tools are kept in `other` and survive a rewrite untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRecord {
    pub metadata: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<BTreeMap<String, u64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<IssueStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributors: Option<CountStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commits: Option<CountStats>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

pub(crate) const TOPICS_KEY: &str = "topics";
pub(crate) const OPEN_ISSUES_KEY: &str = "open_issues";

impl RepoRecord {
    /// The `owner/name` identifier used for API queries.
    pub fn full_name(&self) -> Result<&str> {
        self.metadata
            .get("full_name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| app_err!("record metadata has no full_name"))
    }

    /// Topics, when they have been fetched.
    #[must_use]
    pub fn topics(&self) -> Option<&Value> {
        self.metadata.get(TOPICS_KEY).filter(|v| !v.is_null())
    }

    pub fn set_topics(&mut self, topics: Vec<String>) {
        let _ = self
            .metadata
            .insert(TOPICS_KEY.to_string(), Value::Array(topics.into_iter().map(Value::String).collect()));
    }
}

/// A record loaded for updating, with flags that never reach disk.
#[derive(Debug, Clone)]
pub struct WorkingRecord {
    pub path: PathBuf,
    pub record: RepoRecord,

    /// Refresh every facet even when already present.
    pub force: bool,

    /// Set when any facet changed since loading.
    pub dirty: bool,
}

impl WorkingRecord {
    #[must_use]
    pub fn new(path: impl AsRef<Path>, record: RepoRecord, force: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            record,
            force,
            dirty: false,
        }
    }
}
