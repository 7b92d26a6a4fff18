//! The per-record update pipeline.
//!
//! A record passes through a fixed, ordered list of stages. Each fetching stage
//! only calls the API when its facet is missing or the record is forced, and
//! marks the record dirty when it sets a value. The first failing stage stops
//! the pipeline and nothing is written.

use super::record::{CountStats, IssueStats, OPEN_ISSUES_KEY, WorkingRecord};
use super::store::{load_record, save_record};
use crate::Result;
use crate::github::RepoApi;
use core::fmt::{Display, Formatter};
use ohno::EnrichableExt;
use serde_json::Value;
use std::path::Path;

const LOG_TARGET: &str = "  pipeline";

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Languages,
    Issues,
    Contributors,
    Commits,
    Topics,
    StripInternalUrls,
}

impl Stage {
    pub const ALL: [Self; 6] = [
        Self::Languages,
        Self::Issues,
        Self::Contributors,
        Self::Commits,
        Self::Topics,
        Self::StripInternalUrls,
    ];

    /// Run this stage against a record.
    pub async fn apply<A: RepoApi>(self, api: &A, working: &mut WorkingRecord) -> Result<()> {
        let force = working.force;
        let record = &mut working.record;

        let changed = match self {
            Self::Languages => {
                if record.languages.is_none() || force {
                    record.languages = Some(api.languages(record.full_name()?).await?);
                    true
                } else {
                    false
                }
            }

            Self::Issues => {
                if record.issues.is_none() || force {
                    let total = api.issue_count(record.full_name()?).await?;
                    let previous_open = record.issues.as_ref().and_then(|i| i.open);
                    let open = record
                        .metadata
                        .remove(OPEN_ISSUES_KEY)
                        .and_then(|v| v.as_u64())
                        .or(previous_open);
                    record.issues = Some(IssueStats { total, open });
                    true
                } else {
                    false
                }
            }

            Self::Contributors => {
                if record.contributors.is_none() || force {
                    let total = api.contributor_count(record.full_name()?).await?;
                    record.contributors = Some(CountStats { total });
                    true
                } else {
                    false
                }
            }

            Self::Commits => {
                if record.commits.is_none() || force {
                    let total = api.commit_count(record.full_name()?).await?;
                    record.commits = Some(CountStats { total });
                    true
                } else {
                    false
                }
            }

            Self::Topics => {
                if record.topics().is_none() || force {
                    let topics = api.topics(record.full_name()?).await?;
                    record.set_topics(topics);
                    true
                } else {
                    false
                }
            }

            Self::StripInternalUrls => {
                let base = api.base_url();
                let before = record.metadata.len();
                record
                    .metadata
                    .retain(|key, value| !(key.ends_with("_url") && is_internal_url(value, base)));
                record.metadata.len() != before
            }
        };

        if changed {
            log::debug!(target: LOG_TARGET, "{self} updated '{}'", working.path.display());
            working.dirty = true;
        }

        Ok(())
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Languages => "languages",
            Self::Issues => "issues",
            Self::Contributors => "contributors",
            Self::Commits => "commits",
            Self::Topics => "topics",
            Self::StripInternalUrls => "strip-internal-urls",
        };
        f.write_str(name)
    }
}

/// An ordered list of stages.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    stages: &'static [Stage],
}

impl Default for Pipeline {
    fn default() -> Self {
        Self { stages: &Stage::ALL }
    }
}

impl Pipeline {
    #[must_use]
    pub const fn stages(&self) -> &'static [Stage] {
        self.stages
    }

    /// Run every stage in order, stopping at the first failure.
    pub async fn run<A: RepoApi>(&self, api: &A, working: &mut WorkingRecord) -> Result<()> {
        for stage in self.stages {
            stage
                .apply(api, working)
                .await
                .map_err(|e| e.enrich_with(|| format!("{stage} stage failed for '{}'", working.path.display())))?;
        }

        Ok(())
    }
}

/// Whether an update wrote the record back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Written,
    Unchanged,
}

/// Load a record, run the pipeline over it, and save it if anything changed.
pub async fn update_record<A: RepoApi>(api: &A, path: impl AsRef<Path>, force: bool) -> Result<UpdateOutcome> {
    let path = path.as_ref();

    let record = load_record(path)?;
    let mut working = WorkingRecord::new(path, record, force);

    Pipeline::default().run(api, &mut working).await?;

    if !working.dirty {
        log::debug!(target: LOG_TARGET, "'{}' is up to date", path.display());
        return Ok(UpdateOutcome::Unchanged);
    }

    save_record(path, &working.record)?;
    Ok(UpdateOutcome::Written)
}

/// Whether a metadata value points at the API host.
fn is_internal_url(value: &Value, base_url: &str) -> bool {
    let base = base_url.trim_end_matches('/');
    value
        .as_str()
        .and_then(|s| s.strip_prefix(base))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
