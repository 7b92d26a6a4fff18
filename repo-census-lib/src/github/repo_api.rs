use super::call_counter::CallCounter;
use super::client::{GitHubClient, ResponseShape};
use crate::Result;
use ohno::{EnrichableExt, app_err};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Per-repository queries used by the update pipeline.
///
/// `repo` is always an `owner/name` pair as found in a record's `metadata.full_name`.
pub trait RepoApi: Send + Sync + 'static {
    /// Counter of physical calls issued through this API.
    fn calls(&self) -> &CallCounter;

    /// Base URL of the API host. Record fields pointing here are considered internal.
    fn base_url(&self) -> &str;

    /// Bytes of code per language.
    fn languages(&self, repo: &str) -> impl Future<Output = Result<BTreeMap<String, u64>>> + Send;

    /// Topic names.
    fn topics(&self, repo: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Issues and pull requests in any state.
    fn issue_count(&self, repo: &str) -> impl Future<Output = Result<u64>> + Send;

    fn commit_count(&self, repo: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Contributors, including anonymous ones.
    fn contributor_count(&self, repo: &str) -> impl Future<Output = Result<u64>> + Send;
}

#[derive(Debug, Deserialize)]
struct TopicsResponse {
    names: Vec<String>,
}

impl GitHubClient {
    /// Fetch an object endpoint and deserialize its payload.
    async fn fetch_object<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        let response = self.get(resource, ResponseShape::Structured).await?;

        if !response.status.is_success() {
            return Err(app_err!("unexpected status {} from '{resource}'", response.status));
        }

        let value = response
            .payload
            .into_json()
            .ok_or_else(|| app_err!("expected a JSON payload from '{resource}'"))?;

        serde_json::from_value(value).map_err(|e| app_err!("unexpected response shape from '{resource}': {e}"))
    }
}

impl RepoApi for GitHubClient {
    fn calls(&self) -> &CallCounter {
        GitHubClient::calls(self)
    }

    fn base_url(&self) -> &str {
        GitHubClient::base_url(self)
    }

    async fn languages(&self, repo: &str) -> Result<BTreeMap<String, u64>> {
        self.fetch_object(&format!("repos/{repo}/languages"))
            .await
            .map_err(|e| e.enrich_with(|| format!("fetching languages for '{repo}'")))
    }

    async fn topics(&self, repo: &str) -> Result<Vec<String>> {
        self.fetch_object::<TopicsResponse>(&format!("repos/{repo}/topics"))
            .await
            .map(|t| t.names)
            .map_err(|e| e.enrich_with(|| format!("fetching topics for '{repo}'")))
    }

    async fn issue_count(&self, repo: &str) -> Result<u64> {
        self.count(&format!("repos/{repo}/issues?state=all"))
            .await
            .map_err(|e| e.enrich_with(|| format!("counting issues for '{repo}'")))
    }

    async fn commit_count(&self, repo: &str) -> Result<u64> {
        self.count(&format!("repos/{repo}/commits"))
            .await
            .map_err(|e| e.enrich_with(|| format!("counting commits for '{repo}'")))
    }

    async fn contributor_count(&self, repo: &str) -> Result<u64> {
        self.count(&format!("repos/{repo}/contributors?anon=1"))
            .await
            .map_err(|e| e.enrich_with(|| format!("counting contributors for '{repo}'")))
    }
}
