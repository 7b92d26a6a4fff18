//! GitHub API client
//!
//! Issues authenticated GET requests using tokens from a [`CredentialPool`] and
//! classifies every response as a success, a transient failure, a provider-busy
//! signal, or a rate limit. Transient failures consume a bounded retry budget.
//! Busy responses and rate limits never do: the former is retried after a fixed
//! delay, the latter is routed through token rotation.

use super::call_counter::CallCounter;
use super::credentials::{Credential, CredentialPool};
use crate::Result;
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::bail;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Deserialize;
use std::sync::Arc;

const LOG_TARGET: &str = "    github";

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "repo-census";

/// Preview media type that includes repository topics.
pub const DEFAULT_ACCEPT: &str = "application/vnd.github.mercy-preview+json";

const DEFAULT_MAX_RETRIES: u32 = 10;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_BUSY_DELAY: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Used when a rate-limited response carries no usable reset header.
const FALLBACK_RATE_LIMIT_WAIT_SECS: i64 = 3600;

/// Upper bound applied to `Retry-After` values.
const MAX_RETRY_AFTER_SECS: u64 = 86_400;

const RATE_LIMIT_MARKER: &str = "API rate limit exceeded";

/// Whether a response body should be parsed as JSON or returned verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Structured,
    Raw,
}

/// A response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Raw(String),
}

impl Payload {
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    #[must_use]
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

/// A successfully completed call.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub payload: Payload,
}

/// Tunables for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub user_agent: String,
    pub accept: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub busy_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            busy_delay: DEFAULT_BUSY_DELAY,
        }
    }
}

/// Classification of a single physical call.
#[derive(Debug)]
enum Outcome {
    Success(ApiResponse),
    Transient(String),
    Busy,
    RateLimited(DateTime<Utc>),
}

/// Error body returned by GitHub, only the fields we need
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Rate-limited GitHub API client rotating over multiple tokens.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    settings: ClientSettings,
    pool: Arc<CredentialPool>,
    calls: Arc<CallCounter>,
}

impl GitHubClient {
    pub fn new(settings: ClientSettings, pool: Arc<CredentialPool>, calls: Arc<CallCounter>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_str(&settings.accept)?);

        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        log::info!(
            target: LOG_TARGET,
            "Using {} token(s), theoretical max throughput {} requests/hour",
            pool.len(),
            pool.len() * 5000
        );

        Ok(Self {
            http,
            settings,
            pool,
            calls,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    #[must_use]
    pub const fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    #[must_use]
    pub const fn calls(&self) -> &Arc<CallCounter> {
        &self.calls
    }

    /// Resolve a resource to a full URL.
    ///
    /// Absolute URLs on the API host pass through untouched; anything else is
    /// treated as a path relative to the base URL.
    #[must_use]
    pub fn resource_url(&self, resource: &str) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        if resource.starts_with(base) {
            resource.to_string()
        } else {
            format!("{base}/{}", resource.trim_start_matches('/'))
        }
    }

    /// Fetch a resource using the configured retry budget.
    pub async fn get(&self, resource: &str, shape: ResponseShape) -> Result<ApiResponse> {
        self.execute(resource, shape, self.settings.max_retries).await
    }

    /// Fetch a resource, retrying transient failures up to `retries` times.
    ///
    /// Only exhausting the retry budget is reported as an error. Busy responses
    /// and rate limits are retried without limit.
    pub async fn execute(&self, resource: &str, shape: ResponseShape, retries: u32) -> Result<ApiResponse> {
        let url = self.resource_url(resource);
        let mut retries_left = retries;

        loop {
            let credential = self.pool.select_usable().await;

            match self.attempt(&url, &credential, shape).await {
                Outcome::Success(response) => return Ok(response),

                Outcome::Busy => {
                    log::debug!(
                        target: LOG_TARGET,
                        "Request to '{url}' accepted but not ready, retrying in {}s",
                        self.settings.busy_delay.as_secs()
                    );
                    tokio::time::sleep(self.settings.busy_delay).await;
                }

                Outcome::RateLimited(resume_at) => {
                    log::debug!(
                        target: LOG_TARGET,
                        "Token #{} rate limited on '{url}', resets at {}",
                        credential.index(),
                        resume_at.with_timezone(&chrono::Local).format("%T")
                    );
                    self.pool.invalidate(&credential, resume_at);
                }

                Outcome::Transient(reason) => {
                    if retries_left == 0 {
                        log::error!(target: LOG_TARGET, "Request failed all retries: {url}");
                        bail!("request to '{url}' failed after {retries} retries: {reason}");
                    }

                    retries_left -= 1;
                    log::debug!(
                        target: LOG_TARGET,
                        "Retrying '{url}' ({retries_left} retries left) after: {reason}"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
            }
        }
    }

    /// Perform one physical call and classify the result.
    async fn attempt(&self, url: &str, credential: &Credential, shape: ResponseShape) -> Outcome {
        let mut auth = match HeaderValue::from_str(&format!("token {}", credential.token())) {
            Ok(value) => value,
            Err(e) => return Outcome::Transient(format!("invalid authorization header: {e}")),
        };
        auth.set_sensitive(true);

        let response = self.http.get(url).header(AUTHORIZATION, auth).send().await;
        self.calls.record();

        let response = match response {
            Ok(r) => r,
            Err(e) => return Outcome::Transient(format!("{e}")),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Outcome::Transient(format!("could not read response body: {e}")),
        };

        classify(status, headers, body, shape, Utc::now())
    }
}

/// Classify a completed HTTP exchange.
fn classify(status: StatusCode, headers: HeaderMap, body: String, shape: ResponseShape, now: DateTime<Utc>) -> Outcome {
    if status == StatusCode::ACCEPTED {
        return Outcome::Busy;
    }

    if let Some(resume_at) = rate_limit_resume(status, &headers, &body, now) {
        return Outcome::RateLimited(resume_at);
    }

    if status.is_server_error() {
        return Outcome::Transient(format!("server error {status}"));
    }

    if body.trim().is_empty() {
        return Outcome::Transient("missing body".to_string());
    }

    let payload = match shape {
        ResponseShape::Structured => match serde_json::from_str(&body) {
            Ok(value) => Payload::Json(value),
            Err(e) => return Outcome::Transient(format!("malformed JSON body: {e}")),
        },
        ResponseShape::Raw => Payload::Raw(body),
    };

    Outcome::Success(ApiResponse { status, headers, payload })
}

/// Determine whether a response signals a rate limit, and if so, when the token becomes usable again.
fn rate_limit_resume(status: StatusCode, headers: &HeaderMap, body: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if body_reports_rate_limit(body) {
        return Some(
            extract_rate_limit_reset(headers).unwrap_or_else(|| now + chrono::Duration::seconds(FALLBACK_RATE_LIMIT_WAIT_SECS)),
        );
    }

    // Secondary rate limit: 403/429 with Retry-After
    if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
        && let Some(delay) = parse_retry_after(headers)
    {
        return Some(now + chrono::Duration::seconds(delay.min(MAX_RETRY_AFTER_SECS).cast_signed()));
    }

    None
}

fn body_reports_rate_limit(body: &str) -> bool {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .is_some_and(|message| message.starts_with(RATE_LIMIT_MARKER))
}

/// Extract the absolute reset time from the `x-ratelimit-reset` header
fn extract_rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let reset_timestamp = headers.get("x-ratelimit-reset")?.to_str().ok()?.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(reset_timestamp, 0)
}

/// Parse the `Retry-After` header value as seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()
}
