//! Access to the GitHub REST API.
//!
//! Requests rotate over a pool of tokens, transient failures are retried, and
//! list endpoints are turned into exact counts from their pagination metadata.

mod call_counter;
mod client;
mod credentials;
#[cfg(test)]
pub(crate) mod fake;
mod pagination;
mod repo_api;

pub use call_counter::CallCounter;
pub use client::{
    ApiResponse, ClientSettings, DEFAULT_ACCEPT, DEFAULT_API_BASE_URL, DEFAULT_USER_AGENT, GitHubClient, Payload, ResponseShape,
};
pub use credentials::{Credential, CredentialPool};
pub use pagination::{LastPage, parse_last_page};
pub use repo_api::RepoApi;
