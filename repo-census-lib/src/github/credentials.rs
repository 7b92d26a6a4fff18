//! Rotation over a pool of API tokens, each with its own rate-limit quota.

use crate::Result;
use chrono::{DateTime, Utc};
use core::fmt::{Debug, Formatter};
use core::time::Duration;
use ohno::bail;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

const LOG_TARGET: &str = "credential";

/// An API token handed out by a [`CredentialPool`].
///
/// Cloning is cheap. The token itself never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    index: usize,
    token: Arc<str>,
}

impl Credential {
    /// Position of this credential within its pool.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
struct PoolState {
    cursor: usize,
    resume_at: Vec<Option<Instant>>,
}

impl PoolState {
    fn wait(&self, index: usize, now: Instant) -> Duration {
        self.resume_at[index].map_or(Duration::ZERO, |at| at.saturating_duration_since(now))
    }

    /// Clears the resume time and returns `true` if the credential is usable at `now`.
    fn claim(&mut self, index: usize, now: Instant) -> bool {
        if self.wait(index, now).is_zero() {
            self.resume_at[index] = None;
            true
        } else {
            false
        }
    }

    fn earliest(&self, now: Instant) -> (usize, Duration) {
        (0..self.resume_at.len())
            .map(|index| (index, self.wait(index, now)))
            .min_by_key(|&(_, wait)| wait)
            .unwrap_or((self.cursor, Duration::ZERO))
    }
}

/// A set of API tokens plus the bookkeeping needed to rotate between them.
///
/// Selection starts at the cursor and only looks at the immediate successor
/// while at most one token is exhausted. When both are blocked, the cursor jumps
/// to the token with the earliest resume time and the caller sleeps exactly
/// until then.
pub struct CredentialPool {
    tokens: Vec<Arc<str>>,
    state: Mutex<PoolState>,
}

impl Debug for CredentialPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("tokens", &self.tokens.len())
            .field("state", &self.state)
            .finish()
    }
}

impl CredentialPool {
    /// Create a pool from a list of tokens.
    ///
    /// The cursor starts on the last token, so the first selection tries it first.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<Arc<str>> = tokens.into_iter().map(|t| Arc::from(t.as_ref().trim())).collect();

        if tokens.is_empty() {
            bail!("at least one GitHub API token is required");
        }

        if let Some(pos) = tokens.iter().position(|t| t.is_empty() || !t.chars().all(|c| c.is_ascii_graphic())) {
            bail!("GitHub API token #{} is empty or contains invalid characters", pos + 1);
        }

        let len = tokens.len();
        Ok(Self {
            tokens,
            state: Mutex::new(PoolState {
                cursor: len - 1,
                resume_at: vec![None; len],
            }),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Wait until a credential is usable and return it.
    ///
    /// Never fails; it can only delay.
    pub async fn select_usable(&self) -> Credential {
        loop {
            match self.try_select(Instant::now()) {
                Ok(credential) => return credential,
                Err((index, wait)) => {
                    log::info!(
                        target: LOG_TARGET,
                        "All tokens are rate limited, sleeping {:.1}s for token #{index}",
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Mark a credential as unusable until `resume_at`.
    ///
    /// A resume time in the past leaves the credential immediately usable.
    pub fn invalidate(&self, credential: &Credential, resume_at: DateTime<Utc>) {
        let delay = (resume_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        self.invalidate_for(credential, delay);
    }

    /// Mark a credential as unusable for `delay` from now.
    pub fn invalidate_for(&self, credential: &Credential, delay: Duration) {
        let resume = Instant::now() + delay;
        let mut state = self.state.lock().expect("lock not poisoned");
        state.resume_at[credential.index] = Some(resume);
        drop(state);

        log::warn!(
            target: LOG_TARGET,
            "Token #{} hit its rate limit, unusable for {:.0}s",
            credential.index,
            delay.as_secs_f64()
        );
    }

    /// One selection decision. Returns the credential, or the index to wait on and for how long.
    fn try_select(&self, now: Instant) -> core::result::Result<Credential, (usize, Duration)> {
        let mut state = self.state.lock().expect("lock not poisoned");

        let current = state.cursor;
        if state.claim(current, now) {
            return Ok(self.credential(current));
        }

        let next = (current + 1) % self.tokens.len();
        if state.wait(next, now) < state.wait(current, now) {
            state.cursor = next;
            log::info!(target: LOG_TARGET, "Moving to token #{next}");
            if state.claim(next, now) {
                return Ok(self.credential(next));
            }
        }

        let (earliest, wait) = state.earliest(now);
        state.cursor = earliest;
        Err((earliest, wait))
    }

    fn credential(&self, index: usize) -> Credential {
        Credential {
            index,
            token: Arc::clone(&self.tokens[index]),
        }
    }
}
