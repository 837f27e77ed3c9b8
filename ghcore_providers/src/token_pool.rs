//! Rotation of GitHub API tokens by remaining rate-limit budget.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::HeaderMap;
use tracing::debug;

const REMAINING: &str = "x-ratelimit-remaining";
const RESET: &str = "x-ratelimit-reset";
const RETRY_AFTER: &str = "retry-after";

#[derive(Debug, Clone)]
struct TokenState {
    token: String,
    remaining: Option<u64>,
    reset: Option<DateTime<Utc>>,
}

impl TokenState {
    fn usable_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining.is_none_or(|n| n > 0) || self.reset.is_some_and(|reset| reset <= now)
    }
}

/// The token to send next and how long to wait before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// `None` sends the request unauthenticated.
    pub token: Option<String>,
    pub wait: Duration,
}

/// Shared pool of API tokens.
///
/// Clients report response headers back through [`TokenPool::record`]; the
/// pool hands out the first token with budget left, or the one that resets
/// soonest together with the time until that reset.
#[derive(Debug, Default)]
pub struct TokenPool {
    tokens: Mutex<Vec<TokenState>>,
}

impl TokenPool {
    #[must_use]
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(|token| TokenState {
                token,
                remaining: None,
                reset: None,
            })
            .collect();
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    /// A pool that sends every request without credentials.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TokenState>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn acquire(&self) -> Lease {
        self.acquire_at(Utc::now())
    }

    #[must_use]
    pub fn acquire_at(&self, now: DateTime<Utc>) -> Lease {
        let tokens = self.lock();
        if let Some(state) = tokens.iter().find(|s| s.usable_at(now)) {
            return Lease {
                token: Some(state.token.clone()),
                wait: Duration::ZERO,
            };
        }
        let Some(state) = tokens.iter().min_by_key(|s| s.reset) else {
            return Lease {
                token: None,
                wait: Duration::ZERO,
            };
        };
        let wait = state
            .reset
            .and_then(|reset| (reset - now).to_std().ok())
            .unwrap_or_default();
        Lease {
            token: Some(state.token.clone()),
            wait,
        }
    }

    /// Update a token's budget from rate-limit response headers.
    pub fn record(&self, token: &str, headers: &HeaderMap) {
        self.record_at(token, headers, Utc::now());
    }

    pub fn record_at(&self, token: &str, headers: &HeaderMap, now: DateTime<Utc>) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };

        let mut tokens = self.lock();
        let Some(state) = tokens.iter_mut().find(|s| s.token == token) else {
            return;
        };
        if let Some(remaining) = header(REMAINING) {
            state.remaining = Some(u64::try_from(remaining).unwrap_or(0));
        }
        if let Some(reset) = header(RESET) {
            state.reset = DateTime::from_timestamp(reset, 0);
        }
        if let Some(retry_after) = header(RETRY_AFTER) {
            state.remaining = Some(0);
            state.reset = Some(now + TimeDelta::seconds(retry_after + 1));
        }
        debug!(
            "Token ...{} has {:?} requests left until {:?}",
            tail(token),
            state.remaining,
            state.reset
        );
    }
}

/// Last characters of a token, for logs.
fn tail(token: &str) -> &str {
    let start = token
        .char_indices()
        .rev()
        .nth(3)
        .map_or(0, |(i, _)| i);
    &token[start..]
}
