//! In-memory rate limiting for login-code requests.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by normalized email. Two limits enforced:
//! - Per-email: 3 code requests / 10 min
//! - Global: 30 code requests / min
//!
//! TRADE-OFFS
//! ==========
//! State lives in process memory, so limits reset on restart and are not
//! shared across replicas. For an access-code mailer that is an acceptable
//! blast radius; the codes themselves expire server-side regardless.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DEFAULT_PER_EMAIL_LIMIT: usize = 3;
const DEFAULT_PER_EMAIL_WINDOW_SECS: u64 = 600;

const DEFAULT_GLOBAL_LIMIT: usize = 30;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

#[derive(Clone, Copy)]
struct RateLimitConfig {
    per_email_limit: usize,
    per_email_window: Duration,
    global_limit: usize,
    global_window: Duration,
}

impl RateLimitConfig {
    fn from_env() -> Self {
        let per_email_window_secs = env_parse("RATE_LIMIT_PER_EMAIL_WINDOW_SECS", DEFAULT_PER_EMAIL_WINDOW_SECS);
        let global_window_secs = env_parse("RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS);

        Self {
            per_email_limit: env_parse("RATE_LIMIT_PER_EMAIL", DEFAULT_PER_EMAIL_LIMIT),
            per_email_window: Duration::from_secs(per_email_window_secs),
            global_limit: env_parse("RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            global_window: Duration::from_secs(global_window_secs),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("too many code requests for this address (max {limit} per {window_secs}s)")]
    PerEmailExceeded { limit: usize, window_secs: u64 },
    #[error("too many code requests (max {limit} per {window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

struct RateLimiterInner {
    /// Per-email request timestamps.
    email_requests: HashMap<String, VecDeque<Instant>>,
    /// Global request timestamps.
    global_requests: VecDeque<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                email_requests: HashMap::new(),
                global_requests: VecDeque::new(),
            })),
            config: RateLimitConfig::from_env(),
        }
    }

    /// Check both per-email and global limits, then record the request.
    ///
    /// # Errors
    ///
    /// Returns the exceeded limit; nothing is recorded in that case.
    pub fn check_and_record(&self, email: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(email, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_and_record_at(&self, email: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        prune_window(&mut inner.global_requests, now, cfg.global_window);
        if inner.global_requests.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        let email_deque = inner.email_requests.entry(email.to_owned()).or_default();
        prune_window(email_deque, now, cfg.per_email_window);
        if email_deque.len() >= cfg.per_email_limit {
            return Err(RateLimitError::PerEmailExceeded {
                limit: cfg.per_email_limit,
                window_secs: cfg.per_email_window.as_secs(),
            });
        }

        email_deque.push_back(now);
        inner.global_requests.push_back(now);

        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
