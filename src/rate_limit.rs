//! Sliding-window message rate limiting per user

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::RateLimitConfig;

/// Minimum time between two throttle notices to the same user
pub const NOTICE_INTERVAL: Duration = Duration::from_secs(2);

/// Idle windows are swept once per this many checks
const PRUNE_EVERY: u64 = 1024;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Over the limit; `notify` is set when the user should be told
    Limited { notify: bool },
}

#[derive(Debug, Default)]
struct UserWindow {
    hits: VecDeque<Instant>,
    last_notice: Option<Instant>,
}

impl UserWindow {
    /// Nothing in the window can affect a decision at `now`
    fn is_idle(&self, now: Instant, window: Duration) -> bool {
        let stale = |at: &Instant| now.saturating_duration_since(*at) > window;
        self.hits.back().map_or(true, stale) && self.last_notice.as_ref().map_or(true, stale)
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_messages: usize,
    admin_id: i64,
    users: DashMap<i64, UserWindow>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, admin_id: i64) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs.max(1)),
            max_messages: config.max_messages.max(2),
            admin_id,
            users: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, user_id: i64) -> RateDecision {
        self.check_at(user_id, Instant::now())
    }

    /// Record a message from `user_id` at `now` and decide whether to handle it
    ///
    /// Rejected messages do not count towards the window.
    pub fn check_at(&self, user_id: i64, now: Instant) -> RateDecision {
        if self.admin_id != 0 && user_id == self.admin_id {
            return RateDecision::Allowed;
        }
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune_at(now);
        }

        let mut entry = self.users.entry(user_id).or_default();
        let user = entry.value_mut();

        while let Some(&oldest) = user.hits.front() {
            if now.saturating_duration_since(oldest) > self.window {
                user.hits.pop_front();
            } else {
                break;
            }
        }

        if user.hits.len() < self.max_messages {
            user.hits.push_back(now);
            return RateDecision::Allowed;
        }

        let notify = user
            .last_notice
            .map_or(true, |last| now.saturating_duration_since(last) >= NOTICE_INTERVAL);
        if notify {
            user.last_notice = Some(now);
        }
        RateDecision::Limited { notify }
    }

    /// Forget users whose window has fully expired at `now`
    pub fn prune_at(&self, now: Instant) {
        let before = self.users.len();
        self.users.retain(|_, user| !user.is_idle(now, self.window));
        let removed = before.saturating_sub(self.users.len());
        if removed > 0 {
            debug!(removed, "Pruned idle rate limit windows");
        }
    }

    /// Number of users with a tracked window
    pub fn tracked_users(&self) -> usize {
        self.users.len()
    }
}
