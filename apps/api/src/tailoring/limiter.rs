use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::errors::AppError;

/// Per-user sliding window over AI-backed operations.
///
/// A request is admitted when fewer than `limit` admitted requests from the
/// same user fall inside the trailing window. Rejected requests are not
/// recorded. A limit of 0 disables the check.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    requests: Mutex<HashMap<Uuid, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit as usize, Duration::from_secs(60))
    }

    pub fn check(&self, user_id: Uuid) -> Result<(), AppError> {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&self, user_id: Uuid, now: Instant) -> Result<(), AppError> {
        if self.limit == 0 {
            return Ok(());
        }
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let recent = requests.entry(user_id).or_default();
        while recent
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            recent.pop_front();
        }

        if recent.len() >= self.limit {
            let oldest = recent.front().copied().unwrap_or(now);
            let wait = self.window.saturating_sub(now.saturating_duration_since(oldest));
            // round up so a client that waits exactly this long is admitted
            let retry_after_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            return Err(AppError::RateLimited {
                retry_after_secs: retry_after_secs.max(1),
            });
        }

        recent.push_back(now);
        Ok(())
    }
}
