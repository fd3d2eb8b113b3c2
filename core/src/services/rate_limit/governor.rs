//! Sliding-window admission control

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use otp_shared::utils::mask_identifier;

use crate::domain::entities::otp_record::OtpType;
use crate::errors::OtpError;
use crate::services::clock::Clock;

use super::policy::{RateAction, RateLimit, RateLimitPolicy};

/// Window key: one window per identifier, OTP type and action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub identifier: String,
    pub otp_type: OtpType,
    pub action: RateAction,
}

type Window = VecDeque<DateTime<Utc>>;

/// Result of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitStatus {
    /// Request admitted and recorded
    Ok {
        remaining: u32,
        limit: u32,
        window_seconds: i64,
    },
    /// Request rejected and not recorded
    Exceeded {
        retry_after_seconds: u64,
        limit: u32,
        window_seconds: i64,
    },
}

impl RateLimitStatus {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitStatus::Ok { .. })
    }

    pub fn into_result(self) -> Result<u32, OtpError> {
        match self {
            RateLimitStatus::Ok { remaining, .. } => Ok(remaining),
            RateLimitStatus::Exceeded {
                retry_after_seconds, ..
            } => Err(OtpError::RateLimited { retry_after_seconds }),
        }
    }
}

/// What a sweep did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub timestamps_dropped: usize,
    pub windows_removed: usize,
    pub windows_remaining: usize,
}

/// In-memory sliding-window rate governor
///
/// The map is behind an `RwLock` and each window behind its own `Mutex`.
/// Admissions only take the read side of the map, so unrelated keys never
/// wait on each other; the write side is taken briefly to insert a new key
/// and by the removal phase of [`RateGovernor::sweep`].
pub struct RateGovernor {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    windows: RwLock<HashMap<RateKey, Mutex<Window>>>,
}

impl RateGovernor {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Admit and record a request, or reject it without recording
    pub async fn check_and_record(&self, identifier: &str, otp_type: OtpType, action: RateAction) -> RateLimitStatus {
        let limit = self.policy.limit_for(action, otp_type);
        let key = RateKey {
            identifier: identifier.to_string(),
            otp_type,
            action,
        };

        loop {
            {
                let windows = self.windows.read().await;
                if let Some(window) = windows.get(&key) {
                    let mut window = window.lock().await;
                    let status = Self::admit(&mut window, self.clock.now(), limit);
                    if !status.is_allowed() {
                        debug!(
                            identifier = %mask_identifier(identifier),
                            otp_type = %otp_type,
                            action = %action,
                            event = "rate_window_full",
                            "Request rejected by rate window"
                        );
                    }
                    return status;
                }
            }

            // A concurrent sweep may remove the key again before we re-read it
            self.windows.write().await.entry(key.clone()).or_default();
        }
    }

    fn admit(window: &mut Window, now: DateTime<Utc>, limit: RateLimit) -> RateLimitStatus {
        let window_seconds = limit.window.num_seconds();
        Self::prune(window, now - limit.window);

        let used = window.len() as u32;
        if used >= limit.max_requests {
            let retry_after = match window.front() {
                Some(oldest) => *oldest + limit.window - now,
                None => limit.window,
            };
            return RateLimitStatus::Exceeded {
                retry_after_seconds: Self::ceil_seconds(retry_after),
                limit: limit.max_requests,
                window_seconds,
            };
        }

        window.push_back(now);
        RateLimitStatus::Ok {
            remaining: limit.max_requests - used - 1,
            limit: limit.max_requests,
            window_seconds,
        }
    }

    /// Drop timestamps at or before `cutoff`, returning how many went
    fn prune(window: &mut Window, cutoff: DateTime<Utc>) -> usize {
        let before = window.len();
        while window.front().map_or(false, |t| *t <= cutoff) {
            window.pop_front();
        }
        before - window.len()
    }

    /// Whole seconds, rounded up, never below one
    fn ceil_seconds(duration: Duration) -> u64 {
        let millis = duration.num_milliseconds().max(0) as u64;
        ((millis + 999) / 1000).max(1)
    }

    /// Requests currently counted for a key
    pub async fn window_len(&self, identifier: &str, otp_type: OtpType, action: RateAction) -> usize {
        let key = RateKey {
            identifier: identifier.to_string(),
            otp_type,
            action,
        };
        let windows = self.windows.read().await;
        match windows.get(&key) {
            Some(window) => window.lock().await.len(),
            None => 0,
        }
    }

    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Drop timestamps older than `retention` and remove empty windows
    ///
    /// The retention never drops below the longest configured window, so a
    /// sweep cannot relax an active limit. Emptiness is rechecked under the
    /// write lock, so a window that received a request after the first pass
    /// is kept.
    pub async fn sweep(&self, retention: Duration) -> SweepStats {
        let retention = retention.max(self.policy.longest_window());
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut stats = SweepStats::default();
        let mut empty = Vec::new();

        {
            let windows = self.windows.read().await;
            for (key, window) in windows.iter() {
                let mut window = window.lock().await;
                stats.timestamps_dropped += Self::prune(&mut window, cutoff);
                if window.is_empty() {
                    empty.push(key.clone());
                }
            }
        }

        let mut windows = self.windows.write().await;
        for key in empty {
            let still_empty = windows
                .get_mut(&key)
                .map_or(false, |window| window.get_mut().is_empty());
            if still_empty {
                windows.remove(&key);
                stats.windows_removed += 1;
            }
        }
        stats.windows_remaining = windows.len();

        debug!(
            dropped = stats.timestamps_dropped,
            removed = stats.windows_removed,
            remaining = stats.windows_remaining,
            event = "rate_windows_swept",
            "Rate window sweep finished"
        );

        stats
    }
}
