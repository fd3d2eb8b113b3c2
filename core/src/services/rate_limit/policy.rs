//! Rate limit tables keyed by action and OTP type

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::entities::otp_record::OtpType;

/// Request kind a window counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateAction {
    Create,
    Verify,
    Resend,
}

impl fmt::Display for RateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateAction::Create => f.write_str("create"),
            RateAction::Verify => f.write_str("verify"),
            RateAction::Resend => f.write_str("resend"),
        }
    }
}

/// At most `max_requests` within any rolling `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window }
    }

    pub fn per_minutes(max_requests: u32, minutes: i64) -> Self {
        Self::new(max_requests, Duration::minutes(minutes))
    }
}

/// Used when an action has no entry at all
fn fallback_limit() -> RateLimit {
    RateLimit::per_minutes(5, 10)
}

/// Per-action limits with optional per-type overrides
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    defaults: HashMap<RateAction, RateLimit>,
    overrides: HashMap<(RateAction, OtpType), RateLimit>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        let defaults = HashMap::from([
            (RateAction::Create, RateLimit::per_minutes(5, 10)),
            (RateAction::Resend, RateLimit::per_minutes(3, 5)),
            (RateAction::Verify, RateLimit::per_minutes(10, 5)),
        ]);
        let overrides = HashMap::from([
            ((RateAction::Create, OtpType::Login2fa), RateLimit::per_minutes(5, 5)),
            ((RateAction::Create, OtpType::Transaction), RateLimit::per_minutes(3, 10)),
            ((RateAction::Create, OtpType::PasswordReset), RateLimit::per_minutes(3, 15)),
        ]);
        Self { defaults, overrides }
    }
}

impl RateLimitPolicy {
    /// Policy with no entries; every lookup yields the fallback limit
    pub fn empty() -> Self {
        Self {
            defaults: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Set the default limit for an action
    pub fn with_default(mut self, action: RateAction, limit: RateLimit) -> Self {
        self.defaults.insert(action, limit);
        self
    }

    /// Set the limit for an action and a specific OTP type
    pub fn with_override(mut self, action: RateAction, otp_type: OtpType, limit: RateLimit) -> Self {
        self.overrides.insert((action, otp_type), limit);
        self
    }

    pub fn limit_for(&self, action: RateAction, otp_type: OtpType) -> RateLimit {
        self.overrides
            .get(&(action, otp_type))
            .or_else(|| self.defaults.get(&action))
            .copied()
            .unwrap_or_else(fallback_limit)
    }

    /// Longest window any lookup can return
    pub fn longest_window(&self) -> Duration {
        self.defaults
            .values()
            .chain(self.overrides.values())
            .map(|limit| limit.window)
            .chain(std::iter::once(fallback_limit().window))
            .max()
            .unwrap_or_else(|| fallback_limit().window)
    }
}
