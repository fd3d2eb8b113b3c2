//! Tests for the rate limit tables

use chrono::Duration;

use crate::domain::entities::otp_record::OtpType;
use crate::services::rate_limit::{RateAction, RateLimit, RateLimitPolicy};

#[test]
fn test_default_limits() {
    let policy = RateLimitPolicy::default();

    assert_eq!(
        policy.limit_for(RateAction::Create, OtpType::EmailVerification),
        RateLimit::per_minutes(5, 10)
    );
    assert_eq!(
        policy.limit_for(RateAction::Create, OtpType::Login2fa),
        RateLimit::per_minutes(5, 5)
    );
    assert_eq!(
        policy.limit_for(RateAction::Create, OtpType::Transaction),
        RateLimit::per_minutes(3, 10)
    );
    assert_eq!(
        policy.limit_for(RateAction::Create, OtpType::PasswordReset),
        RateLimit::per_minutes(3, 15)
    );
    assert_eq!(
        policy.limit_for(RateAction::Resend, OtpType::PasswordReset),
        RateLimit::per_minutes(3, 5)
    );
    assert_eq!(
        policy.limit_for(RateAction::Verify, OtpType::Withdrawal),
        RateLimit::per_minutes(10, 5)
    );
    assert_eq!(policy.longest_window(), Duration::minutes(15));
}

#[test]
fn test_overrides_and_fallback() {
    let policy = RateLimitPolicy::empty()
        .with_default(RateAction::Verify, RateLimit::per_minutes(2, 1))
        .with_override(RateAction::Verify, OtpType::Withdrawal, RateLimit::per_minutes(1, 30));

    assert_eq!(
        policy.limit_for(RateAction::Verify, OtpType::Login2fa),
        RateLimit::per_minutes(2, 1)
    );
    assert_eq!(
        policy.limit_for(RateAction::Verify, OtpType::Withdrawal),
        RateLimit::per_minutes(1, 30)
    );
    // No entry for resend at all
    assert_eq!(
        policy.limit_for(RateAction::Resend, OtpType::Login2fa),
        RateLimit::per_minutes(5, 10)
    );
    assert_eq!(policy.longest_window(), Duration::minutes(30));
}
