//! Tests for the mock OTP repository

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::entities::otp_record::*;
use crate::repositories::otp::{MockOtpRepository, OtpRepository, SUPERSEDED_REASON};

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn record(identifier: &str, otp_type: OtpType, created: i64) -> OtpRecord {
    OtpRecord::issue(
        NewOtpRecord {
            identifier: identifier.to_string(),
            otp_type,
            user_id: None,
            length: 6,
            code_type: CodeType::Numeric,
            max_attempts: 5,
            delivery_method: DeliveryMethod::Email,
            context: CreationContext::default(),
        },
        at(created),
        Duration::minutes(10),
    )
    .unwrap()
}

#[tokio::test]
async fn test_insert_superseding_cancels_pending() {
    let repo = MockOtpRepository::new();
    let first = record("a@b.com", OtpType::PasswordReset, 0);
    let other_type = record("a@b.com", OtpType::Login2fa, 0);
    repo.insert_superseding(&first, at(0)).await.unwrap();
    repo.insert_superseding(&other_type, at(0)).await.unwrap();

    let second = record("a@b.com", OtpType::PasswordReset, 1);
    let cancelled = repo.insert_superseding(&second, at(1)).await.unwrap();
    assert_eq!(cancelled, 1);

    let old = repo.find_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(old.status, OtpStatus::Cancelled);
    assert_eq!(old.cancelled_at, Some(at(1)));
    assert_eq!(old.metadata.cancellation_reason.as_deref(), Some(SUPERSEDED_REASON));

    let untouched = repo.find_by_id(other_type.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, OtpStatus::Pending);

    let latest = repo
        .find_latest("a@b.com", OtpType::PasswordReset)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, second.id);
}

#[tokio::test]
async fn test_compare_and_swap_matches_guard() {
    let repo = MockOtpRepository::new();
    let stored = record("a@b.com", OtpType::Transaction, 0);
    repo.insert_superseding(&stored, at(0)).await.unwrap();

    let expected = stored.guard();
    let mut updated = stored.clone();
    updated.attempt("not-it", at(1), Duration::minutes(10));

    assert!(repo.compare_and_swap(&updated, expected).await.unwrap());
    // Same guard again no longer matches
    assert!(!repo.compare_and_swap(&updated, expected).await.unwrap());

    let reloaded = repo.find_by_id(stored.id).await.unwrap().unwrap();
    assert_eq!(reloaded.attempts, 1);
    assert_eq!(reloaded.code, stored.code);
}

#[tokio::test]
async fn test_delete_finished() {
    let repo = MockOtpRepository::new();
    let expired = record("x@y.com", OtpType::EmailVerification, 0);
    let live = record("z@y.com", OtpType::EmailVerification, 20);
    repo.insert_superseding(&expired, at(0)).await.unwrap();
    repo.insert_superseding(&live, at(20)).await.unwrap();

    let deleted = repo.delete_finished(at(25)).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(repo.find_by_id(expired.id).await.unwrap().is_none());
    assert!(repo.find_by_id(live.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_fail_writes() {
    let repo = MockOtpRepository::new();
    repo.set_fail_writes(true);
    let result = repo
        .insert_superseding(&record("a@b.com", OtpType::Withdrawal, 0), at(0))
        .await;
    assert!(result.is_err());
    assert!(repo.all().await.is_empty());
}
