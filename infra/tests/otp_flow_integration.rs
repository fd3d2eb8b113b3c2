//! End-to-end OTP flows over the in-memory store and mock channels

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

use otp_core::domain::entities::{DeliveryMethod, DeliveryStatus, OtpStatus, OtpType};
use otp_core::errors::{DomainError, OtpError};
use otp_core::repositories::OtpRepository;
use otp_core::services::{
    Clock, CreateOtpRequest, ManualClock, OtpHousekeeper, OtpService, OtpServiceConfig, RateGovernor, RateLimitPolicy,
};
use otp_infra::delivery::{ChannelRouter, MockEmailService, MockSmsService};
use otp_infra::MemoryOtpStore;
use otp_shared::HousekeepingConfig;

struct Flow {
    service: OtpService<MemoryOtpStore, ChannelRouter>,
    store: Arc<MemoryOtpStore>,
    governor: Arc<RateGovernor>,
    clock: Arc<ManualClock>,
    sms: MockSmsService,
    email: MockEmailService,
}

fn flow() -> Flow {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()));
    let store = Arc::new(MemoryOtpStore::new());
    let governor = Arc::new(RateGovernor::new(RateLimitPolicy::default(), clock.clone()));
    let sms = MockSmsService::with_options(false);
    let email = MockEmailService::with_options(false);
    let router = ChannelRouter::new(Arc::new(sms.clone()), Arc::new(email.clone()), "OtpGuard");

    let service = OtpService::new(
        store.clone(),
        Arc::new(router),
        governor.clone(),
        clock.clone(),
        OtpServiceConfig::default(),
    );

    Flow {
        service,
        store,
        governor,
        clock,
        sms,
        email,
    }
}

fn otp_error(err: DomainError) -> OtpError {
    match err {
        DomainError::Otp(otp) => otp,
        other => panic!("Expected an OTP error, got {:?}", other),
    }
}

async fn current_code(flow: &Flow, identifier: &str, otp_type: OtpType) -> String {
    flow.store
        .find_latest(identifier, otp_type)
        .await
        .unwrap()
        .expect("record exists")
        .code
}

#[tokio::test]
async fn test_email_code_is_delivered_and_verified_once() {
    let flow = flow();

    let projection = flow
        .service
        .create(CreateOtpRequest::new("  Ann@Example.com ", OtpType::EmailVerification))
        .await
        .unwrap();
    assert_eq!(projection.identifier, "ann@example.com");
    assert_eq!(projection.delivery_method, DeliveryMethod::Email);
    assert_eq!(projection.delivery_status, DeliveryStatus::Sent);
    assert_eq!(projection.expires_in_seconds, 30 * 60);

    let code = current_code(&flow, "ann@example.com", OtpType::EmailVerification).await;
    let sent = flow.email.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ann@example.com");
    assert!(sent[0].body.contains(&code));
    assert_eq!(flow.sms.get_message_count(), 0);

    let verified = flow
        .service
        .verify("ann@example.com", OtpType::EmailVerification, &code)
        .await
        .unwrap();
    assert_eq!(verified.otp.status, OtpStatus::Verified);
    assert_eq!(verified.verified_at, flow.clock.now());

    let again = flow
        .service
        .verify("ann@example.com", OtpType::EmailVerification, &code)
        .await
        .unwrap_err();
    assert_eq!(
        otp_error(again),
        OtpError::InvalidState {
            status: OtpStatus::Verified
        }
    );
}

#[tokio::test]
async fn test_five_wrong_attempts_lock_the_code() {
    let flow = flow();
    let phone = "+14155552671";

    flow.service
        .create(CreateOtpRequest::new(phone, OtpType::Withdrawal))
        .await
        .unwrap();
    assert_eq!(flow.sms.get_message_count(), 1);

    let code = current_code(&flow, phone, OtpType::Withdrawal).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for expected_remaining in (1..=4).rev() {
        let err = flow
            .service
            .verify(phone, OtpType::Withdrawal, wrong)
            .await
            .unwrap_err();
        assert_eq!(
            otp_error(err),
            OtpError::InvalidCode {
                remaining_attempts: expected_remaining
            }
        );
    }

    let fifth = flow.service.verify(phone, OtpType::Withdrawal, wrong).await.unwrap_err();
    assert_eq!(otp_error(fifth), OtpError::InvalidCode { remaining_attempts: 0 });

    // Even the right code is refused while the lock holds
    let locked_until = flow.clock.now() + Duration::minutes(30);
    let sixth = flow.service.verify(phone, OtpType::Withdrawal, &code).await.unwrap_err();
    assert_eq!(otp_error(sixth), OtpError::Locked { locked_until });

    let info = flow.service.get_info(phone, OtpType::Withdrawal).await.unwrap();
    assert!(info.is_locked);
    assert!(!info.can_attempt);
    assert_eq!(info.status, OtpStatus::Failed);
    assert_eq!(info.remaining_attempts, 0);
}

#[tokio::test]
async fn test_new_code_supersedes_previous_one() {
    let flow = flow();
    let identifier = "bob@example.com";

    flow.service
        .create(CreateOtpRequest::new(identifier, OtpType::PasswordReset))
        .await
        .unwrap();
    let first = flow.store.find_latest(identifier, OtpType::PasswordReset).await.unwrap().unwrap();

    flow.clock.advance(Duration::seconds(30));
    flow.service
        .create(CreateOtpRequest::new(identifier, OtpType::PasswordReset))
        .await
        .unwrap();

    let old = flow.store.find_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(old.status, OtpStatus::Cancelled);

    let code = current_code(&flow, identifier, OtpType::PasswordReset).await;
    assert!(flow
        .service
        .verify(identifier, OtpType::PasswordReset, &code)
        .await
        .is_ok());
    assert_eq!(flow.email.get_message_count(), 2);
}

#[tokio::test]
async fn test_expired_codes_are_rejected_and_cleaned_up() {
    let flow = flow();
    let identifier = "carl@example.com";

    flow.service
        .create(CreateOtpRequest::new(identifier, OtpType::Transaction))
        .await
        .unwrap();
    let code = current_code(&flow, identifier, OtpType::Transaction).await;

    flow.clock.advance(Duration::minutes(3));
    let err = flow
        .service
        .verify(identifier, OtpType::Transaction, &code)
        .await
        .unwrap_err();
    assert_eq!(otp_error(err), OtpError::Expired);

    flow.service
        .create(CreateOtpRequest::new("dana@example.com", OtpType::Transaction))
        .await
        .unwrap();

    let housekeeper = OtpHousekeeper::new(
        flow.store.clone(),
        Some(flow.governor.clone()),
        flow.clock.clone(),
        HousekeepingConfig::default(),
    );
    assert_eq!(housekeeper.run_cleanup().await.unwrap(), 1);
    assert_eq!(flow.store.len().await, 1);

    let info = flow.service.get_info(identifier, OtpType::Transaction).await;
    assert_eq!(otp_error(info.unwrap_err()), OtpError::NotFound);
}

#[tokio::test]
async fn test_failed_sms_keeps_code_and_resend_reports_failure() {
    let flow = flow();
    let phone = "+447911123456";
    flow.sms.set_simulate_failure(true);

    let projection = flow
        .service
        .create(CreateOtpRequest::new(phone, OtpType::Login2fa))
        .await
        .unwrap();
    assert_eq!(projection.delivery_status, DeliveryStatus::Failed);

    let resend = flow.service.resend(phone, OtpType::Login2fa).await.unwrap_err();
    assert!(matches!(otp_error(resend), OtpError::DeliveryFailed { .. }));

    flow.sms.set_simulate_failure(false);
    let resent = flow.service.resend(phone, OtpType::Login2fa).await.unwrap();
    assert_eq!(resent.delivery_method, DeliveryMethod::Sms);
    assert_eq!(resent.time_remaining_seconds, 5 * 60);

    let stored = flow.store.find_latest(phone, OtpType::Login2fa).await.unwrap().unwrap();
    assert_eq!(stored.metadata.delivery_attempts, 3);
    assert_eq!(stored.metadata.delivery_status, DeliveryStatus::Sent);
    assert_eq!(stored.metadata.message_id.as_deref(), Some(resent.message_id.as_str()));
}

#[tokio::test]
async fn test_create_rate_limit_recovers_after_window() {
    let flow = flow();
    let identifier = "erin@example.com";

    for _ in 0..5 {
        flow.service
            .create(CreateOtpRequest::new(identifier, OtpType::ChangeEmail).without_delivery())
            .await
            .unwrap();
    }

    let err = flow
        .service
        .create(CreateOtpRequest::new(identifier, OtpType::ChangeEmail))
        .await
        .unwrap_err();
    assert_eq!(
        otp_error(err),
        OtpError::RateLimited {
            retry_after_seconds: 600
        }
    );

    // Other identifiers are unaffected
    assert!(flow
        .service
        .create(CreateOtpRequest::new("fay@example.com", OtpType::ChangeEmail))
        .await
        .is_ok());

    flow.clock.advance(Duration::minutes(10));
    assert!(flow
        .service
        .create(CreateOtpRequest::new(identifier, OtpType::ChangeEmail))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_phone_without_plus_is_delivered_in_e164() {
    let flow = flow();

    let projection = flow
        .service
        .create(CreateOtpRequest::new("1 (381) 234-5678", OtpType::PhoneVerification))
        .await
        .unwrap();
    assert_eq!(projection.identifier, "+13812345678");
    assert_eq!(projection.delivery_method, DeliveryMethod::Sms);
    assert_eq!(projection.delivery_status, DeliveryStatus::Sent);

    let sent = flow.sms.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "+13812345678");

    // Either spelling reaches the same record
    let resent = flow.service.resend("13812345678", OtpType::PhoneVerification).await.unwrap();
    assert_eq!(resent.delivery_method, DeliveryMethod::Sms);
    assert_eq!(flow.sms.get_message_count(), 2);

    let code = current_code(&flow, "+13812345678", OtpType::PhoneVerification).await;
    assert!(flow
        .service
        .verify("+1 381 234 5678", OtpType::PhoneVerification, &code)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_too_short_phone_is_rejected_before_delivery() {
    let flow = flow();

    let err = flow
        .service
        .create(CreateOtpRequest::new("1234567", OtpType::PhoneVerification))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
    assert_eq!(flow.sms.get_message_count(), 0);
}
