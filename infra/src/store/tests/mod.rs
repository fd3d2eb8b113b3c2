
use chrono::{DateTime, Duration, TimeZone, Utc};
use otp_core::domain::entities::{CodeType, CreationContext, DeliveryMethod, NewOtpRecord, OtpRecord, OtpType};

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub(super) fn issue(identifier: &str, otp_type: OtpType, now: DateTime<Utc>) -> OtpRecord {
    OtpRecord::issue(
        NewOtpRecord {
            identifier: identifier.to_string(),
            otp_type,
            user_id: None,
            length: 6,
            code_type: CodeType::Numeric,
            max_attempts: 3,
            delivery_method: DeliveryMethod::Email,
            context: CreationContext::default(),
        },
        now,
        Duration::minutes(10),
    )
    .unwrap()
}
