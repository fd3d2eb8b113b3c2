//! Domain entities representing core business objects.

pub mod otp_record;

// Re-export commonly used types
pub use otp_record::{
    AttemptOutcome, CodeType, CreationContext, DeliveryMethod, DeliveryReceipt, DeliveryStatus,
    NewOtpRecord, OtpMetadata, OtpRecord, OtpStatus, OtpType, StateGuard, MAX_CODE_LENGTH,
    MIN_CODE_LENGTH,
};
