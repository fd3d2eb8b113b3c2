//! Failure taxonomy of the OTP lifecycle

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::otp_record::OtpStatus;

/// Caller-facing OTP failures
///
/// Every variant is recoverable by the caller: wait, request a resend, or
/// start over. `Configuration` is the exception and signals a programming
/// or deployment error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Too many requests. Try again in {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    #[error("No active code found")]
    NotFound,

    #[error("Code is locked until {locked_until}")]
    Locked { locked_until: DateTime<Utc> },

    #[error("Code has expired")]
    Expired,

    #[error("Code can no longer be used (status: {status})")]
    InvalidState { status: OtpStatus },

    #[error("Invalid code. {remaining_attempts} attempt(s) remaining")]
    InvalidCode { remaining_attempts: u32 },

    #[error("Code delivery failed: {reason}")]
    DeliveryFailed { reason: String },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },
}

impl OtpError {
    pub fn code(&self) -> &'static str {
        match self {
            OtpError::RateLimited { .. } => "RATE_LIMITED",
            OtpError::NotFound => "OTP_NOT_FOUND",
            OtpError::Locked { .. } => "OTP_LOCKED",
            OtpError::Expired => "OTP_EXPIRED",
            OtpError::InvalidState { .. } => "OTP_INVALID_STATE",
            OtpError::InvalidCode { .. } => "OTP_INVALID_CODE",
            OtpError::DeliveryFailed { .. } => "OTP_DELIVERY_FAILED",
            OtpError::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }

    /// Whether the caller sent something wrong, as opposed to a fault on our side
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            OtpError::DeliveryFailed { .. } | OtpError::Configuration { .. }
        )
    }
}
