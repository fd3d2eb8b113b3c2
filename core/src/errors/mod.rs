//! Domain-specific error types and error handling.

mod otp_error;

pub use otp_error::OtpError;

use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to the OTP taxonomy
    #[error(transparent)]
    Otp(#[from] OtpError),
}

impl DomainError {
    /// The OTP-level error, if this is one
    pub fn as_otp(&self) -> Option<&OtpError> {
        match self {
            DomainError::Otp(err) => Some(err),
            _ => None,
        }
    }

    /// Stable error code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "VALIDATION_ERROR",
            DomainError::Storage { .. } => "STORAGE_ERROR",
            DomainError::Internal { .. } => "INTERNAL_ERROR",
            DomainError::Otp(err) => err.code(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
