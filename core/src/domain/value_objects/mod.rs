//! Value objects returned to callers of the OTP service.

pub mod otp_projection;

pub use otp_projection::{OtpInfo, OtpProjection, ResendResult, VerifiedOtp};
