pub mod otp;

pub use otp::{OtpRepository, SUPERSEDED_REASON};

#[cfg(test)]
pub use otp::MockOtpRepository;
