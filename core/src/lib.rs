//! # OtpGuard Core
//!
//! Domain layer for one-time codes: the OTP record state machine, the
//! record manager service that drives it, and the in-process rate governor
//! that throttles create/verify/resend requests per identifier.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod errors;

// Re-export commonly used types for convenience
pub use domain::*;
pub use services::*;
pub use repositories::*;
pub use errors::*;
