//! OTP record manager
//!
//! Drives the record state machine against a repository:
//! - Code creation with supersession of the previous pending code
//! - Verification with attempt counting and lockout
//! - Resend, cancel and status lookup
//! - Rate governance of create, verify and resend per identifier
//! - Best-effort delivery bounded by a timeout

mod config;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::{DurationTable, OtpServiceConfig};
pub use service::OtpService;
pub use traits::OtpSenderTrait;
pub use types::CreateOtpRequest;
