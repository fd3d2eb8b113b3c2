//! In-process sliding-window rate governor
//!
//! Throttles create, verify and resend requests per identifier and OTP
//! type. Windows live in memory only and start empty after a restart.

mod governor;
mod policy;

#[cfg(test)]
mod tests;

pub use governor::{RateGovernor, RateKey, RateLimitStatus, SweepStats};
pub use policy::{RateAction, RateLimit, RateLimitPolicy};
