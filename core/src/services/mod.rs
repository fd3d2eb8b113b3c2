//! Business services containing domain logic and use cases.

pub mod clock;
pub mod housekeeping;
pub mod otp;
pub mod rate_limit;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use housekeeping::OtpHousekeeper;
pub use otp::{CreateOtpRequest, DurationTable, OtpSenderTrait, OtpService, OtpServiceConfig};
pub use rate_limit::{RateAction, RateGovernor, RateLimit, RateLimitPolicy, RateLimitStatus, SweepStats};
