//! Traits for delivery integration

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::entities::otp_record::{DeliveryMethod, OtpType};

/// Trait for code delivery integration
#[async_trait]
pub trait OtpSenderTrait: Send + Sync {
    /// Deliver a code, returning the provider message id
    async fn send_code(
        &self,
        method: DeliveryMethod,
        identifier: &str,
        otp_type: OtpType,
        code: &str,
        expires_in: Duration,
    ) -> Result<String, String>;
}
