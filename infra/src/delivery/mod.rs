//! Delivery Module
//!
//! Channels that carry codes to their recipients:
//!
//! - **SMS Service Trait**: Common interface for SMS providers
//! - **Email Service Trait**: Common interface for email providers
//! - **Twilio**: Production SMS via the Twilio REST API
//! - **HTTP email**: Transactional email via a JSON API
//! - **Mocks**: Console output for development
//! - **Router**: Picks the channel per record and renders the message

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use otp_shared::{DeliveryConfig, DeliveryProvider};

use crate::InfrastructureError;

pub mod email_service;
pub mod http_email;
pub mod message;
pub mod mock;
pub mod router;
pub mod sms_service;
pub mod twilio;

pub use email_service::EmailService;
pub use http_email::HttpEmailService;
pub use message::CodeMessage;
pub use mock::{MockEmailService, MockSmsService, SentMessage};
pub use router::ChannelRouter;
pub use sms_service::{is_valid_phone_number, SmsService};
pub use twilio::TwilioSmsService;

#[cfg(test)]
mod tests;

/// Build the channel router for the configured provider
///
/// # Errors
///
/// `InfrastructureError::Config` when a real provider is selected but its
/// credentials are incomplete. There is no fallback to the mocks.
pub fn create_sender(config: &DeliveryConfig) -> Result<ChannelRouter, InfrastructureError> {
    let timeout = Duration::from_secs(config.timeout_seconds.max(1));

    let router = match config.provider {
        DeliveryProvider::Mock => {
            warn!("Using mock delivery services; codes are logged, not sent");
            ChannelRouter::new(
                Arc::new(MockSmsService::new()),
                Arc::new(MockEmailService::new()),
                config.sender_name.clone(),
            )
        }
        DeliveryProvider::Twilio => ChannelRouter::new(
            Arc::new(TwilioSmsService::new(config.twilio.clone(), timeout)?),
            Arc::new(HttpEmailService::new(config.email.clone(), timeout)?),
            config.sender_name.clone(),
        ),
    };

    let (sms, email) = router.providers();
    info!(sms = sms, email = email, "Delivery channels ready");

    Ok(router)
}
