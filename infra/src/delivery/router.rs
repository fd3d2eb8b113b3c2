//! Channel router: the `OtpSenderTrait` implementation

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tracing::warn;

use otp_core::domain::entities::{DeliveryMethod, OtpType};
use otp_core::services::OtpSenderTrait;
use otp_shared::utils::mask_identifier;

use super::email_service::EmailService;
use super::message::CodeMessage;
use super::sms_service::SmsService;

/// Sends codes over SMS or email depending on the record's delivery method
pub struct ChannelRouter {
    sms: Arc<dyn SmsService>,
    email: Arc<dyn EmailService>,
    sender_name: String,
}

impl ChannelRouter {
    pub fn new(sms: Arc<dyn SmsService>, email: Arc<dyn EmailService>, sender_name: impl Into<String>) -> Self {
        Self {
            sms,
            email,
            sender_name: sender_name.into(),
        }
    }

    /// Provider names as `(sms, email)`
    pub fn providers(&self) -> (&str, &str) {
        (self.sms.provider_name(), self.email.provider_name())
    }
}

#[async_trait]
impl OtpSenderTrait for ChannelRouter {
    async fn send_code(
        &self,
        method: DeliveryMethod,
        identifier: &str,
        otp_type: OtpType,
        code: &str,
        expires_in: Duration,
    ) -> Result<String, String> {
        let message = CodeMessage::render(&self.sender_name, otp_type, code, expires_in);

        let result = match method {
            DeliveryMethod::Sms => self.sms.send_sms(identifier, &message.body).await,
            DeliveryMethod::Email => {
                self.email
                    .send_email(identifier, &message.subject, &message.body)
                    .await
            }
        };

        result.map_err(|e| {
            warn!(
                identifier = %mask_identifier(identifier),
                method = %method,
                otp_type = %otp_type,
                error = %e,
                event = "otp_channel_failed",
                "Delivery channel returned an error"
            );
            e.to_string()
        })
    }
}
