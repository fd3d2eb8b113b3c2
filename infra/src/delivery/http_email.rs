//! Transactional email over a JSON HTTP API
//!
//! Posts `{from, to, subject, text}` with a bearer token and expects the
//! provider's message id back as `id` (or `message_id`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use otp_shared::config::EmailApiConfig;
use otp_shared::utils::mask_identifier;

use super::email_service::EmailService;
use crate::InfrastructureError;

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AcceptedEmail {
    #[serde(alias = "message_id")]
    id: String,
}

/// HTTP email API client
pub struct HttpEmailService {
    http: reqwest::Client,
    config: EmailApiConfig,
}

impl HttpEmailService {
    pub fn new(config: EmailApiConfig, timeout: Duration) -> Result<Self, InfrastructureError> {
        if !config.is_complete() {
            return Err(InfrastructureError::Config(
                "Email API requires an endpoint and an api_key".to_string(),
            ));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        info!(endpoint = %config.endpoint, "HTTP email service initialized");

        Ok(Self { http, config })
    }
}

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String, InfrastructureError> {
        let payload = OutgoingEmail {
            from: &self.config.from_address,
            to,
            subject,
            text: body,
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(to = %mask_identifier(to), status = %status, "Email API rejected message");
            return Err(InfrastructureError::Delivery(format!(
                "Email API returned {}: {}",
                status,
                detail.trim()
            )));
        }

        let accepted: AcceptedEmail = response.json().await?;
        info!(
            provider = "http_email",
            to = %mask_identifier(to),
            message_id = %accepted.id,
            "Email sent"
        );

        Ok(accepted.id)
    }

    fn provider_name(&self) -> &str {
        "HttpEmail"
    }
}
