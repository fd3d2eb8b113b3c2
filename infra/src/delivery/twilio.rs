//! Twilio SMS Service Implementation
//!
//! Sends messages through the Twilio Messages REST API:
//! - Recipient numbers normalized to E.164 with `phonenumber`
//! - Retry with exponential backoff on throttling and server errors
//! - Phone numbers masked in logs

use async_trait::async_trait;
use phonenumber::{country, Mode};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use otp_shared::config::TwilioConfig;
use otp_shared::utils::mask_identifier;

use super::sms_service::SmsService;
use crate::InfrastructureError;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Attempts per message, including the first
const MAX_ATTEMPTS: u32 = 3;

/// Initial backoff between attempts
const RETRY_DELAY_MS: u64 = 250;

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: Option<i64>,
    message: String,
}

/// Twilio SMS service implementation
pub struct TwilioSmsService {
    http: reqwest::Client,
    config: TwilioConfig,
    default_region: Option<country::Id>,
    api_base: String,
}

impl TwilioSmsService {
    /// Create a new Twilio SMS service
    ///
    /// # Errors
    ///
    /// `InfrastructureError::Config` when credentials are missing or the
    /// default region is not a known country code.
    pub fn new(config: TwilioConfig, timeout: Duration) -> Result<Self, InfrastructureError> {
        if !config.is_complete() {
            return Err(InfrastructureError::Config(
                "Twilio requires account_sid, auth_token and an E.164 from_number".to_string(),
            ));
        }

        let default_region = match config.default_region.as_deref() {
            Some(region) => Some(region.parse::<country::Id>().map_err(|_| {
                InfrastructureError::Config(format!("Unknown Twilio default region: {}", region))
            })?),
            None => None,
        };

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        info!(
            "Twilio SMS service initialized with from number: {}",
            mask_identifier(&config.from_number)
        );

        Ok(Self {
            http,
            config,
            default_region,
            api_base: TWILIO_API_BASE.to_string(),
        })
    }

    /// Point the client at another API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Validate and normalize phone number to E.164 format
    pub fn normalize_number(&self, phone: &str) -> Result<String, InfrastructureError> {
        let region = if phone.starts_with('+') { None } else { self.default_region };

        let parsed = phonenumber::parse(region, phone).map_err(|e| {
            InfrastructureError::Delivery(format!("Invalid phone number {}: {}", mask_identifier(phone), e))
        })?;

        if !phonenumber::is_valid(&parsed) {
            return Err(InfrastructureError::Delivery(format!(
                "Phone number {} is not a valid number",
                mask_identifier(phone)
            )));
        }

        Ok(parsed.format().mode(Mode::E164).to_string())
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.api_base, self.config.account_sid)
    }

    async fn post_message(&self, to: &str, body: &str) -> Result<String, (bool, InfrastructureError)> {
        let params = [("To", to), ("From", self.config.from_number.as_str()), ("Body", body)];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| (e.is_timeout() || e.is_connect(), InfrastructureError::Http(e)))?;

        let status = response.status();
        if status.is_success() {
            let message: MessageResponse = response
                .json()
                .await
                .map_err(|e| (false, InfrastructureError::Http(e)))?;
            return Ok(message.sid);
        }

        let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
        let detail = match response.json::<ErrorResponse>().await {
            Ok(err) => format!("{} (code {})", err.message, err.code.unwrap_or_default()),
            Err(_) => status.to_string(),
        };

        Err((
            retryable,
            InfrastructureError::Delivery(format!("Twilio rejected message: {}", detail)),
        ))
    }
}

#[async_trait]
impl SmsService for TwilioSmsService {
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<String, InfrastructureError> {
        let to = self.normalize_number(phone_number)?;
        let mut delay = Duration::from_millis(RETRY_DELAY_MS);
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!("Sending SMS attempt {}/{} to {}", attempts, MAX_ATTEMPTS, mask_identifier(&to));

            match self.post_message(&to, message).await {
                Ok(sid) => {
                    info!(
                        provider = "twilio",
                        to = %mask_identifier(&to),
                        message_id = %sid,
                        "SMS sent"
                    );
                    return Ok(sid);
                }
                Err((true, e)) if attempts < MAX_ATTEMPTS => {
                    warn!(
                        "Failed to send SMS (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, MAX_ATTEMPTS, e, delay
                    );
                    sleep(delay).await;
                    delay *= 2;
                }
                Err((_, e)) => {
                    error!(to = %mask_identifier(&to), error = %e, "Failed to send SMS");
                    return Err(e);
                }
            }
        }
    }

    fn provider_name(&self) -> &str {
        "Twilio"
    }
}
