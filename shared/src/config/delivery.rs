//! Delivery channel configuration module

use serde::{Deserialize, Serialize};

/// Which transport delivers codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryProvider {
    /// Log codes instead of sending them
    #[default]
    Mock,
    /// SMS through Twilio, email through the HTTP email API
    Twilio,
}

/// Delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Active provider
    pub provider: DeliveryProvider,

    /// Upper bound for a single delivery call in seconds
    pub timeout_seconds: u64,

    /// Product name used in message templates
    pub sender_name: String,

    /// Twilio SMS settings
    pub twilio: TwilioConfig,

    /// HTTP email API settings
    pub email: EmailApiConfig,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            provider: DeliveryProvider::Mock,
            timeout_seconds: 10,
            sender_name: String::from("OtpGuard"),
            twilio: TwilioConfig::default(),
            email: EmailApiConfig::default(),
        }
    }
}

/// Twilio SMS configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: String,
    /// Twilio Auth Token
    pub auth_token: String,
    /// From phone number (E.164)
    pub from_number: String,
    /// Region used when a number has no country code
    pub default_region: Option<String>,
}

impl TwilioConfig {
    /// Whether all credentials are present
    pub fn is_complete(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && self.from_number.starts_with('+')
    }
}

/// Transactional email HTTP API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailApiConfig {
    /// Endpoint accepting JSON messages
    pub endpoint: String,
    /// Bearer token for the endpoint
    pub api_key: String,
    /// Sender address
    pub from_address: String,
}

impl Default for EmailApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            from_address: String::from("no-reply@otpguard.local"),
        }
    }
}

impl EmailApiConfig {
    /// Whether the endpoint and key are present
    pub fn is_complete(&self) -> bool {
        !self.endpoint.is_empty() && !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twilio_config_completeness() {
        let mut twilio = TwilioConfig::default();
        assert!(!twilio.is_complete());

        twilio.account_sid = "AC123".to_string();
        twilio.auth_token = "secret".to_string();
        twilio.from_number = "15005550006".to_string();
        assert!(!twilio.is_complete());

        twilio.from_number = "+15005550006".to_string();
        assert!(twilio.is_complete());
    }
}
