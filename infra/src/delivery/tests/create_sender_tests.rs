//! Unit tests for provider selection

use otp_shared::config::{EmailApiConfig, TwilioConfig};
use otp_shared::{DeliveryConfig, DeliveryProvider};

use crate::delivery::create_sender;
use crate::InfrastructureError;

#[test]
fn test_mock_provider_builds_mock_channels() {
    let router = create_sender(&DeliveryConfig::default()).unwrap();
    assert_eq!(router.providers(), ("MockSms", "MockEmail"));
}

#[test]
fn test_twilio_without_credentials_is_an_error() {
    let config = DeliveryConfig {
        provider: DeliveryProvider::Twilio,
        ..Default::default()
    };

    assert!(matches!(create_sender(&config), Err(InfrastructureError::Config(_))));
}

#[test]
fn test_twilio_with_credentials_builds_real_channels() {
    let config = DeliveryConfig {
        provider: DeliveryProvider::Twilio,
        twilio: TwilioConfig {
            account_sid: "AC0123456789".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15005550006".to_string(),
            default_region: None,
        },
        email: EmailApiConfig {
            endpoint: "https://mail.example.com/v1/messages".to_string(),
            api_key: "key".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let router = create_sender(&config).unwrap();
    assert_eq!(router.providers(), ("Twilio", "HttpEmail"));
}
