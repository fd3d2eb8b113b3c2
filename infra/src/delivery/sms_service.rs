//! SMS Service Interface
//!
//! Defines the trait for SMS service implementations that deliver codes.

use async_trait::async_trait;

use crate::InfrastructureError;

/// SMS service trait for sending text messages
///
/// Implementations include:
/// - Twilio Messages API
/// - Mock implementation for development
#[async_trait]
pub trait SmsService: Send + Sync {
    /// Send an SMS message to a phone number
    ///
    /// # Arguments
    ///
    /// * `phone_number` - The recipient's phone number
    /// * `message` - The message content to send
    ///
    /// # Returns
    ///
    /// * `Ok(message_id)` - Unique identifier for the sent message
    /// * `Err(InfrastructureError)` - If sending fails
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<String, InfrastructureError>;

    /// Get the service provider name
    fn provider_name(&self) -> &str;
}

/// Validate phone number format (E.164)
///
/// Checks if the phone number is in valid E.164 format:
/// - Starts with '+'
/// - Contains only digits after '+'
/// - Length between 8 and 15 digits (excluding '+')
pub fn is_valid_phone_number(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };

    (8..=15).contains(&digits.len()) && !digits.starts_with('0') && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_phone_number() {
        assert!(is_valid_phone_number("+14155552671"));
        assert!(is_valid_phone_number("+447911123456"));
        assert!(is_valid_phone_number("+123456789012345"));

        assert!(!is_valid_phone_number("14155552671")); // No plus
        assert!(!is_valid_phone_number("+123")); // Too short
        assert!(!is_valid_phone_number("+1234567890123456")); // Too long
        assert!(!is_valid_phone_number("+123abc4567")); // Contains letters
        assert!(!is_valid_phone_number("+0123456789")); // Leading zero
        assert!(!is_valid_phone_number("+"));
    }
}
