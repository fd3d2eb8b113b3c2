//! Email Service Interface

use async_trait::async_trait;

use crate::InfrastructureError;

/// Email service trait for sending plain-text messages
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Send an email
    ///
    /// # Returns
    ///
    /// * `Ok(message_id)` - Provider identifier for the accepted message
    /// * `Err(InfrastructureError)` - If the provider rejected or never received it
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String, InfrastructureError>;

    fn provider_name(&self) -> &str;
}
