//! Mock delivery services
//!
//! Console-only SMS and email implementations for development and tests.
//! Messages are logged instead of sent and kept for inspection.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use otp_shared::utils::mask_identifier;

use super::email_service::EmailService;
use super::sms_service::{is_valid_phone_number, SmsService};
use crate::InfrastructureError;

/// A message captured by a mock service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: String,
    pub to: String,
    pub subject: Option<String>,
    pub body: String,
}

/// Shared bookkeeping for both mocks
#[derive(Default)]
struct Outbox {
    message_count: AtomicU64,
    simulate_failure: AtomicBool,
    console_output: bool,
    sent: Mutex<Vec<SentMessage>>,
}

impl Outbox {
    fn new(console_output: bool) -> Self {
        Self {
            console_output,
            ..Default::default()
        }
    }

    fn check_failure(&self, provider: &str, to: &str) -> Result<(), InfrastructureError> {
        if self.simulate_failure.load(Ordering::SeqCst) {
            warn!(provider = provider, to = %mask_identifier(to), "Mock delivery simulating failure");
            return Err(InfrastructureError::Delivery(format!("Simulated {} failure", provider)));
        }
        Ok(())
    }

    fn push(&self, provider: &str, to: &str, subject: Option<&str>, body: &str) -> String {
        let message_id = format!("mock_{}", Uuid::new_v4());
        let count = self.message_count.fetch_add(1, Ordering::SeqCst) + 1;

        if self.console_output {
            info!(
                target: "otp_delivery",
                provider = provider,
                count = count,
                message_id = %message_id,
                body = %body,
                "Mock delivery to {}",
                to
            );
        } else {
            info!(
                target: "otp_delivery",
                provider = provider,
                to = %mask_identifier(to),
                message_id = %message_id,
                message_length = body.len(),
                "Message sent (mock)"
            );
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage {
                message_id: message_id.clone(),
                to: to.to_string(),
                subject: subject.map(str::to_string),
                body: body.to_string(),
            });
        }

        message_id
    }

    fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

/// Mock SMS service for development and testing
///
/// Clones share counters and the captured messages.
#[derive(Clone)]
pub struct MockSmsService {
    outbox: Arc<Outbox>,
}

impl MockSmsService {
    /// Mock that logs full messages to the console
    pub fn new() -> Self {
        Self::with_options(true)
    }

    pub fn with_options(console_output: bool) -> Self {
        Self {
            outbox: Arc::new(Outbox::new(console_output)),
        }
    }

    /// Get the total number of messages sent
    pub fn get_message_count(&self) -> u64 {
        self.outbox.message_count.load(Ordering::SeqCst)
    }

    pub fn set_simulate_failure(&self, simulate: bool) {
        self.outbox.simulate_failure.store(simulate, Ordering::SeqCst);
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.outbox.sent()
    }
}

impl Default for MockSmsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsService for MockSmsService {
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<String, InfrastructureError> {
        if !is_valid_phone_number(phone_number) {
            return Err(InfrastructureError::Delivery(format!(
                "Invalid phone number format: {}",
                mask_identifier(phone_number)
            )));
        }

        self.outbox.check_failure(self.provider_name(), phone_number)?;
        Ok(self.outbox.push(self.provider_name(), phone_number, None, message))
    }

    fn provider_name(&self) -> &str {
        "MockSms"
    }
}

/// Mock email service for development and testing
#[derive(Clone)]
pub struct MockEmailService {
    outbox: Arc<Outbox>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::with_options(true)
    }

    pub fn with_options(console_output: bool) -> Self {
        Self {
            outbox: Arc::new(Outbox::new(console_output)),
        }
    }

    pub fn get_message_count(&self) -> u64 {
        self.outbox.message_count.load(Ordering::SeqCst)
    }

    pub fn set_simulate_failure(&self, simulate: bool) {
        self.outbox.simulate_failure.store(simulate, Ordering::SeqCst);
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.outbox.sent()
    }
}

impl Default for MockEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String, InfrastructureError> {
        if !to.contains('@') {
            return Err(InfrastructureError::Delivery(format!(
                "Invalid email address: {}",
                mask_identifier(to)
            )));
        }

        self.outbox.check_failure(self.provider_name(), to)?;
        Ok(self.outbox.push(self.provider_name(), to, Some(subject), body))
    }

    fn provider_name(&self) -> &str {
        "MockEmail"
    }
}
