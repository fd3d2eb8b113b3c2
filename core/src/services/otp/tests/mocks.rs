//! Mock implementations for testing the OTP service

use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::entities::otp_record::{DeliveryMethod, OtpType};
use crate::services::otp::traits::OtpSenderTrait;

// Mock sender keeping the last code per identifier
pub struct MockSender {
    pub sent_codes: Arc<Mutex<HashMap<String, String>>>,
    pub sent_methods: Arc<Mutex<Vec<DeliveryMethod>>>,
    pub should_fail: AtomicBool,
    pub delay: Option<std::time::Duration>,
    pub calls: AtomicUsize,
}

impl MockSender {
    pub fn new() -> Self {
        Self {
            sent_codes: Arc::new(Mutex::new(HashMap::new())),
            sent_methods: Arc::new(Mutex::new(Vec::new())),
            should_fail: AtomicBool::new(false),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn get_sent_code(&self, identifier: &str) -> Option<String> {
        self.sent_codes.lock().unwrap().get(identifier).cloned()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OtpSenderTrait for MockSender {
    async fn send_code(
        &self,
        method: DeliveryMethod,
        identifier: &str,
        _otp_type: OtpType,
        code: &str,
        _expires_in: Duration,
    ) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err("Mock delivery error".to_string());
        }
        self.sent_codes
            .lock()
            .unwrap()
            .insert(identifier.to_string(), code.to_string());
        self.sent_methods.lock().unwrap().push(method);
        Ok(format!("mock-msg-{}", uuid::Uuid::new_v4()))
    }
}
