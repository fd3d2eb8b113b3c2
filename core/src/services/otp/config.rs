//! Configuration for the OTP service

use chrono::Duration;
use std::collections::HashMap;

use otp_shared::DeliveryConfig;

use crate::domain::entities::otp_record::OtpType;

/// Per-type durations with a documented default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationTable {
    default: Duration,
    by_type: HashMap<OtpType, Duration>,
}

impl DurationTable {
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            by_type: HashMap::new(),
        }
    }

    pub fn with(mut self, otp_type: OtpType, duration: Duration) -> Self {
        self.by_type.insert(otp_type, duration);
        self
    }

    pub fn get(&self, otp_type: OtpType) -> Duration {
        self.by_type.get(&otp_type).copied().unwrap_or(self.default)
    }

    /// Code lifetimes: 10 minutes unless listed
    pub fn expiry_defaults() -> Self {
        Self::new(Duration::minutes(10))
            .with(OtpType::Login2fa, Duration::minutes(5))
            .with(OtpType::Transaction, Duration::minutes(3))
            .with(OtpType::PasswordReset, Duration::minutes(15))
            .with(OtpType::EmailVerification, Duration::minutes(30))
            .with(OtpType::AccountRecovery, Duration::minutes(60))
    }

    /// Lockout after exhausted attempts: 10 minutes unless listed
    pub fn lock_defaults() -> Self {
        Self::new(Duration::minutes(10))
            .with(OtpType::Login2fa, Duration::minutes(5))
            .with(OtpType::Withdrawal, Duration::minutes(30))
            .with(OtpType::DeleteAccount, Duration::minutes(60))
    }
}

/// Configuration for the OTP service
#[derive(Debug, Clone)]
pub struct OtpServiceConfig {
    /// Code lifetime by type
    pub expiry: DurationTable,
    /// Lock duration by type
    pub lock: DurationTable,
    /// Upper bound for one delivery call
    pub delivery_timeout: std::time::Duration,
    /// Reload-and-retry rounds after a conflicting concurrent write
    pub max_conflict_retries: u32,
}

impl Default for OtpServiceConfig {
    fn default() -> Self {
        Self {
            expiry: DurationTable::expiry_defaults(),
            lock: DurationTable::lock_defaults(),
            delivery_timeout: std::time::Duration::from_secs(10),
            max_conflict_retries: 3,
        }
    }
}

impl OtpServiceConfig {
    /// Defaults with the delivery timeout taken from runtime configuration
    pub fn from_delivery(delivery: &DeliveryConfig) -> Self {
        Self {
            delivery_timeout: std::time::Duration::from_secs(delivery.timeout_seconds),
            ..Default::default()
        }
    }
}
