//! Redacted views of an OTP record.
//!
//! None of these carry the code itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::otp_record::{
    DeliveryMethod, DeliveryStatus, OtpRecord, OtpStatus, OtpType,
};

/// Projection returned by create and verify
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpProjection {
    pub id: Uuid,
    pub identifier: String,
    pub otp_type: OtpType,
    pub status: OtpStatus,
    pub expires_at: DateTime<Utc>,
    /// Seconds until expiry at the time the projection was taken
    pub expires_in_seconds: i64,
    pub max_attempts: u32,
    pub delivery_method: DeliveryMethod,
    pub delivery_status: DeliveryStatus,
}

impl OtpProjection {
    pub fn from_record(record: &OtpRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            identifier: record.identifier.clone(),
            otp_type: record.otp_type,
            status: record.status,
            expires_at: record.expires_at,
            expires_in_seconds: record.time_remaining_at(now).num_seconds(),
            max_attempts: record.max_attempts,
            delivery_method: record.metadata.delivery_method,
            delivery_status: record.metadata.delivery_status,
        }
    }
}

/// Successful verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifiedOtp {
    pub otp: OtpProjection,
    pub user_id: Option<Uuid>,
    pub verified_at: DateTime<Utc>,
}

/// Successful resend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResendResult {
    /// Seconds the existing code stays valid
    pub time_remaining_seconds: i64,
    pub delivery_method: DeliveryMethod,
    pub message_id: String,
}

/// Status snapshot for the latest record of an identifier and type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpInfo {
    pub id: Uuid,
    pub otp_type: OtpType,
    pub status: OtpStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub remaining_attempts: u32,
    pub time_remaining_seconds: i64,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub can_attempt: bool,
    pub delivery_status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

impl OtpInfo {
    pub fn from_record(record: &OtpRecord, now: DateTime<Utc>) -> Self {
        let is_locked = record.is_locked_at(now);
        Self {
            id: record.id,
            otp_type: record.otp_type,
            status: record.status,
            attempts: record.attempts,
            max_attempts: record.max_attempts,
            remaining_attempts: record.remaining_attempts(),
            time_remaining_seconds: record.time_remaining_at(now).num_seconds(),
            expires_at: record.expires_at,
            is_expired: record.is_expired_at(now),
            is_locked,
            locked_until: if is_locked { record.locked_until } else { None },
            can_attempt: record.can_attempt_at(now),
            delivery_status: record.metadata.delivery_status,
            created_at: record.created_at,
        }
    }
}
