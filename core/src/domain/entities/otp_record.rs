//! OTP record entity and its verification state machine.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use otp_shared::utils::IdentifierKind;

use crate::errors::OtpError;

/// Shortest code that may be issued
pub const MIN_CODE_LENGTH: usize = 4;

/// Longest code that may be issued
pub const MAX_CODE_LENGTH: usize = 8;

const NUMERIC_ALPHABET: &[u8] = b"0123456789";
const ALPHABETIC_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Purpose a code was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    EmailVerification,
    PhoneVerification,
    PasswordReset,
    #[serde(rename = "login_2fa")]
    Login2fa,
    Transaction,
    AccountRecovery,
    ChangeEmail,
    ChangePhone,
    DeleteAccount,
    Withdrawal,
}

impl OtpType {
    /// Every supported purpose
    pub const ALL: [OtpType; 10] = [
        OtpType::EmailVerification,
        OtpType::PhoneVerification,
        OtpType::PasswordReset,
        OtpType::Login2fa,
        OtpType::Transaction,
        OtpType::AccountRecovery,
        OtpType::ChangeEmail,
        OtpType::ChangePhone,
        OtpType::DeleteAccount,
        OtpType::Withdrawal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OtpType::EmailVerification => "email_verification",
            OtpType::PhoneVerification => "phone_verification",
            OtpType::PasswordReset => "password_reset",
            OtpType::Login2fa => "login_2fa",
            OtpType::Transaction => "transaction",
            OtpType::AccountRecovery => "account_recovery",
            OtpType::ChangeEmail => "change_email",
            OtpType::ChangePhone => "change_phone",
            OtpType::DeleteAccount => "delete_account",
            OtpType::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpType {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OtpType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| OtpError::Configuration {
                message: format!("unknown OTP type: {}", s),
            })
    }
}

/// Alphabet a code is drawn from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    #[default]
    Numeric,
    Alphanumeric,
    Alphabetic,
}

impl CodeType {
    /// Characters a code of this type may contain
    pub fn alphabet(&self) -> &'static [u8] {
        match self {
            CodeType::Numeric => NUMERIC_ALPHABET,
            CodeType::Alphabetic => ALPHABETIC_ALPHABET,
            CodeType::Alphanumeric => ALPHANUMERIC_ALPHABET,
        }
    }

    /// Generate a code of `length` characters uniformly from the alphabet
    /// using the operating system CSPRNG
    pub fn generate(&self, length: usize) -> String {
        let alphabet = self.alphabet();
        let mut rng = OsRng;
        (0..length)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Numeric => "numeric",
            CodeType::Alphanumeric => "alphanumeric",
            CodeType::Alphabetic => "alphabetic",
        }
    }
}

impl FromStr for CodeType {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numeric" => Ok(CodeType::Numeric),
            "alphanumeric" => Ok(CodeType::Alphanumeric),
            "alphabetic" => Ok(CodeType::Alphabetic),
            other => Err(OtpError::Configuration {
                message: format!("unknown code type: {}", other),
            }),
        }
    }
}

/// Lifecycle status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpStatus {
    Pending,
    Verified,
    Expired,
    Failed,
    Cancelled,
}

impl OtpStatus {
    /// Every status except `Pending` is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OtpStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OtpStatus::Pending => "pending",
            OtpStatus::Verified => "verified",
            OtpStatus::Expired => "expired",
            OtpStatus::Failed => "failed",
            OtpStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OtpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel a code is delivered over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Email,
    Sms,
}

impl From<IdentifierKind> for DeliveryMethod {
    fn from(kind: IdentifierKind) -> Self {
        match kind {
            IdentifierKind::Email => DeliveryMethod::Email,
            IdentifierKind::Phone => DeliveryMethod::Sms,
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMethod::Email => f.write_str("email"),
            DeliveryMethod::Sms => f.write_str("sms"),
        }
    }
}

/// Outcome of the most recent delivery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Bounced,
}

/// Request context captured when a code is created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreationContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Caller-supplied extras, omitted when empty
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Delivery bookkeeping and creation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpMetadata {
    pub delivery_method: DeliveryMethod,
    pub delivery_status: DeliveryStatus,
    /// Time of the last successful delivery
    pub sent_at: Option<DateTime<Utc>>,
    /// Number of delivery attempts, including resends
    pub delivery_attempts: u32,
    pub message_id: Option<String>,
    pub last_delivery_error: Option<String>,
    pub context: CreationContext,
    pub cancellation_reason: Option<String>,
}

impl OtpMetadata {
    pub fn new(delivery_method: DeliveryMethod, context: CreationContext) -> Self {
        Self {
            delivery_method,
            delivery_status: DeliveryStatus::Pending,
            sent_at: None,
            delivery_attempts: 0,
            message_id: None,
            last_delivery_error: None,
            context,
            cancellation_reason: None,
        }
    }
}

/// Outcome of one delivery attempt, written as a patch of delivery fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub status: DeliveryStatus,
    pub at: DateTime<Utc>,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryReceipt {
    pub fn from_result(result: &Result<String, String>, at: DateTime<Utc>) -> Self {
        match result {
            Ok(message_id) => Self {
                status: DeliveryStatus::Sent,
                at,
                message_id: Some(message_id.clone()),
                error: None,
            },
            Err(reason) => Self {
                status: DeliveryStatus::Failed,
                at,
                message_id: None,
                error: Some(reason.clone()),
            },
        }
    }
}

/// Parameters for issuing a new record
#[derive(Debug, Clone)]
pub struct NewOtpRecord {
    pub identifier: String,
    pub otp_type: OtpType,
    pub user_id: Option<Uuid>,
    pub length: usize,
    pub code_type: CodeType,
    pub max_attempts: u32,
    pub delivery_method: DeliveryMethod,
    pub context: CreationContext,
}

impl NewOtpRecord {
    /// Check length and attempt bounds
    pub fn validate(&self) -> Result<(), OtpError> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.length) {
            return Err(OtpError::Configuration {
                message: format!(
                    "code length must be between {} and {}, got {}",
                    MIN_CODE_LENGTH, MAX_CODE_LENGTH, self.length
                ),
            });
        }
        if self.max_attempts == 0 {
            return Err(OtpError::Configuration {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Observed state a conditional write is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateGuard {
    pub status: OtpStatus,
    pub attempts: u32,
}

/// Result of applying one verification attempt to a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Lock still active, nothing changed
    Locked { until: DateTime<Utc> },
    /// Past expiry; `transitioned` is true when a pending record became expired
    Expired { transitioned: bool },
    /// Record is in a terminal status, nothing changed
    NotPending { status: OtpStatus },
    /// Wrong code; the attempt was counted
    Rejected {
        remaining_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    },
    /// Correct code; the record is now verified
    Accepted { verified_at: DateTime<Utc> },
}

impl AttemptOutcome {
    /// Whether the record was mutated and the new state must be written
    pub fn requires_persist(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::Expired { transitioned: true }
                | AttemptOutcome::Rejected { .. }
                | AttemptOutcome::Accepted { .. }
        )
    }

    /// Map the outcome to the caller-facing result
    pub fn into_result(self) -> Result<DateTime<Utc>, OtpError> {
        match self {
            AttemptOutcome::Locked { until } => Err(OtpError::Locked { locked_until: until }),
            AttemptOutcome::Expired { .. } => Err(OtpError::Expired),
            AttemptOutcome::NotPending { status } => Err(OtpError::InvalidState { status }),
            AttemptOutcome::Rejected {
                remaining_attempts, ..
            } => Err(OtpError::InvalidCode { remaining_attempts }),
            AttemptOutcome::Accepted { verified_at } => Ok(verified_at),
        }
    }
}

/// A single issued one-time code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub id: Uuid,

    /// Normalized email address or phone number
    pub identifier: String,

    pub otp_type: OtpType,

    /// The code itself; never changes after creation
    pub code: String,

    pub code_type: CodeType,

    pub status: OtpStatus,

    /// Verification attempts made while pending
    pub attempts: u32,

    pub max_attempts: u32,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Verification is refused while this is in the future
    pub locked_until: Option<DateTime<Utc>>,

    pub user_id: Option<Uuid>,

    /// Set exactly when status becomes `Verified`
    pub verified_at: Option<DateTime<Utc>>,

    /// Set exactly when status becomes `Cancelled`
    pub cancelled_at: Option<DateTime<Utc>>,

    pub metadata: OtpMetadata,
}

impl OtpRecord {
    /// Issue a new pending record with a freshly generated code
    ///
    /// # Errors
    ///
    /// `OtpError::Configuration` when the length is outside 4..=8 or
    /// `max_attempts` is zero.
    pub fn issue(params: NewOtpRecord, now: DateTime<Utc>, ttl: Duration) -> Result<Self, OtpError> {
        params.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            identifier: params.identifier,
            otp_type: params.otp_type,
            code: params.code_type.generate(params.length),
            code_type: params.code_type,
            status: OtpStatus::Pending,
            attempts: 0,
            max_attempts: params.max_attempts,
            created_at: now,
            expires_at: now + ttl,
            locked_until: None,
            user_id: params.user_id,
            verified_at: None,
            cancelled_at: None,
            metadata: OtpMetadata::new(params.delivery_method, params.context),
        })
    }

    /// Expiry is derived from the clock, never from the stored status
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map_or(false, |until| until > now)
    }

    /// Pending and not yet past expiry
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OtpStatus::Pending && !self.is_expired_at(now)
    }

    /// Whether a verification attempt would be evaluated against the code
    pub fn can_attempt_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active_at(now) && !self.is_locked_at(now) && self.attempts < self.max_attempts
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Time until expiry, zero once expired
    pub fn time_remaining_at(&self, now: DateTime<Utc>) -> Duration {
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }

    pub fn guard(&self) -> StateGuard {
        StateGuard {
            status: self.status,
            attempts: self.attempts,
        }
    }

    /// Apply one verification attempt
    ///
    /// Checks run in a fixed order: active lock, time expiry, status, then
    /// the attempt is counted and the code compared in constant time. A
    /// mismatch that exhausts the attempts fails the record and locks it for
    /// `lock_for`.
    pub fn attempt(&mut self, input: &str, now: DateTime<Utc>, lock_for: Duration) -> AttemptOutcome {
        if let Some(until) = self.locked_until.filter(|until| *until > now) {
            return AttemptOutcome::Locked { until };
        }

        if self.is_expired_at(now) {
            let transitioned = self.status == OtpStatus::Pending;
            if transitioned {
                self.status = OtpStatus::Expired;
            }
            return AttemptOutcome::Expired { transitioned };
        }

        if self.status != OtpStatus::Pending {
            return AttemptOutcome::NotPending { status: self.status };
        }

        self.attempts += 1;

        if constant_time_eq(self.code.as_bytes(), input.as_bytes()) {
            self.status = OtpStatus::Verified;
            self.verified_at = Some(now);
            return AttemptOutcome::Accepted { verified_at: now };
        }

        if self.attempts >= self.max_attempts {
            self.status = OtpStatus::Failed;
            self.locked_until = Some(now + lock_for);
        }

        AttemptOutcome::Rejected {
            remaining_attempts: self.remaining_attempts(),
            locked_until: self.locked_until,
        }
    }

    /// Cancel an active record
    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<(), OtpError> {
        if !self.is_active_at(now) {
            return Err(OtpError::NotFound);
        }
        self.status = OtpStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.metadata.cancellation_reason = reason;
        Ok(())
    }

    /// Eligible for cleanup: past expiry or in a terminal status
    pub fn is_finished_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now || self.status.is_terminal()
    }

    /// Copy the state-machine fields from `other`, leaving code, expiry and
    /// delivery bookkeeping untouched
    pub fn apply_state_from(&mut self, other: &OtpRecord) {
        self.status = other.status;
        self.attempts = other.attempts;
        self.locked_until = other.locked_until;
        self.verified_at = other.verified_at;
        self.cancelled_at = other.cancelled_at;
        self.metadata.cancellation_reason = other.metadata.cancellation_reason.clone();
    }

    /// Apply a delivery receipt to the bookkeeping fields
    pub fn apply_delivery(&mut self, receipt: &DeliveryReceipt) {
        self.metadata.delivery_attempts += 1;
        self.metadata.delivery_status = receipt.status;
        match receipt.status {
            DeliveryStatus::Sent => {
                self.metadata.sent_at = Some(receipt.at);
                self.metadata.message_id = receipt.message_id.clone();
                self.metadata.last_delivery_error = None;
            }
            _ => {
                self.metadata.last_delivery_error = receipt.error.clone();
            }
        }
    }
}
