//! Main OTP service implementation

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use otp_shared::utils::{classify_identifier, mask_identifier, normalize_identifier};

use crate::domain::entities::otp_record::{
    AttemptOutcome, DeliveryMethod, DeliveryReceipt, NewOtpRecord, OtpRecord, OtpStatus, OtpType,
};
use crate::domain::value_objects::{OtpInfo, OtpProjection, ResendResult, VerifiedOtp};
use crate::errors::{DomainError, DomainResult, OtpError};
use crate::repositories::OtpRepository;
use crate::services::clock::Clock;
use crate::services::rate_limit::{RateAction, RateGovernor, RateLimitStatus};

use super::config::OtpServiceConfig;
use super::traits::OtpSenderTrait;
use super::types::CreateOtpRequest;

/// OTP record manager
pub struct OtpService<R: OtpRepository, D: OtpSenderTrait> {
    /// Record persistence
    repository: Arc<R>,
    /// Code delivery
    sender: Arc<D>,
    /// Shared rate governor
    governor: Arc<RateGovernor>,
    clock: Arc<dyn Clock>,
    /// Service configuration
    config: OtpServiceConfig,
}

impl<R: OtpRepository, D: OtpSenderTrait> OtpService<R, D> {
    /// Create a new OTP service
    ///
    /// # Arguments
    ///
    /// * `repository` - Record store
    /// * `sender` - Delivery channel
    /// * `governor` - Rate governor, shared with the housekeeping sweep
    /// * `clock` - Time source for expiry, lockout and rate windows
    /// * `config` - Service configuration
    pub fn new(
        repository: Arc<R>,
        sender: Arc<D>,
        governor: Arc<RateGovernor>,
        clock: Arc<dyn Clock>,
        config: OtpServiceConfig,
    ) -> Self {
        Self {
            repository,
            sender,
            governor,
            clock,
            config,
        }
    }

    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    /// Issue a new code for an identifier
    ///
    /// This method:
    /// 1. Normalizes and classifies the identifier
    /// 2. Validates the code parameters
    /// 3. Passes the `create` rate window
    /// 4. Stores the new record, cancelling any pending one for the same type
    /// 5. Delivers the code when `auto_send` is set
    ///
    /// A failed delivery is recorded on the record and logged but does not
    /// fail the call; the code stays valid and can be resent.
    ///
    /// # Returns
    ///
    /// * `Ok(OtpProjection)` - Redacted view of the new record
    /// * `Err(DomainError)` - Rate limited, invalid parameters or storage failure
    pub async fn create(&self, request: CreateOtpRequest) -> DomainResult<OtpProjection> {
        let identifier = normalize_identifier(&request.identifier);
        let delivery_method = Self::delivery_method_for(&identifier)?;
        let params = NewOtpRecord {
            identifier: identifier.clone(),
            otp_type: request.otp_type,
            user_id: request.user_id,
            length: request.length,
            code_type: request.code_type,
            max_attempts: request.max_attempts,
            delivery_method,
            context: request.context,
        };
        params.validate()?;

        self.admit(&identifier, request.otp_type, RateAction::Create).await?;

        let now = self.clock.now();
        let ttl = self.config.expiry.get(request.otp_type);
        let mut record = OtpRecord::issue(params, now, ttl)?;

        let superseded = self
            .repository
            .insert_superseding(&record, now)
            .await
            .map_err(|e| {
                error!(
                    identifier = %mask_identifier(&identifier),
                    otp_type = %record.otp_type,
                    error = %e,
                    event = "otp_storage_failed",
                    "Failed to store OTP record"
                );
                e
            })?;

        info!(
            identifier = %mask_identifier(&identifier),
            otp_type = %record.otp_type,
            otp_id = %record.id,
            superseded = superseded,
            expires_at = %record.expires_at,
            event = "otp_created",
            "Issued new one-time code"
        );

        if request.auto_send {
            let receipt = self.deliver(&record).await;
            record.apply_delivery(&receipt);
        }

        Ok(OtpProjection::from_record(&record, self.clock.now()))
    }

    /// Verify a code against the latest record for an identifier and type
    ///
    /// Checks run in order: lock, expiry, status, then the attempt is
    /// counted and compared. Attempt and lock state is persisted even when
    /// the code is wrong. The write is conditional on the state that was
    /// read; a conflicting concurrent write causes a reload and a fresh
    /// evaluation.
    ///
    /// # Returns
    ///
    /// * `Ok(VerifiedOtp)` - Code accepted, record is now verified
    /// * `Err(DomainError)` - Rate limited, not found, locked, expired,
    ///   invalid state or invalid code
    pub async fn verify(&self, identifier: &str, otp_type: OtpType, code: &str) -> DomainResult<VerifiedOtp> {
        let identifier = normalize_identifier(identifier);
        self.admit(&identifier, otp_type, RateAction::Verify).await?;

        let lock_for = self.config.lock.get(otp_type);
        let mut last_status = OtpStatus::Pending;

        for round in 0..=self.config.max_conflict_retries {
            let mut record = self
                .repository
                .find_latest(&identifier, otp_type)
                .await?
                .ok_or(OtpError::NotFound)?;
            let expected = record.guard();
            let now = self.clock.now();

            let outcome = record.attempt(code, now, lock_for);
            if outcome.requires_persist() && !self.repository.compare_and_swap(&record, expected).await? {
                debug!(
                    identifier = %mask_identifier(&identifier),
                    otp_id = %record.id,
                    round = round,
                    event = "otp_write_conflict",
                    "Record changed during verification, reloading"
                );
                last_status = expected.status;
                continue;
            }

            Self::log_attempt(&record, &outcome);
            let verified_at = outcome.into_result()?;
            return Ok(VerifiedOtp {
                otp: OtpProjection::from_record(&record, now),
                user_id: record.user_id,
                verified_at,
            });
        }

        warn!(
            identifier = %mask_identifier(&identifier),
            otp_type = %otp_type,
            event = "otp_verify_contention",
            "Gave up verifying after repeated write conflicts"
        );
        Err(OtpError::InvalidState { status: last_status }.into())
    }

    /// Deliver the active code again
    ///
    /// The code, attempt counter and expiry are left unchanged.
    ///
    /// # Returns
    ///
    /// * `Ok(ResendResult)` - Delivered, with the time the code stays valid
    /// * `Err(DomainError)` - Rate limited, no active code or delivery failure
    pub async fn resend(&self, identifier: &str, otp_type: OtpType) -> DomainResult<ResendResult> {
        let identifier = normalize_identifier(identifier);
        self.admit(&identifier, otp_type, RateAction::Resend).await?;

        let record = self.find_active(&identifier, otp_type).await?;
        let receipt = self.deliver(&record).await;

        match receipt.message_id {
            Some(message_id) => {
                info!(
                    identifier = %mask_identifier(&identifier),
                    otp_id = %record.id,
                    event = "otp_resent",
                    "Resent one-time code"
                );
                Ok(ResendResult {
                    time_remaining_seconds: record.time_remaining_at(self.clock.now()).num_seconds(),
                    delivery_method: record.metadata.delivery_method,
                    message_id,
                })
            }
            None => Err(OtpError::DeliveryFailed {
                reason: receipt.error.unwrap_or_else(|| "unknown delivery error".to_string()),
            }
            .into()),
        }
    }

    /// Cancel the active code
    ///
    /// # Returns
    ///
    /// * `Ok(DateTime)` - Cancellation time
    /// * `Err(DomainError)` - No active code
    pub async fn cancel(
        &self,
        identifier: &str,
        otp_type: OtpType,
        reason: Option<String>,
    ) -> DomainResult<DateTime<Utc>> {
        let identifier = normalize_identifier(identifier);
        let mut last_status = OtpStatus::Pending;

        for _ in 0..=self.config.max_conflict_retries {
            let mut record = self.find_active(&identifier, otp_type).await?;
            let expected = record.guard();
            let now = self.clock.now();

            record.cancel(reason.clone(), now)?;
            if self.repository.compare_and_swap(&record, expected).await? {
                info!(
                    identifier = %mask_identifier(&identifier),
                    otp_id = %record.id,
                    reason = reason.as_deref().unwrap_or(""),
                    event = "otp_cancelled",
                    "Cancelled one-time code"
                );
                return Ok(now);
            }
            last_status = expected.status;
        }

        Err(OtpError::InvalidState { status: last_status }.into())
    }

    /// Status snapshot of the latest record for an identifier and type
    pub async fn get_info(&self, identifier: &str, otp_type: OtpType) -> DomainResult<OtpInfo> {
        let identifier = normalize_identifier(identifier);
        let record = self
            .repository
            .find_latest(&identifier, otp_type)
            .await?
            .ok_or(OtpError::NotFound)?;
        Ok(OtpInfo::from_record(&record, self.clock.now()))
    }

    /// Delete records that are past expiry or finished
    ///
    /// # Returns
    ///
    /// Number of deleted records
    pub async fn cleanup_expired(&self) -> DomainResult<usize> {
        let now = self.clock.now();
        let deleted = self.repository.delete_finished(now).await?;
        info!(deleted = deleted, event = "otp_cleanup", "Deleted finished OTP records");
        Ok(deleted)
    }

    fn delivery_method_for(identifier: &str) -> DomainResult<DeliveryMethod> {
        classify_identifier(identifier)
            .map(DeliveryMethod::from)
            .ok_or_else(|| DomainError::Validation {
                message: format!(
                    "identifier is neither an email address nor a phone number: {}",
                    mask_identifier(identifier)
                ),
            })
    }

    async fn find_active(&self, identifier: &str, otp_type: OtpType) -> DomainResult<OtpRecord> {
        let now = self.clock.now();
        match self.repository.find_latest(identifier, otp_type).await? {
            Some(record) if record.is_active_at(now) && !record.is_locked_at(now) => Ok(record),
            _ => Err(OtpError::NotFound.into()),
        }
    }

    async fn admit(&self, identifier: &str, otp_type: OtpType, action: RateAction) -> Result<(), OtpError> {
        let status = self.governor.check_and_record(identifier, otp_type, action).await;
        if let RateLimitStatus::Exceeded {
            retry_after_seconds,
            limit,
            window_seconds,
        } = status
        {
            warn!(
                identifier = %mask_identifier(identifier),
                otp_type = %otp_type,
                action = %action,
                limit = limit,
                window_seconds = window_seconds,
                retry_after_seconds = retry_after_seconds,
                event = "rate_limit_exceeded",
                "OTP request rate limit exceeded"
            );
        }
        status.into_result().map(|_| ())
    }

    /// Send the code and write the outcome as a delivery-only patch
    ///
    /// Runs after the record is stored and holds no lock. The call is
    /// bounded by the configured timeout; failures end up in the receipt.
    async fn deliver(&self, record: &OtpRecord) -> DeliveryReceipt {
        let expires_in = record.time_remaining_at(self.clock.now());
        let send = self.sender.send_code(
            record.metadata.delivery_method,
            &record.identifier,
            record.otp_type,
            &record.code,
            expires_in,
        );

        let result = match tokio::time::timeout(self.config.delivery_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(format!(
                "delivery timed out after {} ms",
                self.config.delivery_timeout.as_millis()
            )),
        };

        let receipt = DeliveryReceipt::from_result(&result, self.clock.now());
        match &result {
            Ok(message_id) => info!(
                identifier = %mask_identifier(&record.identifier),
                otp_id = %record.id,
                method = %record.metadata.delivery_method,
                message_id = %message_id,
                event = "otp_delivered",
                "Delivered one-time code"
            ),
            Err(reason) => warn!(
                identifier = %mask_identifier(&record.identifier),
                otp_id = %record.id,
                method = %record.metadata.delivery_method,
                error = %reason,
                event = "otp_delivery_failed",
                "Failed to deliver one-time code"
            ),
        }

        if let Err(e) = self.repository.record_delivery(record.id, &receipt).await {
            warn!(
                otp_id = %record.id,
                error = %e,
                event = "otp_delivery_bookkeeping_failed",
                "Failed to record delivery outcome"
            );
        }

        receipt
    }

    fn log_attempt(record: &OtpRecord, outcome: &AttemptOutcome) {
        let identifier = mask_identifier(&record.identifier);
        match outcome {
            AttemptOutcome::Accepted { .. } => info!(
                identifier = %identifier,
                otp_id = %record.id,
                attempts = record.attempts,
                event = "otp_verified",
                "One-time code verified"
            ),
            AttemptOutcome::Rejected {
                remaining_attempts,
                locked_until: Some(until),
            } if *remaining_attempts == 0 => warn!(
                identifier = %identifier,
                otp_id = %record.id,
                locked_until = %until,
                event = "otp_locked",
                "Attempts exhausted, code locked"
            ),
            AttemptOutcome::Rejected {
                remaining_attempts, ..
            } => info!(
                identifier = %identifier,
                otp_id = %record.id,
                remaining_attempts = remaining_attempts,
                event = "otp_verify_failed",
                "Wrong one-time code"
            ),
            AttemptOutcome::Locked { until } => info!(
                identifier = %identifier,
                otp_id = %record.id,
                locked_until = %until,
                event = "otp_verify_locked",
                "Verification refused while locked"
            ),
            AttemptOutcome::Expired { transitioned } => info!(
                identifier = %identifier,
                otp_id = %record.id,
                transitioned = transitioned,
                event = "otp_expired",
                "Verification of an expired code"
            ),
            AttemptOutcome::NotPending { status } => info!(
                identifier = %identifier,
                otp_id = %record.id,
                status = %status,
                event = "otp_invalid_state",
                "Verification of a finished code"
            ),
        }
    }
}
