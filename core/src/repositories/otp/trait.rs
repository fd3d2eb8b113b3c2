//! OTP repository trait defining the interface for record persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::otp_record::{DeliveryReceipt, OtpRecord, OtpType, StateGuard};
use crate::errors::DomainError;

/// Reason stored on records cancelled because a newer code was issued
pub const SUPERSEDED_REASON: &str = "superseded";

/// Repository trait for OtpRecord persistence operations
///
/// Implementations must apply each method atomically. The service never
/// holds a lock across calls; concurrent verifications of the same record
/// are resolved through [`OtpRepository::compare_and_swap`].
///
/// # Storage Considerations
/// - Records should be removed by the store no later than `expires_at`
/// - Finished records are also removed by [`OtpRepository::delete_finished`]
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Insert a new pending record, cancelling every pending record for the
    /// same identifier and type in the same atomic step
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records that were cancelled
    /// * `Err(DomainError)` - Storage failure, nothing was written
    async fn insert_superseding(&self, record: &OtpRecord, now: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Most recently created record for an identifier and type, in any status
    async fn find_latest(&self, identifier: &str, otp_type: OtpType) -> Result<Option<OtpRecord>, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OtpRecord>, DomainError>;

    /// Write the state-machine fields of `record` if the stored record still
    /// matches `expected`
    ///
    /// Only status, attempts, lock and transition timestamps are written,
    /// plus the cancellation reason.
    ///
    /// # Returns
    /// * `Ok(true)` - The stored record matched and was updated
    /// * `Ok(false)` - The record changed or disappeared, nothing was written
    async fn compare_and_swap(&self, record: &OtpRecord, expected: StateGuard) -> Result<bool, DomainError>;

    /// Patch delivery bookkeeping only
    ///
    /// # Returns
    /// * `Ok(false)` - The record no longer exists
    async fn record_delivery(&self, id: Uuid, receipt: &DeliveryReceipt) -> Result<bool, DomainError>;

    /// Delete records that are past expiry or in a terminal status
    ///
    /// # Returns
    /// Number of deleted records
    async fn delete_finished(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;
}
