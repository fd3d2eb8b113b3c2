//! Mock implementation of OtpRepository for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::otp_record::{DeliveryReceipt, OtpRecord, OtpStatus, OtpType, StateGuard};
use crate::errors::DomainError;

use super::r#trait::{OtpRepository, SUPERSEDED_REASON};

/// Mock OTP repository for testing
///
/// Records are kept in insertion order so the latest one for a key is the
/// last match.
pub struct MockOtpRepository {
    records: Arc<RwLock<Vec<OtpRecord>>>,
    fail_writes: AtomicBool,
    forced_cas_conflicts: AtomicUsize,
    cas_calls: AtomicUsize,
}

impl MockOtpRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            fail_writes: AtomicBool::new(false),
            forced_cas_conflicts: AtomicUsize::new(0),
            cas_calls: AtomicUsize::new(0),
        }
    }

    /// Make every write fail with a storage error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` compare-and-swap calls report a conflict
    pub fn force_cas_conflicts(&self, count: usize) {
        self.forced_cas_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn cas_calls(&self) -> usize {
        self.cas_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored record
    pub async fn all(&self) -> Vec<OtpRecord> {
        self.records.read().await.clone()
    }

    /// Overwrite a stored record, bypassing the state checks
    pub async fn put(&self, record: OtpRecord) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::Storage {
                message: "mock storage unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MockOtpRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpRepository for MockOtpRepository {
    async fn insert_superseding(&self, record: &OtpRecord, now: DateTime<Utc>) -> Result<usize, DomainError> {
        self.check_writable()?;
        let mut records = self.records.write().await;

        let mut cancelled = 0;
        for existing in records.iter_mut().filter(|r| {
            r.identifier == record.identifier && r.otp_type == record.otp_type && r.status == OtpStatus::Pending
        }) {
            existing.status = OtpStatus::Cancelled;
            existing.cancelled_at = Some(now);
            existing.metadata.cancellation_reason = Some(SUPERSEDED_REASON.to_string());
            cancelled += 1;
        }

        records.push(record.clone());
        Ok(cancelled)
    }

    async fn find_latest(&self, identifier: &str, otp_type: OtpType) -> Result<Option<OtpRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.identifier == identifier && r.otp_type == otp_type)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OtpRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn compare_and_swap(&self, record: &OtpRecord, expected: StateGuard) -> Result<bool, DomainError> {
        self.check_writable()?;
        self.cas_calls.fetch_add(1, Ordering::SeqCst);

        let forced = self
            .forced_cas_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Ok(false);
        }

        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(stored) if stored.guard() == expected => {
                stored.apply_state_from(record);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_delivery(&self, id: Uuid, receipt: &DeliveryReceipt) -> Result<bool, DomainError> {
        self.check_writable()?;
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(stored) => {
                stored.apply_delivery(receipt);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_finished(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        self.check_writable()?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !r.is_finished_at(now));
        Ok(before - records.len())
    }
}
