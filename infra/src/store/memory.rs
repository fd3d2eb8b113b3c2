//! In-memory OTP record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use otp_core::domain::entities::{DeliveryReceipt, OtpRecord, OtpStatus, OtpType, StateGuard};
use otp_core::errors::DomainError;
use otp_core::repositories::{OtpRepository, SUPERSEDED_REASON};

#[derive(Default)]
struct Records {
    by_id: HashMap<Uuid, OtpRecord>,
    /// Newest record id per identifier and type
    latest: HashMap<(String, OtpType), Uuid>,
}

/// Process-local record store
///
/// Every operation runs under one write or read lock, which gives the same
/// atomicity the Redis scripts provide. Expired records stay until
/// [`OtpRepository::delete_finished`] removes them.
#[derive(Default)]
pub struct MemoryOtpStore {
    records: RwLock<Records>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OtpRepository for MemoryOtpStore {
    async fn insert_superseding(&self, record: &OtpRecord, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut records = self.records.write().await;

        let mut cancelled = 0;
        for existing in records.by_id.values_mut().filter(|r| {
            r.identifier == record.identifier && r.otp_type == record.otp_type && r.status == OtpStatus::Pending
        }) {
            existing.status = OtpStatus::Cancelled;
            existing.cancelled_at = Some(now);
            existing.metadata.cancellation_reason = Some(SUPERSEDED_REASON.to_string());
            cancelled += 1;
        }

        records
            .latest
            .insert((record.identifier.clone(), record.otp_type), record.id);
        records.by_id.insert(record.id, record.clone());
        Ok(cancelled)
    }

    async fn find_latest(&self, identifier: &str, otp_type: OtpType) -> Result<Option<OtpRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .latest
            .get(&(identifier.to_string(), otp_type))
            .and_then(|id| records.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OtpRecord>, DomainError> {
        Ok(self.records.read().await.by_id.get(&id).cloned())
    }

    async fn compare_and_swap(&self, record: &OtpRecord, expected: StateGuard) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        match records.by_id.get_mut(&record.id) {
            Some(stored) if stored.guard() == expected => {
                stored.apply_state_from(record);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_delivery(&self, id: Uuid, receipt: &DeliveryReceipt) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        match records.by_id.get_mut(&id) {
            Some(stored) => {
                stored.apply_delivery(receipt);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_finished(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut records = self.records.write().await;
        let Records { by_id, latest } = &mut *records;

        let before = by_id.len();
        by_id.retain(|_, r| !r.is_finished_at(now));
        latest.retain(|_, id| by_id.contains_key(id));

        let deleted = before - by_id.len();
        debug!(deleted = deleted, "Memory store cleanup finished");
        Ok(deleted)
    }
}
