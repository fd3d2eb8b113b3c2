//! Redis-backed OTP record store
//!
//! Key layout (all under the configured prefix):
//! - `record:{id}` - the record as JSON, expiring at `expires_at`
//! - `latest:{type}:{identifier}` - id of the newest record, same expiry
//!
//! Every mutation is a Lua script so that the read-check-write of a record
//! happens atomically on the server. Once a record's TTL fires it is gone,
//! so lookups after expiry report no record rather than an expired one.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::Script;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use otp_core::domain::entities::{DeliveryReceipt, OtpRecord, OtpStatus, OtpType, StateGuard};
use otp_core::errors::DomainError;
use otp_core::repositories::{OtpRepository, SUPERSEDED_REASON};
use otp_shared::utils::mask_identifier;
use otp_shared::StoreConfig;

use crate::cache::RedisClient;
use crate::InfrastructureError;

/// KEYS: latest pointer, new record
/// ARGV: record JSON, expiry (unix ms), now, reason, record key prefix, new id
const INSERT_SUPERSEDING_SCRIPT: &str = r#"
local cancelled = 0
local previous = redis.call('GET', KEYS[1])
if previous then
    local previous_key = ARGV[5] .. previous
    local raw = redis.call('GET', previous_key)
    if raw then
        local record = cjson.decode(raw)
        if record.status == 'pending' then
            record.status = 'cancelled'
            record.cancelled_at = ARGV[3]
            record.metadata.cancellation_reason = ARGV[4]
            redis.call('SET', previous_key, cjson.encode(record), 'KEEPTTL')
            cancelled = 1
        end
    end
end

redis.call('SET', KEYS[2], ARGV[1])
redis.call('PEXPIREAT', KEYS[2], ARGV[2])
redis.call('SET', KEYS[1], ARGV[6])
redis.call('PEXPIREAT', KEYS[1], ARGV[2])
return cancelled
"#;

/// KEYS: record
/// ARGV: expected status, expected attempts, state patch JSON
const COMPARE_AND_SWAP_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
    return 0
end

local record = cjson.decode(raw)
if record.status ~= ARGV[1] or tonumber(record.attempts) ~= tonumber(ARGV[2]) then
    return 0
end

local patch = cjson.decode(ARGV[3])
for field, value in pairs(patch) do
    if field == 'cancellation_reason' then
        record.metadata.cancellation_reason = value
    else
        record[field] = value
    end
end

redis.call('SET', KEYS[1], cjson.encode(record), 'KEEPTTL')
return 1
"#;

/// KEYS: record
/// ARGV: delivery receipt JSON
const RECORD_DELIVERY_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
    return 0
end

local record = cjson.decode(raw)
local receipt = cjson.decode(ARGV[1])
local metadata = record.metadata

metadata.delivery_attempts = (tonumber(metadata.delivery_attempts) or 0) + 1
metadata.delivery_status = receipt.status
if receipt.status == 'sent' then
    metadata.sent_at = receipt.at
    metadata.message_id = receipt.message_id
    metadata.last_delivery_error = cjson.null
else
    metadata.last_delivery_error = receipt.error
end

redis.call('SET', KEYS[1], cjson.encode(record), 'KEEPTTL')
return 1
"#;

/// State-machine fields written by a compare-and-swap
#[derive(Debug, Serialize)]
pub(crate) struct StatePatch<'a> {
    pub status: OtpStatus,
    pub attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<&'a str>,
}

impl<'a> From<&'a OtpRecord> for StatePatch<'a> {
    fn from(record: &'a OtpRecord) -> Self {
        Self {
            status: record.status,
            attempts: record.attempts,
            locked_until: record.locked_until,
            verified_at: record.verified_at,
            cancelled_at: record.cancelled_at,
            cancellation_reason: record.metadata.cancellation_reason.as_deref(),
        }
    }
}

/// Redis implementation of [`OtpRepository`]
pub struct RedisOtpStore {
    client: RedisClient,
    config: StoreConfig,
    insert_script: Script,
    cas_script: Script,
    delivery_script: Script,
}

impl RedisOtpStore {
    pub fn new(client: RedisClient) -> Self {
        let config = client.config().clone();
        Self {
            client,
            config,
            insert_script: Script::new(INSERT_SUPERSEDING_SCRIPT),
            cas_script: Script::new(COMPARE_AND_SWAP_SCRIPT),
            delivery_script: Script::new(RECORD_DELIVERY_SCRIPT),
        }
    }

    /// Connect to Redis and build the store
    pub async fn connect(config: StoreConfig) -> Result<Self, InfrastructureError> {
        Ok(Self::new(RedisClient::connect(config).await?))
    }

    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        self.client.health_check().await
    }

    fn record_key(&self, id: Uuid) -> String {
        self.config.make_key(&format!("record:{}", id))
    }

    fn record_key_prefix(&self) -> String {
        self.config.make_key("record:")
    }

    fn latest_key(&self, identifier: &str, otp_type: OtpType) -> String {
        self.config.make_key(&format!("latest:{}:{}", otp_type, identifier))
    }

    fn decode(raw: &str) -> Result<OtpRecord, InfrastructureError> {
        Ok(serde_json::from_str(raw)?)
    }
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[async_trait]
impl OtpRepository for RedisOtpStore {
    async fn insert_superseding(&self, record: &OtpRecord, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let body = serde_json::to_string(record).map_err(InfrastructureError::from)?;
        let keys = [
            self.latest_key(&record.identifier, record.otp_type),
            self.record_key(record.id),
        ];
        let args = [
            body,
            record.expires_at.timestamp_millis().to_string(),
            format_timestamp(now),
            SUPERSEDED_REASON.to_string(),
            self.record_key_prefix(),
            record.id.to_string(),
        ];

        let cancelled: i64 = self.client.invoke_script(&self.insert_script, &keys, &args).await?;

        debug!(
            identifier = %mask_identifier(&record.identifier),
            otp_type = %record.otp_type,
            otp_id = %record.id,
            superseded = cancelled,
            "Stored OTP record in Redis"
        );

        Ok(cancelled.max(0) as usize)
    }

    async fn find_latest(&self, identifier: &str, otp_type: OtpType) -> Result<Option<OtpRecord>, DomainError> {
        let pointer = match self.client.get(&self.latest_key(identifier, otp_type)).await? {
            Some(pointer) => pointer,
            None => return Ok(None),
        };

        let id = Uuid::parse_str(&pointer).map_err(|e| DomainError::Storage {
            message: format!("Corrupt latest pointer: {}", e),
        })?;

        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OtpRecord>, DomainError> {
        match self.client.get(&self.record_key(id)).await? {
            Some(raw) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    async fn compare_and_swap(&self, record: &OtpRecord, expected: StateGuard) -> Result<bool, DomainError> {
        let patch = serde_json::to_string(&StatePatch::from(record)).map_err(InfrastructureError::from)?;
        let keys = [self.record_key(record.id)];
        let args = [
            expected.status.as_str().to_string(),
            expected.attempts.to_string(),
            patch,
        ];

        let swapped: i64 = self.client.invoke_script(&self.cas_script, &keys, &args).await?;
        Ok(swapped == 1)
    }

    async fn record_delivery(&self, id: Uuid, receipt: &DeliveryReceipt) -> Result<bool, DomainError> {
        let body = serde_json::to_string(receipt).map_err(InfrastructureError::from)?;
        let keys = [self.record_key(id)];
        let args = [body];

        let patched: i64 = self.client.invoke_script(&self.delivery_script, &keys, &args).await?;
        Ok(patched == 1)
    }

    async fn delete_finished(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let pattern = format!("{}*", self.record_key_prefix());
        let mut cursor = 0;
        let mut deleted = 0;

        loop {
            let (next, keys) = self
                .client
                .scan_match(cursor, &pattern, self.config.scan_batch_size)
                .await?;

            let mut finished = Vec::new();
            for key in keys {
                // The key may have expired between SCAN and GET
                let Some(raw) = self.client.get(&key).await? else {
                    continue;
                };
                match Self::decode(&raw) {
                    Ok(record) if record.is_finished_at(now) => finished.push(key),
                    Ok(_) => {}
                    Err(e) => warn!(key = %key, error = %e, "Skipping undecodable OTP record"),
                }
            }
            deleted += self.client.delete_many(finished).await?;

            if next == 0 {
                break;
            }
            cursor = next;
        }

        if deleted > 0 {
            info!(deleted = deleted, event = "otp_redis_cleanup", "Deleted finished OTP records from Redis");
        }

        Ok(deleted)
    }
}
