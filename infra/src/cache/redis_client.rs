//! Redis client implementation
//!
//! Multiplexed async connection with connection retry, retried reads and
//! single-shot Lua script invocation for the record store.

use redis::{aio::MultiplexedConnection, AsyncCommands, Client, FromRedisValue, RedisError, RedisResult, Script};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use otp_shared::StoreConfig;

use crate::InfrastructureError;

/// Longest pause between two retries
const MAX_RETRY_DELAY_MS: u64 = 5000;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis client with connection retry logic
///
/// Cloning is cheap; all clones share the multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: StoreConfig,
}

impl RedisClient {
    /// Connect using the retry settings from `config`
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Redis client or error
    pub async fn connect(config: StoreConfig) -> Result<Self, InfrastructureError> {
        info!("Creating Redis client with URL: {}", mask_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection =
            Self::create_connection_with_retry(client, config.connect_retries.max(1), config.retry_delay_ms).await?;

        info!("Redis client created successfully");

        Ok(Self { connection, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: Client,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            match client.get_multiplexed_async_connection().await {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// Get a string value
    ///
    /// # Returns
    /// * `Ok(None)` - The key does not exist or has expired
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        let key = key.to_string();
        self.execute_with_retry(move |mut conn| {
            let key = key.clone();
            Box::pin(async move { conn.get::<_, Option<String>>(key).await })
        })
        .await
        .map_err(InfrastructureError::Cache)
    }

    /// Delete keys, returning how many existed
    pub async fn delete_many(&self, keys: Vec<String>) -> Result<usize, InfrastructureError> {
        if keys.is_empty() {
            return Ok(0);
        }

        self.execute_with_retry(move |mut conn| {
            let keys = keys.clone();
            Box::pin(async move { conn.del::<_, usize>(keys).await })
        })
        .await
        .map_err(InfrastructureError::Cache)
    }

    /// One SCAN round over keys matching `pattern`
    ///
    /// # Returns
    /// The next cursor (zero when the iteration is complete) and a batch of keys
    pub async fn scan_match(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), InfrastructureError> {
        let pattern = pattern.to_string();
        self.execute_with_retry(move |mut conn| {
            let pattern = pattern.clone();
            Box::pin(async move {
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query_async::<_, (u64, Vec<String>)>(&mut conn)
                    .await
            })
        })
        .await
        .map_err(InfrastructureError::Cache)
    }

    /// Run a Lua script once
    ///
    /// Scripts mutate state and are not idempotent, so failures are never
    /// retried here.
    pub async fn invoke_script<T>(
        &self,
        script: &Script,
        keys: &[String],
        args: &[String],
    ) -> Result<T, InfrastructureError>
    where
        T: FromRedisValue,
    {
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }

        let mut conn = self.connection.clone();
        invocation.invoke_async(&mut conn).await.map_err(|e| {
            error!("Redis script failed: {}", e);
            InfrastructureError::Cache(e)
        })
    }

    /// Execute a Redis operation with automatic retry logic
    ///
    /// Exponential backoff starting at the configured delay.
    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let max_retries = self.config.connect_retries.max(1);
        let mut attempts = 0;
        let mut delay = self.config.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            match operation(conn).await {
                Ok(result) => return Ok(result),
                Err(e) if attempts < max_retries && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay);
                }
                Err(e) => {
                    error!("Redis operation failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }
            }
        }
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await;

        match result {
            Ok(response) if response == "PONG" => Ok(true),
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }
}

/// Double the delay, capped
pub(crate) fn next_delay(delay_ms: u64) -> u64 {
    delay_ms.saturating_mul(2).min(MAX_RETRY_DELAY_MS)
}

/// Check if a Redis error is transient and the operation should be retried
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
