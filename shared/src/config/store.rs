//! Record store configuration module

use serde::{Deserialize, Serialize};

/// Redis record store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis connection URL
    pub url: String,

    /// Prefix applied to every key written by the store
    pub key_prefix: String,

    /// Connection attempts before giving up at startup
    pub connect_retries: u32,

    /// Base delay between connection attempts in milliseconds
    pub retry_delay_ms: u64,

    /// Number of keys requested per SCAN round during cleanup
    pub scan_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            key_prefix: String::from("otp"),
            connect_retries: 3,
            retry_delay_ms: 100,
            scan_batch_size: 500,
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix for all store keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Generate a store key with prefix
    pub fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}
