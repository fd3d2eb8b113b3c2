//! `OtpRepository` implementations
//!
//! - `redis_store` - Production store: JSON records with a TTL at `expires_at`,
//!   atomic updates through Lua scripts
//! - `memory` - Process-local store for development and tests

pub mod memory;
pub mod redis_store;

pub use memory::MemoryOtpStore;
pub use redis_store::RedisOtpStore;

#[cfg(test)]
mod tests;
