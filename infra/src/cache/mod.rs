//! Redis connection management

pub mod redis_client;

pub use redis_client::RedisClient;

#[cfg(test)]
mod tests;
