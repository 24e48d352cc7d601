//! Occupation data: O*NET client, TTL cache store and the cache-first manager.

pub mod client;
pub mod fallback;
pub mod handlers;
pub mod manager;
pub mod mock_data;
pub mod models;
pub mod rate_limit;
pub mod store;
