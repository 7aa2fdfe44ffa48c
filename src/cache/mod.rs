//! Cache module for in-memory upstream response caching
//!
//! Provides a generic TTL response cache consulted before every upstream
//! call and populated after every successful one. Entries expire by age
//! only; an explicit stale accessor supports the degraded-fallback policy
//! of the public read-mostly endpoints.

mod store;

pub use store::{ResponseCache, SharedCache};
