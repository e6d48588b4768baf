//! Cache trait definition.
//!
//! A shared, order-independent key-value facility holding serialized JSON
//! snapshots with per-entry expiry. Implementations live in parlance-infra
//! (e.g., `InMemoryCache`); the interface is shaped so a networked backend
//! can be slotted in without touching the cache-aside layer.

use parlance_types::error::CacheError;

use std::time::Duration;

/// Key-value snapshot cache with time-to-live expiry.
///
/// Operations may be issued concurrently with no cross-key ordering
/// guarantee. Correctness of the store layer relies solely on the
/// write-then-invalidate discipline in `CachedStore`, never on cache-side
/// ordering.
pub trait Cache: Send + Sync {
    /// Fetch the snapshot stored under `key`, if present and not expired.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Store a snapshot under `key`, replacing any previous value.
    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;

    /// Remove the entry under `key`. Removing an absent key is not an error.
    fn delete(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;
}
