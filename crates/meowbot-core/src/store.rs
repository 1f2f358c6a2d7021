//! Keyed storage collaborator.
//!
//! Small string/integer values under string keys, optionally expiring.
//! Only a single `incr` call is atomic; read-then-write sequences spanning
//! multiple calls may race under concurrent dispatch. That gap is accepted
//! and documented where it occurs rather than papered over with
//! transactions.

use std::time::Duration;

use anyhow::Result;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Increment the integer under `key` by one and return the new value.
    /// Missing or non-numeric values count as zero.
    fn incr(&self, key: &str) -> Result<i64>;

    fn delete(&self, key: &str) -> Result<bool>;

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}
