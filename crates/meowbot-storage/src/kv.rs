//! redb-backed implementation of the key-value contract.
//!
//! Each entry is a JSON-encoded [`StoredValue`] so TTLs survive restarts.
//! Expiry is lazy: an expired entry reads as missing and is removed on
//! that read. Atomicity is per call only; multi-call sequences can
//! interleave.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use meowbot_core::store::KeyValueStore;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::debug;

const KV_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

#[derive(Debug, Serialize, Deserialize)]
struct StoredValue {
    value: String,
    /// Absolute unix expiry, when set.
    expires_at: Option<i64>,
}

impl StoredValue {
    fn expired(&self) -> bool {
        self.expires_at
            .is_some_and(|at| Utc::now().timestamp() >= at)
    }
}

#[derive(Clone)]
pub struct RedbKvStore {
    db: Arc<Database>,
}

impl RedbKvStore {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(KV_TABLE)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    fn read(&self, key: &str) -> Result<Option<StoredValue>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV_TABLE)?;
        match table.get(key)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, stored: &StoredValue) -> Result<()> {
        let bytes = serde_json::to_vec(stored)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV_TABLE)?;
            table.insert(key, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl KeyValueStore for RedbKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.read(key)? {
            Some(stored) if stored.expired() => {
                debug!(key, "evicting expired entry");
                self.delete(key)?;
                Ok(None)
            }
            Some(stored) => Ok(Some(stored.value)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(
            key,
            &StoredValue {
                value: value.to_string(),
                expires_at: None,
            },
        )
    }

    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.write(
            key,
            &StoredValue {
                value: value.to_string(),
                expires_at: Some(Utc::now().timestamp() + ttl.as_secs() as i64),
            },
        )
    }

    fn incr(&self, key: &str) -> Result<i64> {
        // Read-modify-write inside one write transaction.
        let write_txn = self.db.begin_write()?;
        let next = {
            let mut table = write_txn.open_table(KV_TABLE)?;
            let current = match table.get(key)? {
                Some(guard) => {
                    let stored: StoredValue = serde_json::from_slice(guard.value())?;
                    if stored.expired() {
                        0
                    } else {
                        stored.value.parse::<i64>().unwrap_or(0)
                    }
                }
                None => 0,
            };
            let next = current + 1;
            let bytes = serde_json::to_vec(&StoredValue {
                value: next.to_string(),
                expires_at: None,
            })?;
            table.insert(key, bytes.as_slice())?;
            next
        };
        write_txn.commit()?;
        Ok(next)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(KV_TABLE)?;
            let removed = table.remove(key)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV_TABLE)?;
        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if !key.value().starts_with(prefix) {
                continue;
            }
            let stored: StoredValue = serde_json::from_slice(value.value())?;
            if !stored.expired() {
                keys.push(key.value().to_string());
            }
        }
        Ok(keys)
    }
}
