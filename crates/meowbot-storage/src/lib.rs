//! meowbot-storage - embedded persistence on redb.
//!
//! Two tables share one database file:
//!
//! - `kv` - the general key-value store behind trigger state (cat photos,
//!   poke counters, weather preferences and caches)
//! - `access_tokens` - per-team OAuth install records
//!
//! The key-value side implements the `KeyValueStore` contract from
//! meowbot-core, so triggers never see redb directly.

pub mod kv;
pub mod tokens;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use redb::Database;

pub use kv::RedbKvStore;
pub use tokens::{AccessToken, TokenStore};

/// Central storage manager. Opens (or creates) the database file and
/// initializes every table up front, so later opens cannot fail on a
/// missing table.
pub struct Storage {
    pub kv: RedbKvStore,
    pub tokens: TokenStore,
}

impl Storage {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        let kv = RedbKvStore::new(db.clone())?;
        let tokens = TokenStore::new(db)?;
        Ok(Self { kv, tokens })
    }
}
