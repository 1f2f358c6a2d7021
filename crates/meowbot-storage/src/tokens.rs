//! Per-team OAuth install records.

use std::sync::Arc;

use anyhow::Result;
use redb::{Database, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::info;

const TOKENS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("access_tokens");

/// One workspace install, keyed by team id. Shaped after the fields the
/// OAuth access exchange returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub team_id: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub access_token: String,
    pub bot_user_id: String,
    pub bot_access_token: String,
}

#[derive(Clone)]
pub struct TokenStore {
    db: Arc<Database>,
}

impl TokenStore {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(TOKENS_TABLE)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Insert or replace the install record for its team.
    pub fn save(&self, token: &AccessToken) -> Result<()> {
        let bytes = serde_json::to_vec(token)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TOKENS_TABLE)?;
            table.insert(token.team_id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        info!(team_id = %token.team_id, team = %token.team_name, "saved workspace install");
        Ok(())
    }

    pub fn get(&self, team_id: &str) -> Result<Option<AccessToken>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOKENS_TABLE)?;
        match table.get(team_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Bot token for one team, or None for a workspace that never
    /// installed the bot.
    pub fn bot_token(&self, team_id: &str) -> Result<Option<String>> {
        Ok(self.get(team_id)?.map(|token| token.bot_access_token))
    }
}
