//! Recent-transaction history, scoped per (account, chain).
//!
//! Stored as a JSON array under `txHistory_<account>_<chainId>`, newest first,
//! never more than [`MAX_HISTORY`] entries.

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

use crate::chains::ChainId;
use crate::error::PayError;
use crate::store::KeyValueStore;

/// Maximum number of records kept per scope.
pub const MAX_HISTORY: usize = 5;

/// A transaction the node accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub recipient: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// The (account, chain) pair a history belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryScope {
    pub account: Address,
    pub chain_id: ChainId,
}

impl HistoryScope {
    pub fn new(account: Address, chain_id: ChainId) -> Self {
        Self { account, chain_id }
    }

    pub fn storage_key(&self) -> String {
        format!("txHistory_{}_{}", self.account, self.chain_id)
    }
}

/// Newest-first list of at most [`MAX_HISTORY`] records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<TransactionRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn newest(&self) -> Option<&TransactionRecord> {
        self.records.first()
    }

    /// Prepend `record`, dropping the oldest entries beyond the cap.
    pub fn push(&mut self, record: TransactionRecord) {
        self.records.insert(0, record);
        self.records.truncate(MAX_HISTORY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter()
    }
}

/// Load the history for `scope`. Missing, unreadable or corrupt data all
/// yield an empty history.
pub fn load_history(store: &dyn KeyValueStore, scope: &HistoryScope) -> History {
    let key = scope.storage_key();
    let raw = match store.get(&key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return History::new(),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "failed to read transaction history");
            return History::new();
        }
    };

    match serde_json::from_str::<History>(&raw) {
        Ok(mut history) => {
            history.records.truncate(MAX_HISTORY);
            history
        }
        Err(e) => {
            tracing::warn!(
                key = %key,
                error = %e,
                "failed to parse transaction history, starting empty"
            );
            History::new()
        }
    }
}

/// Prepend `record` to the stored history for `scope` and write it back.
/// Returns the updated history.
pub fn record_transaction(
    store: &dyn KeyValueStore,
    scope: &HistoryScope,
    record: TransactionRecord,
) -> Result<History, PayError> {
    let mut history = load_history(store, scope);
    history.push(record);
    store.set(&scope.storage_key(), &serde_json::to_string(&history)?)?;
    Ok(history)
}
