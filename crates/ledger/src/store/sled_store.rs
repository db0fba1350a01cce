//! Durable ledger store backed by sled.

use std::path::Path;

use async_trait::async_trait;
use sled::transaction::{abort, ConflictableTransactionError, TransactionError};
use tracing::debug;

use super::{LedgerStore, MarkOutcome, StoreError};
use crate::types::{RecordId, RecordStatus, UnspentRecord};

const RECORDS_TREE: &[u8] = b"unspent_records";

/// Why a spend transaction was rolled back
#[derive(Debug)]
enum AbortReason {
    Stale(RecordId),
    Codec(serde_json::Error),
}

/// Ledger store persisted in an embedded sled database.
///
/// Records are keyed by their id, which also fixes the listing order.
/// Spends run inside a sled transaction so that concurrent settlements
/// serialize against each other; every mutation is flushed before the
/// call returns.
pub struct SledLedgerStore {
    tree: sled::Tree,
}

impl SledLedgerStore {
    /// Open (or create) the ledger database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(RECORDS_TREE)?;
        debug!(
            "opened ledger store at {} with {} records",
            path.as_ref().display(),
            tree.len()
        );
        Ok(Self { tree })
    }

    fn encode(record: &UnspentRecord) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(record)?)
    }

    fn decode(bytes: &[u8]) -> Result<UnspentRecord, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[async_trait]
impl LedgerStore for SledLedgerStore {
    async fn list_unspent(&self) -> Result<Vec<UnspentRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            let record = Self::decode(&value)?;
            if record.is_unspent() {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn list_all(&self) -> Result<Vec<UnspentRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            records.push(Self::decode(&value)?);
        }
        Ok(records)
    }

    async fn insert_if_absent(&self, record: &UnspentRecord) -> Result<bool, StoreError> {
        let bytes = Self::encode(record)?;
        let swapped = self
            .tree
            .compare_and_swap(record.id.as_bytes(), None::<&[u8]>, Some(bytes))?;
        match swapped {
            Ok(()) => {
                self.tree.flush_async().await?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn mark_spent_atomic(
        &self,
        ids: &[RecordId],
        change: Option<&UnspentRecord>,
    ) -> Result<MarkOutcome, StoreError> {
        let change_entry = match change {
            Some(record) => Some((record.id.clone(), Self::encode(record)?)),
            None => None,
        };

        let result = self.tree.transaction(|tx| {
            for id in ids {
                let value = match tx.get(id.as_bytes())? {
                    Some(value) => value,
                    None => return abort(AbortReason::Stale(id.clone())),
                };
                let mut record: UnspentRecord = serde_json::from_slice(&value)
                    .map_err(|e| ConflictableTransactionError::Abort(AbortReason::Codec(e)))?;
                if !record.is_unspent() {
                    return abort(AbortReason::Stale(id.clone()));
                }
                record.status = RecordStatus::Spent;
                let bytes = serde_json::to_vec(&record)
                    .map_err(|e| ConflictableTransactionError::Abort(AbortReason::Codec(e)))?;
                tx.insert(id.as_bytes(), bytes)?;
            }

            if let Some((change_id, change_bytes)) = &change_entry {
                tx.insert(change_id.as_bytes(), change_bytes.clone())?;
            }

            Ok(())
        });

        match result {
            Ok(()) => {
                self.tree.flush_async().await?;
                Ok(MarkOutcome::Applied)
            }
            Err(TransactionError::Abort(AbortReason::Stale(stale))) => {
                Ok(MarkOutcome::Conflict { stale })
            }
            Err(TransactionError::Abort(AbortReason::Codec(err))) => Err(StoreError::Codec(err)),
            Err(TransactionError::Storage(err)) => Err(StoreError::Backend(err)),
        }
    }
}
