//! In-memory ledger store.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{LedgerStore, MarkOutcome, StoreError};
use crate::types::{RecordId, RecordStatus, UnspentRecord};

/// Ledger store backed by an in-memory map.
///
/// Nothing survives a restart. Intended for tests and for running a
/// throwaway node without touching disk. The `BTreeMap` keeps records
/// in id order, matching the on-disk backend.
pub struct MemoryLedgerStore {
    records: RwLock<BTreeMap<RecordId, UnspentRecord>>,
}

impl MemoryLedgerStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn list_unspent(&self) -> Result<Vec<UnspentRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| record.is_unspent())
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<UnspentRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }

    async fn insert_if_absent(&self, record: &UnspentRecord) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.entry(record.id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn mark_spent_atomic(
        &self,
        ids: &[RecordId],
        change: Option<&UnspentRecord>,
    ) -> Result<MarkOutcome, StoreError> {
        // The write lock covers verification and mutation, so no other
        // task can spend the same records in between.
        let mut records = self.records.write().await;

        for id in ids {
            match records.get(id) {
                Some(record) if record.is_unspent() => {}
                _ => {
                    return Ok(MarkOutcome::Conflict { stale: id.clone() });
                }
            }
        }

        for id in ids {
            if let Some(record) = records.get_mut(id) {
                record.status = RecordStatus::Spent;
            }
        }

        if let Some(change) = change {
            records.insert(change.id.clone(), change.clone());
        }

        Ok(MarkOutcome::Applied)
    }
}
