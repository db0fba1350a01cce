//! Storage layer for ledger records.
//!
//! The [`LedgerStore`] trait is the seam between the settlement logic and
//! the persistence backend. Production nodes use [`SledLedgerStore`];
//! tests and ephemeral runs use [`MemoryLedgerStore`]. Both enforce the
//! same contract: records are unique by id, ordering follows the id, and
//! `mark_spent_atomic` either applies completely or not at all.

mod memory_store;
mod sled_store;

pub use memory_store::MemoryLedgerStore;
pub use sled_store::SledLedgerStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{RecordId, UnspentRecord};

/// Errors surfaced by a ledger store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend itself failed
    #[error("ledger backend failure: {0}")]
    Backend(#[from] sled::Error),

    /// A stored record could not be decoded
    #[error("stored record could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result of an atomic spend attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Every input was flipped to spent and the change record, if any,
    /// was written in the same step
    Applied,
    /// At least one input was no longer unspent; nothing was changed
    Conflict {
        /// The first input found spent or missing
        stale: RecordId,
    },
}

/// Storage interface for the unspent-record ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// List records that are still unspent, ordered by id
    async fn list_unspent(&self) -> Result<Vec<UnspentRecord>, StoreError>;

    /// List every record, spent and unspent, ordered by id
    async fn list_all(&self) -> Result<Vec<UnspentRecord>, StoreError>;

    /// Insert a record unless its id is already present.
    ///
    /// Returns `true` when the record was written and `false` when an
    /// existing record with the same id was left untouched. Repeating
    /// the same seed material therefore never duplicates value.
    async fn insert_if_absent(&self, record: &UnspentRecord) -> Result<bool, StoreError>;

    /// Atomically spend a set of records and write an optional change record.
    ///
    /// The implementation must re-verify that every id in `ids` is
    /// currently unspent and apply all writes in one indivisible step.
    /// When any input fails verification the store is left exactly as it
    /// was and the stale id is reported in [`MarkOutcome::Conflict`].
    async fn mark_spent_atomic(
        &self,
        ids: &[RecordId],
        change: Option<&UnspentRecord>,
    ) -> Result<MarkOutcome, StoreError>;
}
