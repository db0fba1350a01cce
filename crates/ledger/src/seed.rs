//! Seed ingestion.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::store::{LedgerStore, StoreError};
use crate::types::UnspentRecord;

/// Errors reading seed material from disk
#[derive(Debug, Error)]
pub enum SeedFileError {
    /// The file could not be opened or read
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a JSON array of records
    #[error("seed file is not a valid record list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Outcome of a seed ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    /// Records written by this run
    pub inserted: usize,
    /// Records skipped because their id was already present
    pub skipped: usize,
}

/// Read a JSON array of records from `path`
pub fn from_json_file(path: &Path) -> Result<Vec<UnspentRecord>, SeedFileError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Load seed records into the store, skipping ids that already exist.
///
/// Skipping covers spent records too: a record that was consumed after
/// an earlier seeding run stays spent, so replaying the same material
/// never resurrects or duplicates value.
pub async fn load(
    store: &dyn LedgerStore,
    records: impl IntoIterator<Item = UnspentRecord>,
) -> Result<SeedSummary, StoreError> {
    let mut summary = SeedSummary::default();

    for record in records {
        if store.insert_if_absent(&record).await? {
            summary.inserted += 1;
        } else {
            debug!("seed record {} already present, skipped", record.id);
            summary.skipped += 1;
        }
    }

    info!(
        "seed ingestion finished: {} inserted, {} skipped",
        summary.inserted, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedgerStore;
    use crate::types::{RecordId, RecordStatus};
    use chrono::Utc;

    fn record(id: &str, amount: &str) -> UnspentRecord {
        UnspentRecord {
            id: RecordId::from(id),
            amount: amount.parse().unwrap(),
            status: RecordStatus::Unspent,
            created_at: Utc::now(),
        }
    }

    fn seed_set() -> Vec<UnspentRecord> {
        vec![record("a", "0.5"), record("b", "0.3"), record("c", "0.2")]
    }

    #[tokio::test]
    async fn first_run_inserts_everything() {
        let store = MemoryLedgerStore::new();

        let summary = load(&store, seed_set()).await.unwrap();
        assert_eq!(summary, SeedSummary { inserted: 3, skipped: 0 });
        assert_eq!(store.list_unspent().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let store = MemoryLedgerStore::new();
        load(&store, seed_set()).await.unwrap();

        let summary = load(&store, seed_set()).await.unwrap();
        assert_eq!(summary, SeedSummary { inserted: 0, skipped: 3 });
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn replay_does_not_resurrect_spent_records() {
        let store = MemoryLedgerStore::new();
        load(&store, seed_set()).await.unwrap();
        store
            .mark_spent_atomic(&[RecordId::from("a")], None)
            .await
            .unwrap();

        let summary = load(&store, seed_set()).await.unwrap();
        assert_eq!(summary.inserted, 0);

        let unspent = store.list_unspent().await.unwrap();
        assert!(unspent.iter().all(|r| r.id != RecordId::from("a")));
    }

    #[tokio::test]
    async fn replay_keeps_original_amounts() {
        let store = MemoryLedgerStore::new();
        load(&store, seed_set()).await.unwrap();

        load(&store, vec![record("a", "9.9")]).await.unwrap();

        let unspent = store.list_unspent().await.unwrap();
        let a = unspent.iter().find(|r| r.id == RecordId::from("a")).unwrap();
        assert_eq!(a.amount, "0.5".parse().unwrap());
    }

    #[test]
    fn reads_records_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"[
                {"transaction_id": "a", "amount": 0.5, "spent": false,
                 "created_at": "2024-01-15T10:30:00Z"},
                {"transaction_id": "b", "amount": "0.3", "spent": false,
                 "created_at": "2024-01-15T10:31:00Z"}
            ]"#,
        )
        .unwrap();

        let records = from_json_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, RecordId::from("a"));
        assert_eq!(records[1].amount, "0.3".parse().unwrap());
    }

    #[test]
    fn malformed_seed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, r#"{"not": "an array"}"#).unwrap();

        assert!(matches!(
            from_json_file(&path),
            Err(SeedFileError::Parse(_))
        ));
        assert!(matches!(
            from_json_file(&dir.path().join("missing.json")),
            Err(SeedFileError::Io(_))
        ));
    }
}
