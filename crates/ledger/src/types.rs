//! Core types for the unspent-record ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp used throughout the ledger
pub type Timestamp = DateTime<Utc>;

/// Opaque identifier of a ledger record.
///
/// Freshly created records get a 32-character lowercase hex identifier.
/// Identifiers loaded from seed material are accepted as-is; the store
/// only requires them to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a record identifier from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, globally unique identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the identifier as bytes, for use as a store key
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle state of a ledger record.
///
/// Serialized as a plain boolean (`spent`) to stay compatible with
/// existing seed files and API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum RecordStatus {
    /// The record is live and contributes to the balance
    Unspent,
    /// The record has been consumed by a settlement
    Spent,
}

impl From<bool> for RecordStatus {
    fn from(spent: bool) -> Self {
        if spent {
            RecordStatus::Spent
        } else {
            RecordStatus::Unspent
        }
    }
}

impl From<RecordStatus> for bool {
    fn from(status: RecordStatus) -> bool {
        matches!(status, RecordStatus::Spent)
    }
}

/// A single value-bearing ledger record.
///
/// Records are append-only: once written, only the status may change,
/// and only from `Unspent` to `Spent`. Partial spends are expressed by
/// writing a fresh change record rather than mutating the amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnspentRecord {
    /// Unique identifier of the record
    #[serde(rename = "transaction_id")]
    pub id: RecordId,
    /// Value of the record in BTC
    pub amount: Decimal,
    /// Whether the record has been consumed
    #[serde(rename = "spent")]
    pub status: RecordStatus,
    /// When the record entered the ledger
    pub created_at: Timestamp,
}

impl UnspentRecord {
    /// Create a fresh unspent record with a generated identifier
    pub fn new(amount: Decimal) -> Self {
        Self {
            id: RecordId::generate(),
            amount,
            status: RecordStatus::Unspent,
            created_at: Utc::now(),
        }
    }

    /// Whether the record still contributes to the spendable balance
    pub fn is_unspent(&self) -> bool {
        self.status == RecordStatus::Unspent
    }
}
