//! UTXO-style ledger for the purse wallet node.
//!
//! The ledger is a flat set of value-bearing records. Spending works the
//! way physical cash does: a withdrawal consumes whole records and puts
//! the overshoot back as a fresh change record. The pieces are kept
//! separate so each can be tested on its own:
//!
//! - [`store`] persists records and is the only place state changes
//! - [`selection`] picks records to cover an amount, as a pure function
//! - [`settlement`] drives select-then-spend with bounded retry
//! - [`report`] sums the balance and converts it via [`purse_rates`]
//! - [`seed`] loads initial records idempotently

pub mod report;
pub mod seed;
pub mod selection;
pub mod settlement;
pub mod store;
pub mod types;

// Re-exports
pub use report::{BalanceReport, BalanceReporter};
pub use seed::{SeedFileError, SeedSummary};
pub use selection::{select, InsufficientFunds, Selection};
pub use settlement::{Settlement, SettlementEngine, SettlementError, SettlementPolicy};
pub use store::{LedgerStore, MarkOutcome, MemoryLedgerStore, SledLedgerStore, StoreError};
pub use types::{RecordId, RecordStatus, Timestamp, UnspentRecord};
