//! Settlement of withdrawals against the ledger.
//!
//! A withdrawal is settled by selecting records, then asking the store to
//! spend them atomically. The snapshot used for selection can go stale
//! while the request is in flight, so a conflicting spend is not an
//! error: the engine re-reads and retries, up to a bounded number of
//! attempts.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::selection::{select, InsufficientFunds};
use crate::store::{LedgerStore, MarkOutcome, StoreError};
use crate::types::{RecordId, UnspentRecord};

/// Policy bounds for settling withdrawals
#[derive(Debug, Clone)]
pub struct SettlementPolicy {
    /// Smallest withdrawal the engine will settle, in BTC. Non-positive
    /// values are replaced by the default when built through `new`.
    pub dust_threshold: Decimal,
    /// How many conflicting spend attempts to make before giving up
    pub max_attempts: u32,
}

impl SettlementPolicy {
    /// Build a policy, clamping `max_attempts` to at least one and a
    /// non-positive `dust_threshold` to the default
    pub fn new(dust_threshold: Decimal, max_attempts: u32) -> Self {
        Self {
            dust_threshold: if dust_threshold > Decimal::ZERO {
                dust_threshold
            } else {
                Self::default().dust_threshold
            },
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            // 0.00001 BTC
            dust_threshold: Decimal::new(1, 5),
            max_attempts: 5,
        }
    }
}

/// Errors surfaced when settling a withdrawal
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The requested amount is below the configured dust threshold
    #[error("withdrawal of {amount} is below the dust threshold of {threshold}")]
    BelowDust { amount: Decimal, threshold: Decimal },

    /// The unspent records cannot cover the requested amount
    #[error(transparent)]
    InsufficientFunds(#[from] InsufficientFunds),

    /// Concurrent settlements kept invalidating the selection
    #[error("settlement abandoned after {attempts} conflicting attempts")]
    Contention { attempts: u32 },

    /// The ledger store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A completed withdrawal
#[derive(Debug, Clone)]
pub struct Settlement {
    /// Ids of the records consumed by this withdrawal
    pub spent: Vec<RecordId>,
    /// The amount that was withdrawn
    pub amount: Decimal,
    /// Overshoot returned to the ledger, zero on an exact cover
    pub change_amount: Decimal,
    /// Id of the change record, present only when change was written
    pub change_id: Option<RecordId>,
}

/// Settles withdrawals against a ledger store
pub struct SettlementEngine {
    store: Arc<dyn LedgerStore>,
    policy: SettlementPolicy,
}

impl SettlementEngine {
    /// Create an engine over the given store
    pub fn new(store: Arc<dyn LedgerStore>, policy: SettlementPolicy) -> Self {
        Self { store, policy }
    }

    /// Withdraw `amount` from the ledger.
    ///
    /// On success every consumed record has been marked spent and any
    /// change has been written, all in one atomic store operation. On
    /// failure the ledger is untouched by this call.
    pub async fn withdraw(&self, amount: Decimal) -> Result<Settlement, SettlementError> {
        // A non-positive amount is dust regardless of the policy value.
        if amount <= Decimal::ZERO || amount < self.policy.dust_threshold {
            return Err(SettlementError::BelowDust {
                amount,
                threshold: self.policy.dust_threshold,
            });
        }

        let mut attempt = 1;
        loop {
            let snapshot = self.store.list_unspent().await?;
            let selection = select(&snapshot, amount)?;
            let change_amount = selection.change_amount(amount);
            let change = if change_amount > Decimal::ZERO {
                Some(UnspentRecord::new(change_amount))
            } else {
                None
            };

            match self
                .store
                .mark_spent_atomic(&selection.chosen, change.as_ref())
                .await?
            {
                MarkOutcome::Applied => {
                    info!(
                        "settled withdrawal of {} across {} records, change {}",
                        amount,
                        selection.chosen.len(),
                        change_amount
                    );
                    return Ok(Settlement {
                        spent: selection.chosen,
                        amount,
                        change_amount,
                        change_id: change.map(|record| record.id),
                    });
                }
                MarkOutcome::Conflict { stale } => {
                    if attempt >= self.policy.max_attempts {
                        warn!(
                            "abandoning withdrawal of {} after {} conflicting attempts",
                            amount, attempt
                        );
                        return Err(SettlementError::Contention { attempts: attempt });
                    }
                    debug!(
                        "record {} was spent concurrently, retrying withdrawal (attempt {})",
                        stale, attempt
                    );
                    attempt += 1;
                }
            }
        }
    }
}
