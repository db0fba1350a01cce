//! Balance reporting.

use std::sync::Arc;

use purse_rates::{CurrencyPair, RateSource};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::store::{LedgerStore, StoreError};

/// A point-in-time view of the ledger balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    /// Sum of all unspent record amounts, in the native unit
    pub total: Decimal,
    /// Total converted at the current rate and rounded to two decimal
    /// places, or `None` when no rate could be obtained
    pub converted: Option<Decimal>,
}

/// Computes the spendable balance and its converted value
pub struct BalanceReporter {
    store: Arc<dyn LedgerStore>,
    rates: Arc<dyn RateSource>,
    pair: CurrencyPair,
}

impl BalanceReporter {
    /// Create a reporter converting into the quote currency of `pair`
    pub fn new(
        store: Arc<dyn LedgerStore>,
        rates: Arc<dyn RateSource>,
        pair: CurrencyPair,
    ) -> Self {
        Self { store, rates, pair }
    }

    /// Report the current balance.
    ///
    /// A store failure fails the whole report. A rate failure does not:
    /// the native total is still correct on its own, so it is returned
    /// with the conversion marked unavailable instead of being guessed.
    /// A conversion too large to represent is treated the same way.
    pub async fn report(&self) -> Result<BalanceReport, StoreError> {
        let unspent = self.store.list_unspent().await?;
        let total: Decimal = unspent.iter().map(|record| record.amount).sum();

        let converted = match self.rates.current_rate(&self.pair).await {
            Ok(rate) => match total.checked_mul(rate) {
                Some(value) => {
                    Some(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
                }
                None => {
                    warn!(
                        "converting {} at rate {} overflows, conversion unavailable",
                        total, rate
                    );
                    None
                }
            },
            Err(err) => {
                warn!(
                    "rate lookup for {} failed, conversion unavailable: {}",
                    self.pair, err
                );
                None
            }
        };

        Ok(BalanceReport { total, converted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LedgerStore, MemoryLedgerStore};
    use crate::types::{RecordId, RecordStatus, UnspentRecord};
    use async_trait::async_trait;
    use chrono::Utc;
    use purse_rates::RateError;

    struct FixedRate(Decimal);

    #[async_trait]
    impl RateSource for FixedRate {
        async fn current_rate(&self, _pair: &CurrencyPair) -> Result<Decimal, RateError> {
            Ok(self.0)
        }
    }

    struct NoRate;

    #[async_trait]
    impl RateSource for NoRate {
        async fn current_rate(&self, _pair: &CurrencyPair) -> Result<Decimal, RateError> {
            Err(RateError::MissingData)
        }
    }

    fn record(id: &str, amount: &str) -> UnspentRecord {
        UnspentRecord {
            id: RecordId::from(id),
            amount: amount.parse().unwrap(),
            status: RecordStatus::Unspent,
            created_at: Utc::now(),
        }
    }

    async fn seeded_store(records: &[UnspentRecord]) -> Arc<MemoryLedgerStore> {
        let store = Arc::new(MemoryLedgerStore::new());
        for r in records {
            store.insert_if_absent(r).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn sums_only_unspent_records() {
        let store = seeded_store(&[record("a", "0.5"), record("b", "0.3"), record("c", "0.2")])
            .await;
        store
            .mark_spent_atomic(&[RecordId::from("c")], None)
            .await
            .unwrap();

        let reporter = BalanceReporter::new(
            store,
            Arc::new(FixedRate(Decimal::from(1000))),
            CurrencyPair::new("BTC", "EUR"),
        );

        let report = reporter.report().await.unwrap();
        assert_eq!(report.total, "0.8".parse().unwrap());
        assert_eq!(report.converted, Some("800.00".parse().unwrap()));
    }

    #[tokio::test]
    async fn conversion_rounds_half_away_from_zero() {
        let store = seeded_store(&[record("a", "1")]).await;
        let reporter = BalanceReporter::new(
            store,
            Arc::new(FixedRate("64123.455".parse().unwrap())),
            CurrencyPair::new("BTC", "EUR"),
        );

        let report = reporter.report().await.unwrap();
        assert_eq!(report.converted, Some("64123.46".parse().unwrap()));
    }

    #[tokio::test]
    async fn overflowing_conversion_degrades_like_a_missing_rate() {
        let store = seeded_store(&[record("a", "10000")]).await;
        let reporter = BalanceReporter::new(
            store,
            Arc::new(FixedRate(Decimal::MAX)),
            CurrencyPair::new("BTC", "EUR"),
        );

        let report = reporter.report().await.unwrap();
        assert_eq!(report.total, "10000".parse().unwrap());
        assert_eq!(report.converted, None);
    }

    #[tokio::test]
    async fn rate_failure_keeps_native_total() {
        let store = seeded_store(&[record("a", "0.5")]).await;
        let reporter =
            BalanceReporter::new(store, Arc::new(NoRate), CurrencyPair::new("BTC", "EUR"));

        let report = reporter.report().await.unwrap();
        assert_eq!(report.total, "0.5".parse().unwrap());
        assert_eq!(report.converted, None);
    }

    #[tokio::test]
    async fn empty_ledger_reports_zero() {
        let store = seeded_store(&[]).await;
        let reporter = BalanceReporter::new(
            store,
            Arc::new(FixedRate(Decimal::from(500))),
            CurrencyPair::new("BTC", "EUR"),
        );

        let report = reporter.report().await.unwrap();
        assert_eq!(report.total, Decimal::ZERO);
        assert_eq!(report.converted, Some("0.00".parse().unwrap()));
    }
}
