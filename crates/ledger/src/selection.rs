//! Greedy first-fit coin selection.
//!
//! Selection is a pure function over a snapshot of unspent records. It
//! never touches the store; the settlement engine is responsible for
//! re-validating the chosen records when it applies the spend.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{RecordId, UnspentRecord};

/// The available records cannot cover the requested amount
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient funds: requested {requested}, available {available}")]
pub struct InsufficientFunds {
    /// Amount that was asked for
    pub requested: Decimal,
    /// Sum of every record that was available
    pub available: Decimal,
}

/// A set of records whose combined value covers a target amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Ids of the chosen records, in traversal order
    pub chosen: Vec<RecordId>,
    /// Combined value of the chosen records, always >= the target
    pub total: Decimal,
}

impl Selection {
    /// Overshoot of the selection relative to `target`
    pub fn change_amount(&self, target: Decimal) -> Decimal {
        self.total - target
    }
}

/// Select records to cover `target`, greedily and in the order given.
///
/// Records are accumulated front to back until the running total reaches
/// the target, then traversal stops. The result is not minimal in record
/// count or value, but it never over-selects: dropping the last chosen
/// record always leaves the total short of the target.
///
/// A non-positive target selects nothing and succeeds. If the whole
/// snapshot cannot cover the target, no selection is made and the error
/// reports both sides of the shortfall.
pub fn select(
    available: &[UnspentRecord],
    target: Decimal,
) -> Result<Selection, InsufficientFunds> {
    let mut chosen = Vec::new();
    let mut total = Decimal::ZERO;

    for record in available {
        if total >= target {
            break;
        }
        chosen.push(record.id.clone());
        total += record.amount;
    }

    if total >= target {
        Ok(Selection { chosen, total })
    } else {
        Err(InsufficientFunds {
            requested: target,
            available: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordStatus;
    use chrono::Utc;

    fn record(id: &str, amount: &str) -> UnspentRecord {
        UnspentRecord {
            id: RecordId::from(id),
            amount: amount.parse().unwrap(),
            status: RecordStatus::Unspent,
            created_at: Utc::now(),
        }
    }

    fn btc(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn stops_at_first_cover() {
        let available = vec![record("a", "0.5"), record("b", "0.3"), record("c", "0.2")];

        let selection = select(&available, btc("0.6")).unwrap();
        assert_eq!(
            selection.chosen,
            vec![RecordId::from("a"), RecordId::from("b")]
        );
        assert_eq!(selection.total, btc("0.8"));
        assert_eq!(selection.change_amount(btc("0.6")), btc("0.2"));
    }

    #[test]
    fn exact_cover_leaves_no_change() {
        let available = vec![record("a", "0.5"), record("b", "0.3"), record("c", "0.2")];

        let selection = select(&available, btc("0.8")).unwrap();
        assert_eq!(
            selection.chosen,
            vec![RecordId::from("a"), RecordId::from("b")]
        );
        assert_eq!(selection.change_amount(btc("0.8")), Decimal::ZERO);
    }

    #[test]
    fn first_record_may_already_cover() {
        let available = vec![record("a", "0.5"), record("b", "0.3")];

        let selection = select(&available, btc("0.2")).unwrap();
        assert_eq!(selection.chosen, vec![RecordId::from("a")]);
        assert_eq!(selection.total, btc("0.5"));
    }

    #[test]
    fn shortfall_reports_both_sides() {
        let available = vec![record("a", "0.5"), record("b", "0.3")];

        let err = select(&available, btc("2")).unwrap_err();
        assert_eq!(err.requested, btc("2"));
        assert_eq!(err.available, btc("0.8"));
    }

    #[test]
    fn empty_snapshot_is_insufficient() {
        let err = select(&[], btc("0.1")).unwrap_err();
        assert_eq!(err.available, Decimal::ZERO);
    }

    #[test]
    fn never_over_selects() {
        let available = vec![
            record("a", "0.5"),
            record("b", "0.3"),
            record("c", "0.2"),
            record("d", "0.15"),
        ];

        for target in ["0.1", "0.5", "0.55", "0.8", "0.9", "1.15"] {
            let target = btc(target);
            let selection = select(&available, target).unwrap();
            let amounts: Vec<Decimal> = selection
                .chosen
                .iter()
                .map(|id| {
                    available
                        .iter()
                        .find(|r| &r.id == id)
                        .map(|r| r.amount)
                        .unwrap()
                })
                .collect();
            let total: Decimal = amounts.iter().sum();
            assert_eq!(total, selection.total);
            assert!(total >= target);
            if let Some(last) = amounts.last() {
                assert!(total - *last < target, "selection for {target} over-selects");
            }
        }
    }
}
