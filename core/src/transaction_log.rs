//! Transaction log — the append-only record of every money movement.
//!
//! Records are never updated or deleted. Ids come from the store's
//! AUTOINCREMENT counter and are strictly increasing.

use crate::{
    account::require_positive,
    error::LedgerResult,
    store::LedgerStore,
    types::{AccountId, Amount, ParseEnumError, Timestamp, TxnId},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Airtime,
    Transfer,
    Received,
    EsusuContribution,
    BillPayment,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 5] = [
        TransactionKind::Airtime,
        TransactionKind::Transfer,
        TransactionKind::Received,
        TransactionKind::EsusuContribution,
        TransactionKind::BillPayment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Airtime           => "airtime",
            TransactionKind::Transfer          => "transfer",
            TransactionKind::Received          => "received",
            TransactionKind::EsusuContribution => "esusu_contribution",
            TransactionKind::BillPayment       => "bill_payment",
        }
    }

    /// `Received` is the only kind that adds money to an account.
    pub fn is_credit(self) -> bool {
        matches!(self, TransactionKind::Received)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind:  "transaction kind",
                value: s.to_string(),
            })
    }
}

/// A record before the log assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id:   AccountId,
    pub kind:         TransactionKind,
    pub amount:       Amount,
    pub counterparty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub txn_id:       TxnId,
    pub account_id:   AccountId,
    pub kind:         TransactionKind,
    pub amount:       Amount,
    pub counterparty: Option<String>,
    pub created_at:   Timestamp,
}

/// Lifetime sums of an account's log, split by direction.
///
/// Wider than `Amount`: each record fits in i64 but their sum need not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTotals {
    pub credits: i128,
    pub debits:  i128,
}

pub struct TransactionLog<'s> {
    store: &'s LedgerStore,
}

impl<'s> TransactionLog<'s> {
    pub fn new(store: &'s LedgerStore) -> Self {
        Self { store }
    }

    pub fn append(&self, txn: NewTransaction, now: Timestamp) -> LedgerResult<TransactionRecord> {
        require_positive(txn.amount)?;
        let txn_id = self.store.insert_txn(&txn, &now)?;
        log::debug!(
            "txn #{txn_id} {} {} {}",
            txn.account_id,
            txn.kind,
            txn.amount
        );
        Ok(TransactionRecord {
            txn_id,
            account_id: txn.account_id,
            kind: txn.kind,
            amount: txn.amount,
            counterparty: txn.counterparty,
            created_at: now,
        })
    }

    /// Newest first, at most `limit` records.
    pub fn list_for_account(&self, account_id: &str, limit: u32) -> LedgerResult<Vec<TransactionRecord>> {
        self.store.txns_for_account(account_id, limit)
    }

    pub fn totals(&self, account_id: &str) -> LedgerResult<LogTotals> {
        let mut totals = LogTotals::default();
        for (kind, amount) in self.store.txn_amounts(account_id)? {
            if kind.is_credit() {
                totals.credits += i128::from(amount);
            } else {
                totals.debits += i128::from(amount);
            }
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip_through_storage_form() {
        for kind in TransactionKind::ALL {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "lottery".parse::<TransactionKind>().unwrap_err();
        assert_eq!(err.value, "lottery");
    }

    #[test]
    fn only_received_is_a_credit() {
        let credits: Vec<_> = TransactionKind::ALL.into_iter().filter(|k| k.is_credit()).collect();
        assert_eq!(credits, vec![TransactionKind::Received]);
    }
}
