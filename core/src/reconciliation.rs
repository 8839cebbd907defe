//! Reconciliation — does the transaction log explain the balance?
//!
//! For every account: opening + credits − debits == balance.
//! A mismatch means money moved without a log record (or the reverse).

use crate::{
    account::AccountStore,
    error::LedgerResult,
    store::LedgerStore,
    transaction_log::TransactionLog,
    types::{AccountId, Amount},
};
use serde::{Deserialize, Serialize};

/// Totals are i128: a long-lived account's lifetime sums can exceed i64
/// even though every balance and every record fits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub account_id:       AccountId,
    pub opening_balance:  Amount,
    pub total_credits:    i128,
    pub total_debits:     i128,
    pub balance:          Amount,
    pub expected_balance: i128,
}

impl ReconciliationReport {
    pub fn is_balanced(&self) -> bool {
        self.expected_balance == i128::from(self.balance)
    }

    /// Signed difference between the stored and the log-derived balance.
    pub fn delta(&self) -> i128 {
        i128::from(self.balance) - self.expected_balance
    }
}

pub struct Reconciler<'s> {
    store: &'s LedgerStore,
}

impl<'s> Reconciler<'s> {
    pub fn new(store: &'s LedgerStore) -> Self {
        Self { store }
    }

    pub fn account(&self, account_id: &str) -> LedgerResult<ReconciliationReport> {
        let account = AccountStore::new(self.store).get(account_id)?;
        let totals = TransactionLog::new(self.store).totals(account_id)?;
        let report = ReconciliationReport {
            account_id:       account.account_id,
            opening_balance:  account.opening_balance,
            total_credits:    totals.credits,
            total_debits:     totals.debits,
            balance:          account.balance,
            expected_balance: i128::from(account.opening_balance) + totals.credits - totals.debits,
        };
        if !report.is_balanced() {
            log::warn!(
                "reconciliation mismatch for {}: balance {} vs expected {} (delta {})",
                report.account_id,
                report.balance,
                report.expected_balance,
                report.delta()
            );
        }
        Ok(report)
    }

    /// Reports for every account, in account id order.
    pub fn all(&self) -> LedgerResult<Vec<ReconciliationReport>> {
        AccountStore::new(self.store)
            .list()?
            .iter()
            .map(|a| self.account(&a.account_id))
            .collect()
    }
}
