//! Account store — balances and the non-negative-balance invariant.
//!
//! Every mutation here is a plain read-check-write against the store.
//! Callers outside the orchestrator must hold a write transaction
//! (`LedgerStore::begin_write`) so the check and the write are linearized.

use crate::{
    error::{LedgerError, LedgerResult},
    store::LedgerStore,
    types::{AccountId, Amount, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id:      AccountId,
    pub balance:         Amount,
    pub opening_balance: Amount,
    pub created_at:      Timestamp,
}

pub struct AccountStore<'s> {
    store: &'s LedgerStore,
}

impl<'s> AccountStore<'s> {
    pub fn new(store: &'s LedgerStore) -> Self {
        Self { store }
    }

    /// Signup. The opening balance may be zero but never negative.
    pub fn open(&self, account_id: &str, opening_balance: Amount, now: Timestamp) -> LedgerResult<Account> {
        if opening_balance < 0 {
            return Err(LedgerError::InvalidAmount { amount: opening_balance });
        }
        if account_id.trim().is_empty() {
            return Err(LedgerError::InvalidRange {
                field:  "account_id",
                detail: "must not be blank".into(),
            });
        }
        if self.store.account_exists(account_id)? {
            return Err(LedgerError::DuplicateName {
                entity: "account",
                name:   account_id.to_string(),
            });
        }
        let account = Account {
            account_id: account_id.to_string(),
            balance: opening_balance,
            opening_balance,
            created_at: now,
        };
        self.store.insert_account(&account)?;
        Ok(account)
    }

    pub fn get(&self, account_id: &str) -> LedgerResult<Account> {
        self.store
            .get_account(account_id)?
            .ok_or_else(|| not_found(account_id))
    }

    pub fn exists(&self, account_id: &str) -> LedgerResult<bool> {
        self.store.account_exists(account_id)
    }

    pub fn balance(&self, account_id: &str) -> LedgerResult<Amount> {
        self.store
            .account_balance(account_id)?
            .ok_or_else(|| not_found(account_id))
    }

    /// Remove `amount` from the account. Returns the new balance.
    pub fn debit(&self, account_id: &str, amount: Amount) -> LedgerResult<Amount> {
        require_positive(amount)?;
        let balance = self.balance(account_id)?;
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: account_id.to_string(),
                balance,
                requested: amount,
            });
        }
        let new_balance = balance - amount;
        self.store.set_account_balance(account_id, new_balance)?;
        log::debug!("debit {account_id}: {balance} -> {new_balance}");
        Ok(new_balance)
    }

    /// Add `amount` to the account. Returns the new balance.
    pub fn credit(&self, account_id: &str, amount: Amount) -> LedgerResult<Amount> {
        require_positive(amount)?;
        let balance = self.balance(account_id)?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount { amount })?;
        self.store.set_account_balance(account_id, new_balance)?;
        log::debug!("credit {account_id}: {balance} -> {new_balance}");
        Ok(new_balance)
    }

    pub fn list(&self) -> LedgerResult<Vec<Account>> {
        self.store.all_accounts()
    }
}

pub(crate) fn require_positive(amount: Amount) -> LedgerResult<()> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(())
}

fn not_found(account_id: &str) -> LedgerError {
    LedgerError::NotFound {
        entity: "account",
        id:     account_id.to_string(),
    }
}
