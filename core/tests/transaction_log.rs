//! Transaction log tests.
//!
//! Tests cover: newest-first ordering, limits (explicit and default),
//! increasing ids, and append validation.

use chrono::Utc;
use esusu_core::{
    transaction_log::{NewTransaction, TransactionKind, TransactionLog, DEFAULT_HISTORY_LIMIT},
    Ledger, LedgerError,
};

fn build() -> Ledger {
    let ledger = Ledger::in_memory().expect("in-memory ledger");
    ledger.open_account("alice", 100_000).unwrap();
    ledger
}

#[test]
fn history_is_newest_first() {
    let ledger = build();
    ledger.debit("alice", 100, TransactionKind::Airtime, Some("mtn")).unwrap();
    ledger.debit("alice", 200, TransactionKind::BillPayment, Some("dstv")).unwrap();
    ledger.credit("alice", 300, Some("bob")).unwrap();

    let history = ledger.history("alice", None).unwrap();
    let amounts: Vec<i64> = history.iter().map(|r| r.amount).collect();
    assert_eq!(amounts, vec![300, 200, 100]);
    assert_eq!(history[0].kind, TransactionKind::Received);
    assert_eq!(history[2].counterparty.as_deref(), Some("mtn"));

    // Ids strictly increase in append order.
    assert!(history[0].txn_id > history[1].txn_id);
    assert!(history[1].txn_id > history[2].txn_id);
}

#[test]
fn history_honours_explicit_and_default_limit() {
    let ledger = build();
    for i in 1..=25 {
        ledger.debit("alice", i, TransactionKind::Airtime, None).unwrap();
    }
    let three = ledger.history("alice", Some(3)).unwrap();
    assert_eq!(three.iter().map(|r| r.amount).collect::<Vec<_>>(), vec![25, 24, 23]);

    let default = ledger.history("alice", None).unwrap();
    assert_eq!(default.len(), DEFAULT_HISTORY_LIMIT as usize);
    assert_eq!(default.last().unwrap().amount, 6);
}

#[test]
fn history_of_missing_account_is_not_found() {
    let ledger = build();
    assert!(matches!(
        ledger.history("ghost", None),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn history_is_per_account() {
    let ledger = build();
    ledger.open_account("bob", 0).unwrap();
    ledger.credit("bob", 50, None).unwrap();
    ledger.debit("alice", 10, TransactionKind::Airtime, None).unwrap();

    let bob = ledger.history("bob", None).unwrap();
    assert_eq!(bob.len(), 1);
    assert!(bob.iter().all(|r| r.account_id == "bob"));
}

#[test]
fn append_rejects_non_positive_amount() {
    let ledger = build();
    let log = TransactionLog::new(ledger.store());
    let err = log
        .append(
            NewTransaction {
                account_id:   "alice".into(),
                kind:         TransactionKind::Transfer,
                amount:       0,
                counterparty: None,
            },
            Utc::now(),
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount { amount: 0 }));
    assert!(ledger.history("alice", None).unwrap().is_empty());
}

#[test]
fn totals_split_by_direction() {
    let ledger = build();
    ledger.debit("alice", 700, TransactionKind::Airtime, None).unwrap();
    ledger.debit("alice", 300, TransactionKind::BillPayment, None).unwrap();
    ledger.credit("alice", 150, None).unwrap();

    let totals = TransactionLog::new(ledger.store()).totals("alice").unwrap();
    assert_eq!(totals.debits, 1_000);
    assert_eq!(totals.credits, 150);
}
