//! Reconciliation tests.
//!
//! The transaction log must explain every balance:
//! opening balance + credits − debits == current balance.

use esusu_core::{
    config::SimulationConfig,
    group_registry::{Frequency, NewGroup},
    simulation::RotationSimulator,
    transaction_log::TransactionKind,
    Ledger, LedgerError,
};

#[test]
fn fresh_account_reconciles_against_opening_balance() {
    let ledger = Ledger::in_memory().unwrap();
    ledger.open_account("ada", 2_500).unwrap();

    let report = ledger.reconcile("ada").unwrap();
    assert_eq!(report.opening_balance, 2_500);
    assert_eq!(report.total_credits, 0);
    assert_eq!(report.total_debits, 0);
    assert!(report.is_balanced());
    assert_eq!(report.delta(), 0);
}

#[test]
fn logged_debits_equal_money_removed() {
    let ledger = Ledger::in_memory().unwrap();
    ledger.open_account("ada", 10_000).unwrap();
    ledger.open_account("ben", 10_000).unwrap();
    ledger.open_account("chi", 10_000).unwrap();

    ledger.debit("ada", 400, TransactionKind::Airtime, Some("airtime")).unwrap();
    ledger.debit("ada", 1_200, TransactionKind::BillPayment, Some("nepa")).unwrap();
    ledger.transfer("ada", "ben", 900).unwrap();
    let group = ledger
        .create_group(&NewGroup {
            name: "Market".into(),
            amount_per_person: 2_000,
            frequency: Frequency::Weekly,
            total_members: 3,
            founder_id: "ada".into(),
        })
        .unwrap();
    ledger.join_group(&group.group_id, "ben").unwrap();
    ledger.join_group(&group.group_id, "chi").unwrap();
    ledger.contribute(&group.group_id, "ada", 1).unwrap();

    // Rejected operations move nothing and log nothing.
    assert!(matches!(
        ledger.debit("ada", 1_000_000, TransactionKind::Transfer, None),
        Err(LedgerError::InsufficientFunds { .. })
    ));

    let report = ledger.reconcile("ada").unwrap();
    assert_eq!(report.total_debits, 400 + 1_200 + 900 + 2_000);
    assert_eq!(i128::from(report.balance), 10_000 - report.total_debits);
    assert!(report.is_balanced());

    let ben = ledger.reconcile("ben").unwrap();
    assert_eq!(ben.total_credits, 900);
    assert_eq!(ben.balance, 10_900);
}

#[test]
fn every_account_balances_after_a_full_rotation() {
    let ledger = Ledger::in_memory().unwrap();
    let config = SimulationConfig {
        seed: 99,
        members: 8,
        opening_balance: 1_500,
        airtime_probability: 0.6,
        ..SimulationConfig::default()
    };
    let summary = RotationSimulator::new(config).run(&ledger).unwrap();
    assert!(summary.top_ups > 0, "low opening balances should force top-ups");

    let reports = ledger.reconcile_all().unwrap();
    assert_eq!(reports.len(), 8);
    for report in &reports {
        assert!(report.is_balanced(), "{report:?}");
        assert!(report.balance >= 0);
    }

    let credits: i128 = reports.iter().map(|r| r.total_credits).sum();
    assert!(credits >= i128::from(summary.total_paid_out));
}

#[test]
fn reconcile_unknown_account_is_not_found() {
    let ledger = Ledger::in_memory().unwrap();
    assert!(matches!(
        ledger.reconcile("ghost"),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn lifetime_totals_beyond_i64_still_reconcile() {
    let ledger = Ledger::in_memory().unwrap();
    ledger.open_account("whale", i64::MAX).unwrap();
    ledger.debit("whale", i64::MAX, TransactionKind::Airtime, None).unwrap();
    ledger.credit("whale", i64::MAX, None).unwrap();
    ledger.debit("whale", i64::MAX, TransactionKind::BillPayment, None).unwrap();
    ledger.credit("whale", i64::MAX, None).unwrap();
    ledger.debit("whale", i64::MAX, TransactionKind::BillPayment, None).unwrap();

    let report = ledger.reconcile("whale").unwrap();
    assert_eq!(report.balance, 0);
    assert_eq!(report.total_debits, 3 * i128::from(i64::MAX));
    assert_eq!(report.total_credits, 2 * i128::from(i64::MAX));
    assert!(report.is_balanced(), "{report:?}");
    assert_eq!(report.delta(), 0);

    assert!(ledger.reconcile_all().unwrap().iter().all(|r| r.is_balanced()));
}
