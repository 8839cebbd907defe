//! Multi-connection tests.
//!
//! Each thread opens its own `Ledger` on one database file. Writers are
//! serialized by the database write lock, so racing joins and racing
//! contributions must still respect positions and balances.

use esusu_core::{
    config::LedgerConfig,
    group_registry::{Frequency, NewGroup},
    Ledger, LedgerError,
};
use std::path::PathBuf;
use std::sync::Barrier;
use std::thread;

/// A database file that is removed (with its WAL files) on drop.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("esusu-{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }

    fn config(&self) -> LedgerConfig {
        LedgerConfig {
            database_path: self.path.to_string_lossy().into_owned(),
            busy_timeout_ms: 30_000,
            ..LedgerConfig::default_test()
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let base = self.path.to_string_lossy().into_owned();
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{base}{suffix}"));
        }
    }
}

#[test]
fn racing_joins_get_contiguous_positions() {
    let db = TempDb::new();
    let ledger = Ledger::open(db.config()).unwrap();
    for i in 0..10 {
        ledger.open_account(&format!("m{i:02}"), 1_000).unwrap();
    }
    let group = ledger
        .create_group(&NewGroup {
            name: "Crowd".into(),
            amount_per_person: 100,
            frequency: Frequency::Daily,
            total_members: 6,
            founder_id: "m00".into(),
        })
        .unwrap();

    let barrier = Barrier::new(9);
    let outcomes: Vec<Result<u32, LedgerError>> = thread::scope(|s| {
        let handles: Vec<_> = (1..10)
            .map(|i| {
                let (config, gid, barrier) = (db.config(), group.group_id.clone(), &barrier);
                s.spawn(move || {
                    let ledger = Ledger::open(config)?;
                    barrier.wait();
                    ledger
                        .join_group(&gid, &format!("m{i:02}"))
                        .map(|m| m.position)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let joined = outcomes.iter().filter(|r| r.is_ok()).count();
    let full = outcomes
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::GroupFull { .. })))
        .count();
    assert_eq!(joined, 5);
    assert_eq!(full, 4);

    let positions: Vec<u32> = ledger
        .members(&group.group_id)
        .unwrap()
        .iter()
        .map(|m| m.position)
        .collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn racing_contributions_cannot_overdraw() {
    let db = TempDb::new();
    let ledger = Ledger::open(db.config()).unwrap();
    ledger.open_account("founder", 1_500).unwrap();
    let mut groups = Vec::new();
    for name in ["North", "South", "East", "West"] {
        let group = ledger
            .create_group(&NewGroup {
                name: name.into(),
                amount_per_person: 1_000,
                frequency: Frequency::Weekly,
                total_members: 3,
                founder_id: "founder".into(),
            })
            .unwrap();
        groups.push(group.group_id);
    }

    // The balance covers exactly one share; four groups race for it.
    let barrier = Barrier::new(groups.len());
    let outcomes: Vec<Result<i64, LedgerError>> = thread::scope(|s| {
        let handles: Vec<_> = groups
            .iter()
            .map(|gid| {
                let (config, barrier) = (db.config(), &barrier);
                s.spawn(move || {
                    let ledger = Ledger::open(config)?;
                    barrier.wait();
                    ledger.contribute(gid, "founder", 1)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().all(|r| match r {
        Ok(balance) => *balance == 500,
        Err(e) => matches!(e, LedgerError::InsufficientFunds { .. }),
    }));
    assert_eq!(ledger.balance("founder").unwrap(), 500);
    assert!(ledger.reconcile("founder").unwrap().is_balanced());
}

#[test]
fn racing_transfers_conserve_money() {
    let db = TempDb::new();
    let ledger = Ledger::open(db.config()).unwrap();
    ledger.open_account("a", 5_000).unwrap();
    ledger.open_account("b", 5_000).unwrap();

    thread::scope(|s| {
        for (from, to) in [("a", "b"), ("b", "a"), ("a", "b"), ("b", "a")] {
            let config = db.config();
            s.spawn(move || {
                let ledger = Ledger::open(config).unwrap();
                for _ in 0..10 {
                    ledger.transfer(from, to, 100).unwrap();
                }
            });
        }
    });

    let total = ledger.balance("a").unwrap() + ledger.balance("b").unwrap();
    assert_eq!(total, 10_000);
    assert_eq!(ledger.store().txn_count().unwrap(), 80);
    assert!(ledger.reconcile_all().unwrap().iter().all(|r| r.is_balanced()));
}
