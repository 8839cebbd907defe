//! Group registry tests.
//!
//! Tests cover: creation validation, founder auto-join, contiguous
//! positions, capacity, duplicate membership, closing, and the
//! per-account group listing.

use esusu_core::{
    contribution::GroupPhase,
    group_registry::{Frequency, GroupStatus, NewGroup, MAX_MEMBERS, MIN_MEMBERS},
    Ledger, LedgerError,
};

fn build(accounts: &[&str]) -> Ledger {
    let ledger = Ledger::in_memory().expect("in-memory ledger");
    for id in accounts {
        ledger.open_account(id, 10_000).unwrap();
    }
    ledger
}

fn new_group(name: &str, total_members: u32, founder: &str) -> NewGroup {
    NewGroup {
        name: name.to_string(),
        amount_per_person: 1_000,
        frequency: Frequency::Weekly,
        total_members,
        founder_id: founder.to_string(),
    }
}

#[test]
fn founder_is_auto_joined_at_position_one() {
    let ledger = build(&["alice"]);
    let group = ledger.create_group(&new_group("Trio", 3, "alice")).unwrap();
    assert_eq!(group.status, GroupStatus::Active);
    assert_eq!(group.created_by, "alice");

    let members = ledger.members(&group.group_id).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].account_id, "alice");
    assert_eq!(members[0].position, 1);
    assert!(!members[0].has_collected);
}

#[test]
fn total_members_must_be_within_bounds() {
    let ledger = build(&["alice"]);
    for size in [0, MIN_MEMBERS - 1, MAX_MEMBERS + 1, 50] {
        let err = ledger
            .create_group(&new_group(&format!("g{size}"), size, "alice"))
            .unwrap_err();
        assert!(
            matches!(err, LedgerError::InvalidRange { field: "total_members", .. }),
            "size {size} gave {err:?}"
        );
    }
    for size in [MIN_MEMBERS, MAX_MEMBERS] {
        ledger
            .create_group(&new_group(&format!("ok{size}"), size, "alice"))
            .unwrap();
    }
}

#[test]
fn create_group_validates_inputs() {
    let ledger = build(&["alice"]);
    assert!(matches!(
        ledger.create_group(&new_group("  ", 3, "alice")),
        Err(LedgerError::InvalidRange { field: "name", .. })
    ));
    let mut zero = new_group("Zero", 3, "alice");
    zero.amount_per_person = 0;
    assert!(matches!(
        ledger.create_group(&zero),
        Err(LedgerError::InvalidAmount { amount: 0 })
    ));
    assert!(matches!(
        ledger.create_group(&new_group("Orphan", 3, "ghost")),
        Err(LedgerError::NotFound { entity: "account", .. })
    ));
}

#[test]
fn group_names_are_unique_and_case_sensitive() {
    let ledger = build(&["alice", "bob"]);
    ledger.create_group(&new_group("Trio", 3, "alice")).unwrap();
    assert!(matches!(
        ledger.create_group(&new_group("Trio", 5, "bob")),
        Err(LedgerError::DuplicateName { entity: "group", .. })
    ));
    ledger.create_group(&new_group("trio", 3, "bob")).unwrap();
    assert!(ledger.group_by_name("trio").unwrap().is_some());
}

#[test]
fn joins_get_contiguous_positions_until_full() {
    let ledger = build(&["a", "b", "c", "d", "e", "f"]);
    let group = ledger.create_group(&new_group("Five", 5, "a")).unwrap();
    for (expected, who) in [(2, "b"), (3, "c"), (4, "d"), (5, "e")] {
        let m = ledger.join_group(&group.group_id, who).unwrap();
        assert_eq!(m.position, expected);
    }
    assert!(matches!(
        ledger.join_group(&group.group_id, "f"),
        Err(LedgerError::GroupFull { total_members: 5, .. })
    ));

    let positions: Vec<u32> = ledger
        .members(&group.group_id)
        .unwrap()
        .iter()
        .map(|m| m.position)
        .collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
}

#[test]
fn join_rejections() {
    let ledger = build(&["alice", "bob"]);
    let group = ledger.create_group(&new_group("Trio", 3, "alice")).unwrap();

    assert!(matches!(
        ledger.join_group(&group.group_id, "alice"),
        Err(LedgerError::AlreadyMember { .. })
    ));
    ledger.join_group(&group.group_id, "bob").unwrap();
    assert!(matches!(
        ledger.join_group(&group.group_id, "bob"),
        Err(LedgerError::AlreadyMember { .. })
    ));
    assert!(matches!(
        ledger.join_group("no-such-group", "bob"),
        Err(LedgerError::NotFound { entity: "group", .. })
    ));
    assert!(matches!(
        ledger.join_group(&group.group_id, "ghost"),
        Err(LedgerError::NotFound { entity: "account", .. })
    ));
}

#[test]
fn closed_group_rejects_joins_and_second_close() {
    let ledger = build(&["alice", "bob"]);
    let group = ledger.create_group(&new_group("Trio", 3, "alice")).unwrap();
    let closed = ledger.close_group(&group.group_id).unwrap();
    assert_eq!(closed.status, GroupStatus::Closed);
    assert_eq!(ledger.group_phase(&group.group_id).unwrap(), GroupPhase::Closed);

    assert!(matches!(
        ledger.join_group(&group.group_id, "bob"),
        Err(LedgerError::GroupClosed { .. })
    ));
    assert!(matches!(
        ledger.close_group(&group.group_id),
        Err(LedgerError::GroupClosed { .. })
    ));
}

#[test]
fn groups_for_account_lists_every_membership() {
    let ledger = build(&["alice", "bob", "carol"]);
    ledger.create_group(&new_group("One", 3, "alice")).unwrap();
    let g2 = ledger.create_group(&new_group("Two", 4, "bob")).unwrap();
    ledger.join_group(&g2.group_id, "alice").unwrap();

    let mut names: Vec<String> = ledger
        .groups_for_account("alice")
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["One".to_string(), "Two".to_string()]);
    assert!(ledger.groups_for_account("carol").unwrap().is_empty());
    assert!(matches!(
        ledger.groups_for_account("ghost"),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn phase_reports_forming_until_full() {
    let ledger = build(&["alice", "bob", "carol"]);
    let group = ledger.create_group(&new_group("Trio", 3, "alice")).unwrap();
    assert_eq!(
        ledger.group_phase(&group.group_id).unwrap(),
        GroupPhase::Forming { members: 1, total_members: 3 }
    );
    ledger.join_group(&group.group_id, "bob").unwrap();
    ledger.join_group(&group.group_id, "carol").unwrap();
    assert!(matches!(
        ledger.group_phase(&group.group_id).unwrap(),
        GroupPhase::Full { cycle: 1, .. }
    ));
}
