//! The ledger orchestrator — the only entry point that mutates state.
//!
//! RULES:
//!   - Every mutating operation runs inside ONE write transaction
//!     (`BEGIN IMMEDIATE`), so the write lock is held from the first
//!     balance/membership read to the commit.
//!   - Any error after the first write rolls the whole unit back: an
//!     account is never left debited without its contribution and log
//!     record.
//!   - Every committed operation writes at least one `LedgerEvent`.
//!   - Reads that span several queries use a read transaction so they
//!     see one consistent snapshot.
//!
//! A `Ledger` owns one connection. Threads share a database by each
//! opening their own `Ledger` on the same file.

use crate::{
    account::{Account, AccountStore},
    config::LedgerConfig,
    contribution::{CycleEngine, CycleStatus, GroupPhase},
    error::{LedgerError, LedgerResult},
    event::{EventLogEntry, LedgerEvent},
    group_registry::{Group, GroupRegistry, Membership, NewGroup},
    reconciliation::{Reconciler, ReconciliationReport},
    store::{synthetic_failure, LedgerStore},
    transaction_log::{NewTransaction, TransactionKind, TransactionLog, TransactionRecord},
    types::{AccountId, Amount, CycleNumber, GroupId, Timestamp},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// A step inside a multi-write operation where a storage failure can be
/// forced. For tests and tooling only; production code never arms one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    AfterDebit,
    AfterCredit,
    AfterContribution,
    AfterCollectedFlag,
    AfterTransactionLog,
    BeforeCommit,
}

/// Result of a successful `mark_collected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub group_id:   GroupId,
    pub account_id: AccountId,
    pub cycle:      CycleNumber,
    pub amount:     Amount,
    pub balance:    Amount,
}

pub struct Ledger {
    store:  LedgerStore,
    config: LedgerConfig,
    armed_failure: Cell<Option<FailurePoint>>,
}

impl Ledger {
    /// Open the database named in `config` and apply migrations.
    pub fn open(config: LedgerConfig) -> LedgerResult<Self> {
        let store = if config.database_path == ":memory:" {
            LedgerStore::in_memory()?
        } else {
            LedgerStore::open(&config.database_path, config.busy_timeout())?
        };
        store.migrate()?;
        Ok(Self::with_store(store, config))
    }

    /// Fresh in-memory ledger (used in tests).
    pub fn in_memory() -> LedgerResult<Self> {
        Self::open(LedgerConfig::default_test())
    }

    /// Wrap an already-migrated store.
    pub fn with_store(store: LedgerStore, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            armed_failure: Cell::new(None),
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Arm a one-shot storage failure at `point`. The next operation that
    /// reaches that step fails with a storage error and rolls back.
    pub fn inject_failure(&self, point: FailurePoint) {
        self.armed_failure.set(Some(point));
    }

    // ── Accounts ──────────────────────────────────────────────────

    pub fn open_account(&self, account_id: &str, opening_balance: Amount) -> LedgerResult<Account> {
        let now = Utc::now();
        let account = self.atomically("open_account", || {
            let account = AccountStore::new(&self.store).open(account_id, opening_balance, now)?;
            self.record(
                LedgerEvent::AccountOpened {
                    account_id: account.account_id.clone(),
                    opening_balance,
                },
                now,
            )?;
            Ok(account)
        })?;
        log::info!("account {account_id} opened with balance {opening_balance}");
        Ok(account)
    }

    pub fn account(&self, account_id: &str) -> LedgerResult<Account> {
        AccountStore::new(&self.store).get(account_id)
    }

    pub fn accounts(&self) -> LedgerResult<Vec<Account>> {
        AccountStore::new(&self.store).list()
    }

    pub fn balance(&self, account_id: &str) -> LedgerResult<Amount> {
        AccountStore::new(&self.store).balance(account_id)
    }

    /// Debit `amount` and log it under `kind`. Returns the new balance.
    pub fn debit(
        &self,
        account_id: &str,
        amount: Amount,
        kind: TransactionKind,
        counterparty: Option<&str>,
    ) -> LedgerResult<Amount> {
        if kind.is_credit() {
            return Err(LedgerError::InvalidRange {
                field:  "kind",
                detail: format!("'{kind}' is not a debit kind"),
            });
        }
        let now = Utc::now();
        let balance = self.atomically("debit", || {
            self.debit_and_log(account_id, amount, kind, counterparty, now)
        })?;
        log::info!("{account_id} debited {amount} ({kind}), balance {balance}");
        Ok(balance)
    }

    /// Credit `amount`, logged as `Received`. Returns the new balance.
    pub fn credit(&self, account_id: &str, amount: Amount, counterparty: Option<&str>) -> LedgerResult<Amount> {
        let now = Utc::now();
        let balance = self.atomically("credit", || {
            self.credit_and_log(account_id, amount, counterparty, now)
        })?;
        log::info!("{account_id} credited {amount}, balance {balance}");
        Ok(balance)
    }

    /// Move `amount` between two accounts. Returns the sender's new balance.
    pub fn transfer(&self, from: &str, to: &str, amount: Amount) -> LedgerResult<Amount> {
        if from == to {
            return Err(LedgerError::InvalidRange {
                field:  "recipient",
                detail: "cannot transfer to the same account".into(),
            });
        }
        let now = Utc::now();
        let balance = self.atomically("transfer", || {
            let accounts = AccountStore::new(&self.store);
            if !accounts.exists(to)? {
                return Err(LedgerError::NotFound {
                    entity: "account",
                    id:     to.to_string(),
                });
            }
            let balance = self.debit_and_log(from, amount, TransactionKind::Transfer, Some(to), now)?;
            self.credit_and_log(to, amount, Some(from), now)?;
            self.record(
                LedgerEvent::TransferCompleted {
                    from: from.to_string(),
                    to:   to.to_string(),
                    amount,
                },
                now,
            )?;
            Ok(balance)
        })?;
        log::info!("transfer {from} -> {to}: {amount}");
        Ok(balance)
    }

    /// Newest first. `None` uses the configured default limit.
    pub fn history(&self, account_id: &str, limit: Option<u32>) -> LedgerResult<Vec<TransactionRecord>> {
        let limit = limit.unwrap_or(self.config.history_limit);
        self.read(|| {
            AccountStore::new(&self.store).get(account_id)?;
            TransactionLog::new(&self.store).list_for_account(account_id, limit)
        })
    }

    // ── Groups ────────────────────────────────────────────────────

    pub fn create_group(&self, new: &NewGroup) -> LedgerResult<Group> {
        let now = Utc::now();
        let group = self.atomically("create_group", || {
            let group = GroupRegistry::new(&self.store).create(new, now)?;
            self.record(
                LedgerEvent::GroupCreated {
                    group_id:          group.group_id.clone(),
                    name:              group.name.clone(),
                    founder_id:        group.created_by.clone(),
                    total_members:     group.total_members,
                    amount_per_person: group.amount_per_person,
                },
                now,
            )?;
            self.record(
                LedgerEvent::MemberJoined {
                    group_id:   group.group_id.clone(),
                    account_id: group.created_by.clone(),
                    position:   1,
                },
                now,
            )?;
            Ok(group)
        })?;
        log::info!(
            "group '{}' ({}) created by {}: {} x {} members",
            group.name,
            group.group_id,
            group.created_by,
            group.amount_per_person,
            group.total_members
        );
        Ok(group)
    }

    /// Join at the next position. Returns the new membership.
    pub fn join_group(&self, group_id: &str, account_id: &str) -> LedgerResult<Membership> {
        let now = Utc::now();
        let membership = self.atomically("join_group", || {
            let membership = GroupRegistry::new(&self.store).join(group_id, account_id, now)?;
            self.record(
                LedgerEvent::MemberJoined {
                    group_id:   group_id.to_string(),
                    account_id: account_id.to_string(),
                    position:   membership.position,
                },
                now,
            )?;
            Ok(membership)
        })?;
        log::info!(
            "{account_id} joined group {group_id} at position {}",
            membership.position
        );
        Ok(membership)
    }

    pub fn group(&self, group_id: &str) -> LedgerResult<Group> {
        GroupRegistry::new(&self.store).get(group_id)
    }

    pub fn group_by_name(&self, name: &str) -> LedgerResult<Option<Group>> {
        GroupRegistry::new(&self.store).find_by_name(name)
    }

    pub fn members(&self, group_id: &str) -> LedgerResult<Vec<Membership>> {
        self.read(|| GroupRegistry::new(&self.store).members(group_id))
    }

    pub fn groups_for_account(&self, account_id: &str) -> LedgerResult<Vec<Group>> {
        self.read(|| GroupRegistry::new(&self.store).groups_for_account(account_id))
    }

    pub fn close_group(&self, group_id: &str) -> LedgerResult<Group> {
        let now = Utc::now();
        let group = self.atomically("close_group", || {
            let group = GroupRegistry::new(&self.store).close(group_id)?;
            self.record(
                LedgerEvent::GroupClosed {
                    group_id: group_id.to_string(),
                },
                now,
            )?;
            Ok(group)
        })?;
        log::info!("group '{}' ({group_id}) closed", group.name);
        Ok(group)
    }

    // ── Cycles ────────────────────────────────────────────────────

    /// Pay `account_id`'s share into `cycle`. Returns the new balance.
    ///
    /// Debit, contribution row, and log record commit together or not at all.
    pub fn contribute(&self, group_id: &str, account_id: &str, cycle: CycleNumber) -> LedgerResult<Amount> {
        let now = Utc::now();
        let (balance, amount) = self.atomically("contribute", || {
            let engine = CycleEngine::new(&self.store);
            let group = engine.validate_contribution(group_id, account_id, cycle)?;

            let balance = AccountStore::new(&self.store).debit(account_id, group.amount_per_person)?;
            self.checkpoint(FailurePoint::AfterDebit)?;

            engine.record(&group, account_id, cycle, now)?;
            self.checkpoint(FailurePoint::AfterContribution)?;

            TransactionLog::new(&self.store).append(
                NewTransaction {
                    account_id:   account_id.to_string(),
                    kind:         TransactionKind::EsusuContribution,
                    amount:       group.amount_per_person,
                    counterparty: Some(group_id.to_string()),
                },
                now,
            )?;
            self.checkpoint(FailurePoint::AfterTransactionLog)?;

            self.record(
                LedgerEvent::ContributionRecorded {
                    group_id:   group_id.to_string(),
                    account_id: account_id.to_string(),
                    cycle,
                    amount:     group.amount_per_person,
                },
                now,
            )?;
            Ok((balance, group.amount_per_person))
        })?;
        log::info!("{account_id} contributed {amount} to group {group_id} cycle {cycle}, balance {balance}");
        Ok(balance)
    }

    pub fn cycle_status(&self, group_id: &str, cycle: CycleNumber) -> LedgerResult<CycleStatus> {
        self.read(|| CycleEngine::new(&self.store).cycle_status(group_id, cycle))
    }

    /// The lowest-position member who has not collected, if any remain.
    pub fn next_collector(&self, group_id: &str) -> LedgerResult<Option<Membership>> {
        self.read(|| CycleEngine::new(&self.store).next_collector(group_id))
    }

    pub fn current_cycle(&self, group_id: &str) -> LedgerResult<CycleNumber> {
        self.read(|| {
            GroupRegistry::new(&self.store).get(group_id)?;
            CycleEngine::new(&self.store).current_cycle(group_id)
        })
    }

    pub fn group_phase(&self, group_id: &str) -> LedgerResult<GroupPhase> {
        self.read(|| CycleEngine::new(&self.store).phase(group_id))
    }

    /// Pay the pot for `cycle` to `account_id` and flag them as collected.
    pub fn mark_collected(&self, group_id: &str, account_id: &str, cycle: CycleNumber) -> LedgerResult<Payout> {
        let now = Utc::now();
        let payout = self.atomically("mark_collected", || {
            let engine = CycleEngine::new(&self.store);
            let (group, _) = engine.validate_collection(group_id, account_id, cycle)?;

            engine.flag_collected(group_id, account_id)?;
            self.checkpoint(FailurePoint::AfterCollectedFlag)?;

            let amount = group.pot()?;
            let balance = self.credit_and_log(account_id, amount, Some(group_id), now)?;

            self.record(
                LedgerEvent::PayoutCollected {
                    group_id:   group_id.to_string(),
                    account_id: account_id.to_string(),
                    cycle,
                    amount,
                },
                now,
            )?;
            Ok(Payout {
                group_id:   group_id.to_string(),
                account_id: account_id.to_string(),
                cycle,
                amount,
                balance,
            })
        })?;
        log::info!(
            "{account_id} collected {} from group {group_id} cycle {cycle}",
            payout.amount
        );
        Ok(payout)
    }

    // ── Audit ─────────────────────────────────────────────────────

    pub fn reconcile(&self, account_id: &str) -> LedgerResult<ReconciliationReport> {
        self.read(|| Reconciler::new(&self.store).account(account_id))
    }

    pub fn reconcile_all(&self) -> LedgerResult<Vec<ReconciliationReport>> {
        self.read(|| Reconciler::new(&self.store).all())
    }

    pub fn events(&self, limit: u32) -> LedgerResult<Vec<EventLogEntry>> {
        self.store.events(limit)
    }

    // ── Internals ─────────────────────────────────────────────────

    /// Run `f` inside a write transaction. Commit on success, roll back on
    /// any error.
    fn atomically<T>(&self, op: &str, f: impl FnOnce() -> LedgerResult<T>) -> LedgerResult<T> {
        let tx = self.store.begin_write().map_err(|e| {
            log::error!("{op}: could not acquire write lock: {e}");
            e
        })?;
        let result = f().and_then(|value| {
            self.checkpoint(FailurePoint::BeforeCommit)?;
            Ok(value)
        });
        match result {
            Ok(value) => {
                tx.commit().map_err(|e| {
                    log::error!("{op}: commit failed: {e}");
                    LedgerError::from(e)
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    log::error!("{op}: rollback failed: {rollback_err}");
                }
                if err.is_storage() {
                    log::error!("{op} rolled back: {err}");
                } else {
                    log::warn!("{op} rejected: {err}");
                }
                Err(err)
            }
        }
    }

    /// Run `f` against one consistent snapshot.
    fn read<T>(&self, f: impl FnOnce() -> LedgerResult<T>) -> LedgerResult<T> {
        let tx = self.store.begin_read()?;
        let value = f()?;
        tx.commit()?;
        Ok(value)
    }

    fn debit_and_log(
        &self,
        account_id: &str,
        amount: Amount,
        kind: TransactionKind,
        counterparty: Option<&str>,
        now: Timestamp,
    ) -> LedgerResult<Amount> {
        let balance = AccountStore::new(&self.store).debit(account_id, amount)?;
        self.checkpoint(FailurePoint::AfterDebit)?;
        let record = TransactionLog::new(&self.store).append(
            NewTransaction {
                account_id:   account_id.to_string(),
                kind,
                amount,
                counterparty: counterparty.map(str::to_string),
            },
            now,
        )?;
        self.checkpoint(FailurePoint::AfterTransactionLog)?;
        self.record(
            LedgerEvent::AccountDebited {
                account_id: account_id.to_string(),
                txn_id: record.txn_id,
                kind: kind.as_str().to_string(),
                amount,
                balance,
            },
            now,
        )?;
        Ok(balance)
    }

    fn credit_and_log(
        &self,
        account_id: &str,
        amount: Amount,
        counterparty: Option<&str>,
        now: Timestamp,
    ) -> LedgerResult<Amount> {
        let balance = AccountStore::new(&self.store).credit(account_id, amount)?;
        self.checkpoint(FailurePoint::AfterCredit)?;
        let record = TransactionLog::new(&self.store).append(
            NewTransaction {
                account_id:   account_id.to_string(),
                kind:         TransactionKind::Received,
                amount,
                counterparty: counterparty.map(str::to_string),
            },
            now,
        )?;
        self.checkpoint(FailurePoint::AfterTransactionLog)?;
        self.record(
            LedgerEvent::AccountCredited {
                account_id: account_id.to_string(),
                txn_id: record.txn_id,
                amount,
                balance,
            },
            now,
        )?;
        Ok(balance)
    }

    fn record(&self, event: LedgerEvent, now: Timestamp) -> LedgerResult<()> {
        let entry = EventLogEntry::from_event(&event, now)?;
        self.store.append_event(&entry)?;
        Ok(())
    }

    fn checkpoint(&self, point: FailurePoint) -> LedgerResult<()> {
        if self.armed_failure.get() == Some(point) {
            self.armed_failure.set(None);
            return Err(synthetic_failure(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}
