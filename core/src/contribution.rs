//! Contribution cycle engine — per-cycle payments and the collection turn.
//!
//! The current cycle of a group is (members who have collected) + 1.
//! The next collector is the lowest-position member that has not
//! collected. A payout is eligible only once the group is full and every
//! member has paid into the current cycle.

use crate::{
    error::{LedgerError, LedgerResult},
    group_registry::{Group, GroupRegistry, Membership},
    store::LedgerStore,
    types::{AccountId, Amount, CycleNumber, GroupId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub group_id:       GroupId,
    pub account_id:     AccountId,
    pub amount:         Amount,
    pub cycle_number:   CycleNumber,
    pub contributed_at: Timestamp,
}

/// Who has and has not paid into one cycle. All lists follow position order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStatus {
    pub group_id:    GroupId,
    pub cycle:       CycleNumber,
    pub members:     Vec<AccountId>,
    pub contributed: Vec<AccountId>,
    pub pending:     Vec<AccountId>,
}

impl CycleStatus {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GroupPhase {
    /// Still accepting members.
    Forming { members: u32, total_members: u32 },
    /// Membership complete; `stage` describes the current cycle.
    Full { cycle: CycleNumber, stage: CycleStage },
    /// Every member has collected once.
    Completed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum CycleStage {
    Collecting { pending: usize },
    ReadyToPay { collector: AccountId },
}

pub struct CycleEngine<'s> {
    store: &'s LedgerStore,
}

impl<'s> CycleEngine<'s> {
    pub fn new(store: &'s LedgerStore) -> Self {
        Self { store }
    }

    fn registry(&self) -> GroupRegistry<'s> {
        GroupRegistry::new(self.store)
    }

    /// Every check `contribute` performs before money moves, except the
    /// balance check, which belongs to the account store's debit.
    pub fn validate_contribution(
        &self,
        group_id: &str,
        account_id: &str,
        cycle: CycleNumber,
    ) -> LedgerResult<Group> {
        let group = self.registry().get(group_id)?;
        group.ensure_open()?;
        validate_cycle(&group, cycle)?;
        self.require_member(&group, account_id)?;
        if self.store.contribution_exists(group_id, account_id, cycle)? {
            return Err(LedgerError::DuplicateContribution {
                group_id:   group_id.to_string(),
                account_id: account_id.to_string(),
                cycle,
            });
        }
        Ok(group)
    }

    pub fn record(
        &self,
        group: &Group,
        account_id: &str,
        cycle: CycleNumber,
        now: Timestamp,
    ) -> LedgerResult<Contribution> {
        let contribution = Contribution {
            group_id:       group.group_id.clone(),
            account_id:     account_id.to_string(),
            amount:         group.amount_per_person,
            cycle_number:   cycle,
            contributed_at: now,
        };
        self.store.insert_contribution(&contribution)?;
        Ok(contribution)
    }

    pub fn cycle_status(&self, group_id: &str, cycle: CycleNumber) -> LedgerResult<CycleStatus> {
        let group = self.registry().get(group_id)?;
        validate_cycle(&group, cycle)?;
        self.status_for(&group, cycle)
    }

    fn status_for(&self, group: &Group, cycle: CycleNumber) -> LedgerResult<CycleStatus> {
        let members: Vec<AccountId> = self
            .store
            .members(&group.group_id)?
            .into_iter()
            .map(|m| m.account_id)
            .collect();
        let paid: HashSet<AccountId> = self
            .store
            .contributors(&group.group_id, cycle)?
            .into_iter()
            .collect();
        let (contributed, pending): (Vec<AccountId>, Vec<AccountId>) =
            members.iter().cloned().partition(|a| paid.contains(a));
        Ok(CycleStatus {
            group_id: group.group_id.clone(),
            cycle,
            members,
            contributed,
            pending,
        })
    }

    pub fn current_cycle(&self, group_id: &str) -> LedgerResult<CycleNumber> {
        Ok(self.store.collected_count(group_id)? + 1)
    }

    pub fn next_collector(&self, group_id: &str) -> LedgerResult<Option<Membership>> {
        self.registry().get(group_id)?;
        self.store.next_uncollected(group_id)
    }

    /// All eligibility rules for a payout. Returns the group and the
    /// collector's membership when the payout may proceed.
    pub fn validate_collection(
        &self,
        group_id: &str,
        account_id: &str,
        cycle: CycleNumber,
    ) -> LedgerResult<(Group, Membership)> {
        let group = self.registry().get(group_id)?;
        group.ensure_open()?;
        let membership = self.require_member(&group, account_id)?;
        if membership.has_collected {
            return Err(LedgerError::AlreadyCollected {
                group_id:   group_id.to_string(),
                account_id: account_id.to_string(),
            });
        }

        let not_eligible = |reason: String| LedgerError::NotEligible {
            group_id:   group_id.to_string(),
            account_id: account_id.to_string(),
            cycle,
            reason,
        };

        let members = self.store.member_count(group_id)?;
        if members < group.total_members {
            return Err(not_eligible(format!(
                "group is still forming ({members}/{} members)",
                group.total_members
            )));
        }
        let current = self.current_cycle(group_id)?;
        if cycle != current {
            return Err(not_eligible(format!("current cycle is {current}")));
        }
        let status = self.status_for(&group, cycle)?;
        if !status.is_complete() {
            return Err(not_eligible(format!(
                "{} contribution(s) pending",
                status.pending.len()
            )));
        }
        match self.store.next_uncollected(group_id)? {
            Some(next) if next.account_id == account_id => Ok((group, membership)),
            Some(next) => Err(not_eligible(format!(
                "position {} ('{}') collects first",
                next.position, next.account_id
            ))),
            None => Err(not_eligible("rotation is complete".into())),
        }
    }

    pub fn flag_collected(&self, group_id: &str, account_id: &str) -> LedgerResult<()> {
        self.store.set_has_collected(group_id, account_id)
    }

    pub fn phase(&self, group_id: &str) -> LedgerResult<GroupPhase> {
        let group = self.registry().get(group_id)?;
        if group.is_closed() {
            return Ok(GroupPhase::Closed);
        }
        let members = self.store.member_count(group_id)?;
        if members < group.total_members {
            return Ok(GroupPhase::Forming {
                members,
                total_members: group.total_members,
            });
        }
        let cycle = self.current_cycle(group_id)?;
        if cycle > group.total_members {
            return Ok(GroupPhase::Completed);
        }
        let status = self.status_for(&group, cycle)?;
        let stage = if status.is_complete() {
            match self.store.next_uncollected(group_id)? {
                Some(next) => CycleStage::ReadyToPay { collector: next.account_id },
                None => return Ok(GroupPhase::Completed),
            }
        } else {
            CycleStage::Collecting { pending: status.pending.len() }
        };
        Ok(GroupPhase::Full { cycle, stage })
    }

    fn require_member(&self, group: &Group, account_id: &str) -> LedgerResult<Membership> {
        self.store
            .membership(&group.group_id, account_id)?
            .ok_or_else(|| LedgerError::NotMember {
                group_id:   group.group_id.clone(),
                account_id: account_id.to_string(),
            })
    }
}

/// A rotation has exactly `total_members` cycles.
fn validate_cycle(group: &Group, cycle: CycleNumber) -> LedgerResult<()> {
    if cycle == 0 || cycle > group.total_members {
        return Err(LedgerError::InvalidRange {
            field:  "cycle",
            detail: format!("{cycle} not in 1..={}", group.total_members),
        });
    }
    Ok(())
}
