//! Group registry — savings groups and their memberships.
//!
//! Positions are assigned in join order starting at 1 (the founder) and
//! are never reused: members do not leave.

use crate::{
    account::{require_positive, AccountStore},
    error::{LedgerError, LedgerResult},
    store::LedgerStore,
    types::{AccountId, Amount, GroupId, ParseEnumError, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

pub const MIN_MEMBERS: u32 = 3;
pub const MAX_MEMBERS: u32 = 12;

/// Informational only. Nothing schedules cycles from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily   => "daily",
            Frequency::Weekly  => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily"   => Ok(Frequency::Daily),
            "weekly"  => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(ParseEnumError { kind: "frequency", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Active,
    Closed,
}

impl GroupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupStatus::Active => "active",
            GroupStatus::Closed => "closed",
        }
    }
}

impl FromStr for GroupStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GroupStatus::Active),
            "closed" => Ok(GroupStatus::Closed),
            other => Err(ParseEnumError { kind: "group status", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_id:          GroupId,
    pub name:              String,
    pub amount_per_person: Amount,
    pub frequency:         Frequency,
    pub total_members:     u32,
    pub created_by:        AccountId,
    pub status:            GroupStatus,
    pub created_at:        Timestamp,
}

impl Group {
    pub fn is_closed(&self) -> bool {
        self.status == GroupStatus::Closed
    }

    /// The pot one collector receives: every member's share for a cycle.
    pub fn pot(&self) -> LedgerResult<Amount> {
        self.amount_per_person
            .checked_mul(Amount::from(self.total_members))
            .ok_or(LedgerError::InvalidAmount { amount: self.amount_per_person })
    }

    pub(crate) fn ensure_open(&self) -> LedgerResult<()> {
        if self.is_closed() {
            return Err(LedgerError::GroupClosed { group_id: self.group_id.clone() });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub group_id:      GroupId,
    pub account_id:    AccountId,
    pub position:      u32,
    pub has_collected: bool,
    pub joined_at:     Timestamp,
}

/// Parameters for `GroupRegistry::create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name:              String,
    pub amount_per_person: Amount,
    pub frequency:         Frequency,
    pub total_members:     u32,
    pub founder_id:        AccountId,
}

pub struct GroupRegistry<'s> {
    store: &'s LedgerStore,
}

impl<'s> GroupRegistry<'s> {
    pub fn new(store: &'s LedgerStore) -> Self {
        Self { store }
    }

    /// Create a group and auto-join the founder at position 1.
    pub fn create(&self, new: &NewGroup, now: Timestamp) -> LedgerResult<Group> {
        if !(MIN_MEMBERS..=MAX_MEMBERS).contains(&new.total_members) {
            return Err(LedgerError::InvalidRange {
                field:  "total_members",
                detail: format!(
                    "{} not in {MIN_MEMBERS}..={MAX_MEMBERS}",
                    new.total_members
                ),
            });
        }
        if new.name.trim().is_empty() {
            return Err(LedgerError::InvalidRange {
                field:  "name",
                detail: "must not be blank".into(),
            });
        }
        require_positive(new.amount_per_person)?;
        if !AccountStore::new(self.store).exists(&new.founder_id)? {
            return Err(LedgerError::NotFound {
                entity: "account",
                id:     new.founder_id.clone(),
            });
        }
        if self.store.group_name_exists(&new.name)? {
            return Err(LedgerError::DuplicateName {
                entity: "group",
                name:   new.name.clone(),
            });
        }

        let group = Group {
            group_id:          Uuid::new_v4().to_string(),
            name:              new.name.clone(),
            amount_per_person: new.amount_per_person,
            frequency:         new.frequency,
            total_members:     new.total_members,
            created_by:        new.founder_id.clone(),
            status:            GroupStatus::Active,
            created_at:        now,
        };
        self.store.insert_group(&group)?;
        self.store.insert_membership(&Membership {
            group_id:      group.group_id.clone(),
            account_id:    new.founder_id.clone(),
            position:      1,
            has_collected: false,
            joined_at:     now,
        })?;
        Ok(group)
    }

    /// Add `account_id` at the next free position.
    pub fn join(&self, group_id: &str, account_id: &str, now: Timestamp) -> LedgerResult<Membership> {
        let group = self.get(group_id)?;
        group.ensure_open()?;
        if !AccountStore::new(self.store).exists(account_id)? {
            return Err(LedgerError::NotFound {
                entity: "account",
                id:     account_id.to_string(),
            });
        }
        if self.store.membership(group_id, account_id)?.is_some() {
            return Err(LedgerError::AlreadyMember {
                group_id:   group_id.to_string(),
                account_id: account_id.to_string(),
            });
        }
        let count = self.store.member_count(group_id)?;
        if count >= group.total_members {
            return Err(LedgerError::GroupFull {
                group_id:      group_id.to_string(),
                total_members: group.total_members,
            });
        }
        let membership = Membership {
            group_id:      group_id.to_string(),
            account_id:    account_id.to_string(),
            position:      count + 1,
            has_collected: false,
            joined_at:     now,
        };
        self.store.insert_membership(&membership)?;
        Ok(membership)
    }

    pub fn get(&self, group_id: &str) -> LedgerResult<Group> {
        self.store
            .get_group(group_id)?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "group",
                id:     group_id.to_string(),
            })
    }

    pub fn find_by_name(&self, name: &str) -> LedgerResult<Option<Group>> {
        self.store.group_by_name(name)
    }

    /// Members ordered by position ascending.
    pub fn members(&self, group_id: &str) -> LedgerResult<Vec<Membership>> {
        self.get(group_id)?;
        self.store.members(group_id)
    }

    pub fn membership(&self, group_id: &str, account_id: &str) -> LedgerResult<Option<Membership>> {
        self.store.membership(group_id, account_id)
    }

    pub fn groups_for_account(&self, account_id: &str) -> LedgerResult<Vec<Group>> {
        if !AccountStore::new(self.store).exists(account_id)? {
            return Err(LedgerError::NotFound {
                entity: "account",
                id:     account_id.to_string(),
            });
        }
        self.store.groups_for_account(account_id)
    }

    /// Terminal transition. A closed group rejects join, contribute and collect.
    pub fn close(&self, group_id: &str) -> LedgerResult<Group> {
        let mut group = self.get(group_id)?;
        group.ensure_open()?;
        self.store.set_group_status(group_id, GroupStatus::Closed)?;
        group.status = GroupStatus::Closed;
        Ok(group)
    }
}
