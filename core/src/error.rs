use crate::types::{AccountId, Amount, CycleNumber, GroupId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Amount },

    #[error("Invalid {field}: {detail}")]
    InvalidRange { field: &'static str, detail: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} '{name}' already exists")]
    DuplicateName { entity: &'static str, name: String },

    #[error("Account '{account_id}' is already a member of group '{group_id}'")]
    AlreadyMember { group_id: GroupId, account_id: AccountId },

    #[error("Group '{group_id}' is full ({total_members} members)")]
    GroupFull { group_id: GroupId, total_members: u32 },

    #[error("Account '{account_id}' is not a member of group '{group_id}'")]
    NotMember { group_id: GroupId, account_id: AccountId },

    #[error("Insufficient funds in '{account_id}': balance {balance}, requested {requested}")]
    InsufficientFunds { account_id: AccountId, balance: Amount, requested: Amount },

    #[error("Account '{account_id}' already contributed to cycle {cycle} of group '{group_id}'")]
    DuplicateContribution { group_id: GroupId, account_id: AccountId, cycle: CycleNumber },

    #[error("Account '{account_id}' cannot collect cycle {cycle} of group '{group_id}': {reason}")]
    NotEligible { group_id: GroupId, account_id: AccountId, cycle: CycleNumber, reason: String },

    #[error("Account '{account_id}' has already collected from group '{group_id}'")]
    AlreadyCollected { group_id: GroupId, account_id: AccountId },

    #[error("Group '{group_id}' is closed")]
    GroupClosed { group_id: GroupId },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    /// Stable machine-readable name for the failure class.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount { .. }         => "InvalidAmount",
            LedgerError::InvalidRange { .. }          => "InvalidRange",
            LedgerError::NotFound { .. }              => "NotFound",
            LedgerError::DuplicateName { .. }         => "DuplicateName",
            LedgerError::AlreadyMember { .. }         => "AlreadyMember",
            LedgerError::GroupFull { .. }             => "GroupFull",
            LedgerError::NotMember { .. }             => "NotMember",
            LedgerError::InsufficientFunds { .. }     => "InsufficientFunds",
            LedgerError::DuplicateContribution { .. } => "DuplicateContribution",
            LedgerError::NotEligible { .. }           => "NotEligible",
            LedgerError::AlreadyCollected { .. }      => "AlreadyCollected",
            LedgerError::GroupClosed { .. }           => "GroupClosed",
            LedgerError::Storage(_)
            | LedgerError::Serialization(_)
            | LedgerError::Other(_)                   => "StorageError",
        }
    }

    /// True for unexpected infrastructure failures (500-equivalent).
    /// Everything else is a recoverable business-rule rejection.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            LedgerError::Storage(_) | LedgerError::Serialization(_) | LedgerError::Other(_)
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
