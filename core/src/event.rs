//! The audit event log.
//!
//! RULE: every committed operation writes at least one event, inside
//! the same storage transaction as the change itself. Compound operations
//! write one event per step (a transfer logs the debit, the credit, and
//! the transfer itself).
//! Variants are only ever added, never removed or reordered.

use crate::types::{AccountId, Amount, CycleNumber, GroupId, Timestamp, TxnId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    // ── Accounts ───────────────────────────────────
    AccountOpened {
        account_id: AccountId,
        opening_balance: Amount,
    },
    AccountDebited {
        account_id: AccountId,
        txn_id: TxnId,
        kind: String,
        amount: Amount,
        balance: Amount,
    },
    AccountCredited {
        account_id: AccountId,
        txn_id: TxnId,
        amount: Amount,
        balance: Amount,
    },
    TransferCompleted {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },

    // ── Groups ─────────────────────────────────────
    GroupCreated {
        group_id: GroupId,
        name: String,
        founder_id: AccountId,
        total_members: u32,
        amount_per_person: Amount,
    },
    MemberJoined {
        group_id: GroupId,
        account_id: AccountId,
        position: u32,
    },
    GroupClosed {
        group_id: GroupId,
    },

    // ── Cycles ─────────────────────────────────────
    ContributionRecorded {
        group_id: GroupId,
        account_id: AccountId,
        cycle: CycleNumber,
        amount: Amount,
    },
    PayoutCollected {
        group_id: GroupId,
        account_id: AccountId,
        cycle: CycleNumber,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// Stable name used for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            LedgerEvent::AccountOpened { .. }        => "account_opened",
            LedgerEvent::AccountDebited { .. }       => "account_debited",
            LedgerEvent::AccountCredited { .. }      => "account_credited",
            LedgerEvent::TransferCompleted { .. }    => "transfer_completed",
            LedgerEvent::GroupCreated { .. }         => "group_created",
            LedgerEvent::MemberJoined { .. }         => "member_joined",
            LedgerEvent::GroupClosed { .. }          => "group_closed",
            LedgerEvent::ContributionRecorded { .. } => "contribution_recorded",
            LedgerEvent::PayoutCollected { .. }      => "payout_collected",
        }
    }
}

/// A persisted event as stored in the `event_log` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub event_type: String,
    pub payload:    String,
    pub created_at: Timestamp,
}

impl EventLogEntry {
    pub fn from_event(event: &LedgerEvent, created_at: Timestamp) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
            created_at,
        })
    }

    pub fn decode(&self) -> serde_json::Result<LedgerEvent> {
        serde_json::from_str(&self.payload)
    }
}
