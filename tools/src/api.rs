//! JSON-lines request handling for `--serve`.
//!
//! Each request maps onto one ledger operation. Responses carry an
//! HTTP-equivalent status so a transport layer can forward them as is.

use esusu_core::{
    group_registry::{Frequency, NewGroup},
    intent::{parse_intent, Intent},
    transaction_log::TransactionKind,
    types::{Amount, CycleNumber},
    Ledger, LedgerError, LedgerResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    OpenAccount {
        account_id: String,
        #[serde(default)]
        opening_balance: Amount,
    },
    Balance {
        account_id: String,
    },
    Debit {
        account_id: String,
        amount: Amount,
        kind: TransactionKind,
        #[serde(default)]
        counterparty: Option<String>,
    },
    Credit {
        account_id: String,
        amount: Amount,
        #[serde(default)]
        counterparty: Option<String>,
    },
    Transfer {
        from: String,
        to: String,
        amount: Amount,
    },
    History {
        account_id: String,
        #[serde(default)]
        limit: Option<u32>,
    },
    CreateGroup {
        name: String,
        amount_per_person: Amount,
        frequency: Frequency,
        total_members: u32,
        founder_id: String,
    },
    Join {
        group_id: String,
        account_id: String,
    },
    Members {
        group_id: String,
    },
    Groups {
        account_id: String,
    },
    Contribute {
        group_id: String,
        account_id: String,
        cycle: CycleNumber,
    },
    Status {
        group_id: String,
        cycle: CycleNumber,
    },
    Phase {
        group_id: String,
    },
    Collect {
        group_id: String,
        account_id: String,
        cycle: CycleNumber,
    },
    CloseGroup {
        group_id: String,
    },
    Reconcile {
        account_id: String,
    },
    Chat {
        account_id: String,
        text: String,
    },
    Quit,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

/// Which status family a rejected operation reports.
#[derive(Clone, Copy)]
enum Surface {
    Command,
    Collect,
}

pub fn handle(ledger: &Ledger, request: Request) -> Response {
    let surface = match request {
        Request::Collect { .. } => Surface::Collect,
        _ => Surface::Command,
    };
    let created = matches!(request, Request::CreateGroup { .. } | Request::OpenAccount { .. });
    match dispatch(ledger, request) {
        Ok(body) => Response {
            status: if created { 201 } else { 200 },
            body: Some(body),
            error: None,
        },
        Err(err) => Response {
            status: status_for(&err, surface),
            body: None,
            error: Some(ApiError {
                code: err.code(),
                message: err.to_string(),
            }),
        },
    }
}

fn dispatch(ledger: &Ledger, request: Request) -> LedgerResult<Value> {
    let body = match request {
        Request::OpenAccount { account_id, opening_balance } => {
            let account = ledger.open_account(&account_id, opening_balance)?;
            serde_json::to_value(account)?
        }
        Request::Balance { account_id } => {
            json!({ "account_id": account_id, "balance": ledger.balance(&account_id)? })
        }
        Request::Debit { account_id, amount, kind, counterparty } => {
            let balance = ledger.debit(&account_id, amount, kind, counterparty.as_deref())?;
            json!({ "balance": balance })
        }
        Request::Credit { account_id, amount, counterparty } => {
            let balance = ledger.credit(&account_id, amount, counterparty.as_deref())?;
            json!({ "balance": balance })
        }
        Request::Transfer { from, to, amount } => {
            json!({ "balance": ledger.transfer(&from, &to, amount)? })
        }
        Request::History { account_id, limit } => {
            serde_json::to_value(ledger.history(&account_id, limit)?)?
        }
        Request::CreateGroup { name, amount_per_person, frequency, total_members, founder_id } => {
            let group = ledger.create_group(&NewGroup {
                name,
                amount_per_person,
                frequency,
                total_members,
                founder_id,
            })?;
            json!({ "group_id": group.group_id })
        }
        Request::Join { group_id, account_id } => {
            let membership = ledger.join_group(&group_id, &account_id)?;
            json!({ "position": membership.position })
        }
        Request::Members { group_id } => serde_json::to_value(ledger.members(&group_id)?)?,
        Request::Groups { account_id } => {
            serde_json::to_value(ledger.groups_for_account(&account_id)?)?
        }
        Request::Contribute { group_id, account_id, cycle } => {
            json!({ "balance": ledger.contribute(&group_id, &account_id, cycle)? })
        }
        Request::Status { group_id, cycle } => {
            let status = ledger.cycle_status(&group_id, cycle)?;
            json!({
                "members": status.members,
                "contributed": status.contributed,
                "pending": status.pending,
            })
        }
        Request::Phase { group_id } => serde_json::to_value(ledger.group_phase(&group_id)?)?,
        Request::Collect { group_id, account_id, cycle } => {
            serde_json::to_value(ledger.mark_collected(&group_id, &account_id, cycle)?)?
        }
        Request::CloseGroup { group_id } => serde_json::to_value(ledger.close_group(&group_id)?)?,
        Request::Reconcile { account_id } => {
            let report = ledger.reconcile(&account_id)?;
            json!({ "balanced": report.is_balanced(), "report": report })
        }
        Request::Chat { account_id, text } => chat(ledger, &account_id, &text)?,
        Request::Quit => Value::Null,
    };
    Ok(body)
}

fn chat(ledger: &Ledger, account_id: &str, text: &str) -> LedgerResult<Value> {
    let intent = parse_intent(text);
    let result = match &intent {
        Intent::CheckBalance => json!({ "balance": ledger.balance(account_id)? }),
        Intent::Transfer { amount, recipient } => {
            json!({ "balance": ledger.transfer(account_id, recipient, *amount)? })
        }
        Intent::BuyAirtime { amount } => {
            let balance = ledger.debit(account_id, *amount, TransactionKind::Airtime, Some("airtime"))?;
            json!({ "balance": balance })
        }
        Intent::ShowHistory => serde_json::to_value(ledger.history(account_id, None)?)?,
        Intent::Unknown => Value::Null,
    };
    Ok(json!({ "intent": intent, "result": result }))
}

fn status_for(err: &LedgerError, surface: Surface) -> u16 {
    if err.is_storage() {
        return 500;
    }
    match (err, surface) {
        (LedgerError::NotFound { .. }, _) => 404,
        (LedgerError::GroupClosed { .. }, _) => 409,
        (LedgerError::NotEligible { .. } | LedgerError::AlreadyCollected { .. }, _) => 409,
        (_, Surface::Collect) => 409,
        (_, Surface::Command) => 400,
    }
}
