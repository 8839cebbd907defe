//! Rotation simulator — drives one complete esusu rotation through a ledger.
//!
//! ORDER PER CYCLE (fixed, never reordered):
//!   1. Shuffle the payment order (PaymentOrder stream).
//!   2. For each member: maybe buy airtime (Spending stream), then contribute.
//!      A member who cannot cover the share is topped up by exactly the
//!      shortfall and contributes again.
//!   3. The next collector takes the pot.
//!
//! Same seed → same joins, same spending, same payouts.

use crate::{
    config::SimulationConfig,
    error::{LedgerError, LedgerResult},
    group_registry::{NewGroup, MAX_MEMBERS, MIN_MEMBERS},
    ledger::Ledger,
    rng::{RngBank, Stream},
    transaction_log::TransactionKind,
    types::{AccountId, Amount, GroupId},
};
use serde::{Deserialize, Serialize};

const AIRTIME_MIN: Amount = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub seed:              u64,
    pub group_id:          GroupId,
    pub group_name:        String,
    pub cycles_completed:  u32,
    pub contributions:     u32,
    pub airtime_purchases: u32,
    pub top_ups:           u32,
    pub total_paid_out:    Amount,
    /// Account ids in the order they collected.
    pub collectors:        Vec<AccountId>,
    pub final_balances:    Vec<(AccountId, Amount)>,
}

pub struct RotationSimulator {
    config:   SimulationConfig,
    rng_bank: RngBank,
}

impl RotationSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            rng_bank: RngBank::new(config.seed),
            config,
        }
    }

    pub fn run(&self, ledger: &Ledger) -> LedgerResult<SimulationSummary> {
        let cfg = &self.config;
        if !(MIN_MEMBERS..=MAX_MEMBERS).contains(&cfg.members) {
            return Err(LedgerError::InvalidRange {
                field:  "members",
                detail: format!("{} not in {MIN_MEMBERS}..={MAX_MEMBERS}", cfg.members),
            });
        }
        let mut join_rng = self.rng_bank.stream(Stream::JoinOrder);
        let mut pay_rng = self.rng_bank.stream(Stream::PaymentOrder);
        let mut spend_rng = self.rng_bank.stream(Stream::Spending);

        let prefix = format!("sim{}", cfg.seed);
        let accounts: Vec<AccountId> = (1..=cfg.members)
            .map(|i| format!("{prefix}-m{i:02}"))
            .collect();
        for account_id in &accounts {
            ledger.open_account(account_id, cfg.opening_balance)?;
        }

        let group = ledger.create_group(&NewGroup {
            name:              format!("{prefix}-circle"),
            amount_per_person: cfg.amount_per_person,
            frequency:         cfg.frequency,
            total_members:     cfg.members,
            founder_id:        accounts[0].clone(),
        })?;
        let mut joiners = accounts[1..].to_vec();
        join_rng.shuffle(&mut joiners);
        for account_id in &joiners {
            ledger.join_group(&group.group_id, account_id)?;
        }

        let mut summary = SimulationSummary {
            seed:              cfg.seed,
            group_id:          group.group_id.clone(),
            group_name:        group.name.clone(),
            cycles_completed:  0,
            contributions:     0,
            airtime_purchases: 0,
            top_ups:           0,
            total_paid_out:    0,
            collectors:        Vec::new(),
            final_balances:    Vec::new(),
        };

        for cycle in 1..=cfg.members {
            let mut order = accounts.clone();
            pay_rng.shuffle(&mut order);

            for account_id in &order {
                if cfg.max_airtime >= AIRTIME_MIN && spend_rng.chance(cfg.airtime_probability) {
                    let amount = spend_rng.amount_between(AIRTIME_MIN, cfg.max_airtime);
                    match ledger.debit(account_id, amount, TransactionKind::Airtime, Some("airtime")) {
                        Ok(_) => summary.airtime_purchases += 1,
                        Err(LedgerError::InsufficientFunds { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }

                match ledger.contribute(&group.group_id, account_id, cycle) {
                    Ok(_) => {}
                    Err(LedgerError::InsufficientFunds { balance, requested, .. }) => {
                        ledger.credit(account_id, requested - balance, Some("top-up"))?;
                        summary.top_ups += 1;
                        ledger.contribute(&group.group_id, account_id, cycle)?;
                    }
                    Err(e) => return Err(e),
                }
                summary.contributions += 1;
            }

            let collector = ledger.next_collector(&group.group_id)?.ok_or_else(|| {
                LedgerError::Other(anyhow::anyhow!(
                    "no collector left for cycle {cycle} of {}",
                    group.group_id
                ))
            })?;
            let payout = ledger.mark_collected(&group.group_id, &collector.account_id, cycle)?;
            log::debug!(
                "cycle {cycle}: {} collected {}",
                payout.account_id,
                payout.amount
            );
            summary.total_paid_out += payout.amount;
            summary.collectors.push(payout.account_id);
            summary.cycles_completed += 1;
        }

        for account_id in &accounts {
            summary
                .final_balances
                .push((account_id.clone(), ledger.balance(account_id)?));
        }
        log::info!(
            "simulation seed={} finished: {} cycles, {} contributions, paid out {}",
            cfg.seed,
            summary.cycles_completed,
            summary.contributions,
            summary.total_paid_out
        );
        Ok(summary)
    }
}
