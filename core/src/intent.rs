//! Free-text intent parsing for the chat boundary.
//!
//! A pure function from text to `Intent`. Nothing in the ledger depends
//! on it; callers map intents onto ledger operations themselves.
//! Keyword tables cover English and Nigerian Pidgin phrasings.

use crate::types::Amount;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    CheckBalance,
    Transfer { amount: Amount, recipient: String },
    BuyAirtime { amount: Amount },
    ShowHistory,
    Unknown,
}

const AIRTIME_WORDS: &[&str] = &["airtime", "recharge", "topup"];
const TRANSFER_WORDS: &[&str] = &["send", "transfer", "pay", "dash"];
const RECIPIENT_MARKERS: &[&str] = &["to", "give", "for"];
const HISTORY_WORDS: &[&str] = &["history", "transactions", "statement"];
const BALANCE_PHRASES: &[&str] = &[
    "balance",
    "how much i get",
    "how much i have",
    "how much money",
    "wetin remain",
    "wetin dey my account",
];
const HISTORY_PHRASES: &[&str] = &["wetin i don spend", "last transaction"];
const NOT_A_NAME: &[&str] = &["me", "my", "myself", "naira", "the", "am"];

pub fn parse_intent(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    // Keywords match case-insensitively; the recipient keeps its original case.
    let original: Vec<&str> = text
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | ';' | ':')))
        .filter(|t| !t.is_empty())
        .collect();
    let tokens: Vec<String> = original.iter().map(|t| t.to_lowercase()).collect();
    let has_word = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));
    let amount = tokens.iter().find_map(|t| parse_amount(t));

    if has_word(AIRTIME_WORDS) {
        return match amount {
            Some(amount) => Intent::BuyAirtime { amount },
            None => Intent::Unknown,
        };
    }
    if has_word(TRANSFER_WORDS) {
        return match (amount, recipient(&tokens, &original)) {
            (Some(amount), Some(recipient)) => Intent::Transfer { amount, recipient },
            _ => Intent::Unknown,
        };
    }
    if has_word(HISTORY_WORDS) || HISTORY_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Intent::ShowHistory;
    }
    if BALANCE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Intent::CheckBalance;
    }
    Intent::Unknown
}

/// "500", "5,000", "₦2000", "n2000", "2k" → whole Naira.
fn parse_amount(token: &str) -> Option<Amount> {
    let t = token.trim_start_matches('₦');
    let t = t.strip_prefix("ngn").unwrap_or(t);
    let t = match t.strip_prefix('n') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => t,
    };
    let (digits, multiplier) = match t.strip_suffix('k') {
        Some(rest) => (rest, 1_000),
        None => (t, 1),
    };
    let digits: String = digits.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: Amount = digits.parse().ok()?;
    let amount = value.checked_mul(multiplier)?;
    (amount > 0).then_some(amount)
}

/// The token after the first recipient marker that looks like a name.
/// `tokens` is the lowercased form of `original`, index for index.
fn recipient(tokens: &[String], original: &[&str]) -> Option<String> {
    (1..tokens.len())
        .filter(|&i| RECIPIENT_MARKERS.contains(&tokens[i - 1].as_str()))
        .find(|&i| {
            let name = tokens[i].trim_start_matches('@');
            !name.is_empty() && !NOT_A_NAME.contains(&name) && parse_amount(name).is_none()
        })
        .map(|i| original[i].trim_start_matches('@').to_string())
}
