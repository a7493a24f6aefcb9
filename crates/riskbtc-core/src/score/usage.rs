//! Behavioral usage risk from transaction count and balance.

use bitcoin::Amount;

use super::{evaluate, Rule};
use crate::types::ScoreEntry;

/// Fixed BTC→USD rate used for the approximate balance value.
///
/// This is a placeholder, not a price feed: the resulting dollar figure is
/// only an order-of-magnitude hint and must not be treated as financial data.
pub const PLACEHOLDER_USD_PER_BTC: f64 = 60_000.0;

const FALLBACK_REASON: &str = "Unable to fetch blockchain data - fallback risk assumed.";
const FALLBACK_SCORE: u32 = 1;

/// The on-chain signals the usage rules read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSignals {
    pub transaction_count: u64,
    pub balance: Amount,
}

const USAGE_RULES: &[Rule<UsageSignals>] = &[
    Rule {
        name: "low_activity",
        weight: 1,
        applies: |s| s.transaction_count < 3,
        reason: |s| {
            format!(
                "Low transaction activity ({} txs) - possibly burner or attack wallet.",
                s.transaction_count
            )
        },
    },
    Rule {
        name: "high_reuse",
        weight: 2,
        applies: |s| s.transaction_count > 10,
        reason: |s| format!("High reuse detected ({} txs).", s.transaction_count),
    },
    Rule {
        name: "drained",
        weight: 0,
        applies: |s| s.balance == Amount::ZERO,
        reason: |_| "Address has no remaining balance. Possibly emptied or inactive.".to_string(),
    },
];

/// Score usage risk. `None` means the signals could not be obtained and a
/// fixed fallback risk is assumed.
pub fn score_usage(signals: Option<&UsageSignals>) -> ScoreEntry {
    match signals {
        Some(signals) => evaluate(USAGE_RULES, signals),
        None => ScoreEntry {
            score: FALLBACK_SCORE,
            reasons: vec![FALLBACK_REASON.to_string()],
        },
    }
}
