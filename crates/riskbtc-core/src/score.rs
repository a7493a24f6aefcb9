//! Rule-table scoring.
//!
//! A scorer is an ordered list of [`Rule`]s evaluated in declaration order.
//! Every rule that applies adds its weight and appends exactly one reason,
//! so reason order always matches table order.

pub mod usage;
pub mod vulnerability;

pub use usage::{score_usage, UsageSignals, PLACEHOLDER_USD_PER_BTC};
pub use vulnerability::score_vulnerability;

use tracing::trace;

use crate::types::ScoreEntry;

/// One scoring rule over some context `T`.
pub struct Rule<T: ?Sized> {
    pub name: &'static str,
    /// Points added when the rule applies. Zero for informational rules.
    pub weight: u32,
    pub applies: fn(&T) -> bool,
    pub reason: fn(&T) -> String,
}

/// Evaluate `rules` against `ctx` in order.
pub fn evaluate<T: ?Sized>(rules: &[Rule<T>], ctx: &T) -> ScoreEntry {
    let mut entry = ScoreEntry::default();
    for rule in rules {
        if (rule.applies)(ctx) {
            trace!(rule = rule.name, weight = rule.weight, "rule fired");
            entry.score = entry.score.saturating_add(rule.weight);
            entry.reasons.push((rule.reason)(ctx));
        }
    }
    entry
}
