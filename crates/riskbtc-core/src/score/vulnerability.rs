//! Vulnerability risk from the address text alone.
//!
//! None of these rules touch the network. They flag formats and patterns
//! that hint at keys produced by weak generators: legacy wallets, short
//! vanity searches, low-entropy strings and brainwallet phrases.

use super::{evaluate, Rule};
use crate::registry::CompromisedKeyRegistry;
use crate::types::ScoreEntry;

const WEAK_VANITY_PREFIXES: &[&str] = &[
    "1Love", "1Free", "1God", "1Win", "1Lucky", "1Q2W3E", "1Bitcoin",
];

const DICTIONARY_WORDS: &[&str] = &["god", "love", "bitcoin", "password", "wallet", "money"];

const MIN_REPEAT_RUN: usize = 5;

struct VulnerabilityContext<'a> {
    address: &'a str,
    vanity_prefix: Option<&'static str>,
    compromised: bool,
}

impl<'a> VulnerabilityContext<'a> {
    /// The address text not already claimed by a matched vanity prefix.
    /// Words inside the prefix ("1Love") are scored by the vanity rule and
    /// must not be counted a second time by the dictionary rule.
    fn unclaimed_text(&self) -> &'a str {
        match self.vanity_prefix {
            Some(prefix) => &self.address[prefix.len()..],
            None => self.address,
        }
    }
}

fn vulnerability_rules<'a>() -> [Rule<VulnerabilityContext<'a>>; 5] {
    [
        Rule {
            name: "legacy_p2pkh",
            weight: 2,
            applies: |ctx| ctx.address.starts_with('1'),
            reason: |_| {
                "Legacy P2PKH format - more commonly generated by older or insecure wallets."
                    .to_string()
            },
        },
        Rule {
            name: "weak_vanity_prefix",
            weight: 3,
            applies: |ctx| ctx.vanity_prefix.is_some(),
            reason: |ctx| {
                format!(
                    "Weak vanity prefix `{}` - may have been generated using a short or predictable pattern.",
                    ctx.vanity_prefix.unwrap_or_default()
                )
            },
        },
        Rule {
            name: "repeated_characters",
            weight: 2,
            applies: |ctx| longest_run(ctx.address) >= MIN_REPEAT_RUN,
            reason: |_| {
                "Address contains repeated characters - may be low entropy or brute-forced."
                    .to_string()
            },
        },
        Rule {
            name: "dictionary_word",
            weight: 2,
            applies: |ctx| find_word(ctx.unclaimed_text()).is_some(),
            reason: |ctx| {
                format!(
                    "Contains readable English word `{}` - possible brainwallet or vanity phrase.",
                    find_word(ctx.unclaimed_text()).unwrap_or_default()
                )
            },
        },
        Rule {
            name: "known_compromised",
            weight: 10,
            applies: |ctx| ctx.compromised,
            reason: |_| "Address matches known leaked private key.".to_string(),
        },
    ]
}

/// Score vulnerability risk for `address`, consulting `registry` for known
/// leaked keys.
pub fn score_vulnerability(address: &str, registry: &dyn CompromisedKeyRegistry) -> ScoreEntry {
    let ctx = VulnerabilityContext {
        address,
        vanity_prefix: WEAK_VANITY_PREFIXES
            .iter()
            .copied()
            .find(|prefix| address.starts_with(prefix)),
        compromised: registry.contains(address),
    };
    evaluate(&vulnerability_rules(), &ctx)
}

/// Length of the longest run of one repeated character.
fn longest_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous = None;
    for c in text.chars() {
        if Some(c) == previous {
            current += 1;
        } else {
            current = 1;
            previous = Some(c);
        }
        longest = longest.max(current);
    }
    longest
}

fn find_word(text: &str) -> Option<&'static str> {
    let lowercase = text.to_lowercase();
    DICTIONARY_WORDS
        .iter()
        .copied()
        .find(|word| lowercase.contains(word))
}
