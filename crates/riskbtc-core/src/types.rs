//! Domain types for riskbtc's assessment model.
//!
//! Contains the raw on-chain inputs (`AddressSnapshot`, `TransactionInput`),
//! decoded signature material, score entries with their mapped
//! `RiskLevel`, and the per-address and batch results handed to the
//! presentation layer.

use bitcoin::{Amount, ScriptBuf, Txid};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ==============================================================================
// Risk Level
// ==============================================================================

/// Ordinal risk level: `Low < Moderate < High < Critical`.
///
/// `Unknown` is out-of-band. It marks results for which the required data
/// could not be obtained and has no rank, so it never takes part in
/// comparisons. A consumer must never read `Unknown` as "safe".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    /// Map a numeric score onto the four ordinal levels.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=2 => Self::Low,
            3..=5 => Self::Moderate,
            6..=8 => Self::High,
            _ => Self::Critical,
        }
    }

    /// Position on the ordinal scale; `None` for `Unknown`.
    #[must_use]
    pub fn rank(self) -> Option<u8> {
        match self {
            Self::Low => Some(0),
            Self::Moderate => Some(1),
            Self::High => Some(2),
            Self::Critical => Some(3),
            Self::Unknown => None,
        }
    }

    /// `High` or `Critical`: the levels that carry a recommendation.
    #[must_use]
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// The higher-ranked of two levels. `Unknown` loses to any ranked level.
    #[must_use]
    pub fn max_ranked(self, other: Self) -> Self {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) if b > a => other,
            (Some(_), _) => self,
            (None, _) => other,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

// ==============================================================================
// On-chain Inputs
// ==============================================================================

/// Aggregate chain statistics for one address, in satoshis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub transaction_count: u64,
    pub funded_total: u64,
    pub spent_total: u64,
    /// Unix seconds; 0 when the provider does not report it.
    pub first_seen_timestamp: u64,
}

impl AddressSnapshot {
    /// `funded_total - spent_total`. Spending more than was ever funded is
    /// an upstream data-integrity problem, not a negative balance.
    pub fn balance(&self) -> Result<Amount, CoreError> {
        self.funded_total
            .checked_sub(self.spent_total)
            .map(Amount::from_sat)
            .ok_or_else(|| {
                CoreError::MalformedSnapshot(format!(
                    "spent total {} exceeds funded total {}",
                    self.spent_total, self.funded_total
                ))
            })
    }
}

/// One transaction input that spends from the assessed address.
///
/// Legacy spends carry the signature in `signature_script`; segwit spends
/// carry it in `witness` and leave the script empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    pub txid: Txid,
    pub signature_script: Option<ScriptBuf>,
    pub witness: Vec<Vec<u8>>,
}

/// The two integers of an ECDSA signature, big-endian, exactly as encoded.
///
/// Leading `0x00` sign padding is preserved. Compare nonces through
/// [`SignatureComponents::normalized_r`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureComponents {
    pub r: Vec<u8>,
    pub s: Vec<u8>,
}

impl SignatureComponents {
    /// `r` with leading zero bytes stripped.
    #[must_use]
    pub fn normalized_r(&self) -> &[u8] {
        strip_leading_zeros(&self.r)
    }

    /// `s` with leading zero bytes stripped.
    #[must_use]
    pub fn normalized_s(&self) -> &[u8] {
        strip_leading_zeros(&self.s)
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

// ==============================================================================
// Scores
// ==============================================================================

/// A score and the reasons of the rules that fired, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: u32,
    pub reasons: Vec<String>,
}

/// A `ScoreEntry` together with the level it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredRisk {
    pub score: u32,
    pub level: RiskLevel,
    pub reasons: Vec<String>,
}

impl From<ScoreEntry> for ScoredRisk {
    fn from(entry: ScoreEntry) -> Self {
        Self {
            score: entry.score,
            level: RiskLevel::from_score(entry.score),
            reasons: entry.reasons,
        }
    }
}

// ==============================================================================
// Nonce Reuse
// ==============================================================================

/// Two distinct transactions signed with the same `r`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceReuseFinding {
    /// Normalized `r`, lowercase hex.
    pub r: String,
    pub first_txid: Txid,
    pub reusing_txid: Txid,
}

/// Outcome of a nonce-reuse pass. `level` is `Low`, `Critical` or `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceReuseReport {
    pub level: RiskLevel,
    pub reasons: Vec<String>,
    pub findings: Vec<NonceReuseFinding>,
    pub transactions_scanned: usize,
    pub signatures_examined: usize,
    pub malformed_signatures: usize,
}

impl NonceReuseReport {
    pub(crate) fn unknown(reason: impl Into<String>) -> Self {
        Self {
            level: RiskLevel::Unknown,
            reasons: vec![reason.into()],
            findings: Vec::new(),
            transactions_scanned: 0,
            signatures_examined: 0,
            malformed_signatures: 0,
        }
    }
}

// ==============================================================================
// Assessment Results
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub sats: u64,
    pub btc: f64,
    /// Derived from a fixed placeholder rate; not financial data.
    pub approx_usd: f64,
}

impl BalanceSnapshot {
    pub fn new(balance: Amount, usd_per_btc: f64) -> Self {
        let btc = balance.to_btc();
        Self {
            sats: balance.to_sat(),
            btc,
            approx_usd: btc * usd_per_btc,
        }
    }

    pub fn zero() -> Self {
        Self {
            sats: 0,
            btc: 0.0,
            approx_usd: 0.0,
        }
    }
}

/// Full assessment of one address. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub address: String,
    pub usage: ScoredRisk,
    pub vulnerability: ScoredRisk,
    pub nonce_reuse: NonceReuseReport,
    pub balance: BalanceSnapshot,
}

impl AssessmentResult {
    /// Highest ranked level across usage, vulnerability and nonce reuse.
    #[must_use]
    pub fn overall_level(&self) -> RiskLevel {
        self.usage
            .level
            .max_ranked(self.vulnerability.level)
            .max_ranked(self.nonce_reuse.level)
    }

    /// Nothing ranks above `Low`, but the nonce check could not run, so the
    /// address must not be reported as plain `Low`.
    #[must_use]
    pub fn is_unverified(&self) -> bool {
        self.nonce_reuse.level == RiskLevel::Unknown && self.overall_level() == RiskLevel::Low
    }

    /// Flattened tabular form used by CSV/text reports.
    #[must_use]
    pub fn to_row(&self) -> ReportRow {
        ReportRow {
            address: self.address.clone(),
            usage_risk: self.usage.level,
            vulnerability_risk: self.vulnerability.level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Usage Risk")]
    pub usage_risk: RiskLevel,
    #[serde(rename = "Vulnerability Risk")]
    pub vulnerability_risk: RiskLevel,
}

// ==============================================================================
// Batch Results
// ==============================================================================

/// Result for one address of a batch. Every input address yields exactly
/// one outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Assessed(AssessmentResult),
    /// The address could not be scanned (malformed or unreachable).
    Failed { address: String, reason: String },
    /// The batch was cancelled before this address was started.
    Skipped { address: String },
}

impl ScanOutcome {
    pub fn address(&self) -> &str {
        match self {
            Self::Assessed(result) => &result.address,
            Self::Failed { address, .. } | Self::Skipped { address } => address,
        }
    }

    pub fn as_assessed(&self) -> Option<&AssessmentResult> {
        match self {
            Self::Assessed(result) => Some(result),
            _ => None,
        }
    }
}

/// Addresses grouped by their overall level, in scan order within a group.
///
/// `unverified` holds assessed addresses that would otherwise be `Low` but
/// whose nonce-reuse check came back `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelGroups {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub moderate: Vec<String>,
    pub low: Vec<String>,
    pub unverified: Vec<String>,
    pub scan_errors: Vec<String>,
}

impl LevelGroups {
    pub fn push(&mut self, level: RiskLevel, address: String) {
        match level {
            RiskLevel::Critical => self.critical.push(address),
            RiskLevel::High => self.high.push(address),
            RiskLevel::Moderate => self.moderate.push(address),
            RiskLevel::Low => self.low.push(address),
            RiskLevel::Unknown => self.unverified.push(address),
        }
    }

    /// File an assessed address under its overall level, or under
    /// `unverified` when that level is an unconfirmed `Low`.
    pub fn record(&mut self, result: &AssessmentResult) {
        let level = if result.is_unverified() {
            RiskLevel::Unknown
        } else {
            result.overall_level()
        };
        self.push(level, result.address.clone());
    }

    /// Ranked groups from most to least severe, skipping empty ones.
    pub fn by_severity(&self) -> impl Iterator<Item = (RiskLevel, &[String])> {
        [
            (RiskLevel::Critical, self.critical.as_slice()),
            (RiskLevel::High, self.high.as_slice()),
            (RiskLevel::Moderate, self.moderate.as_slice()),
            (RiskLevel::Low, self.low.as_slice()),
        ]
        .into_iter()
        .filter(|(_, addresses)| !addresses.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<ScanOutcome>,
    pub groups: LevelGroups,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn assessed(&self) -> impl Iterator<Item = &AssessmentResult> {
        self.outcomes.iter().filter_map(ScanOutcome::as_assessed)
    }
}
