//! ECDSA nonce-reuse detection.
//!
//! Two signatures made by the same key with the same nonce share `r`, and
//! that pair is enough to solve for the private key. The detector compares
//! normalized `r` values across the inputs an address has signed and
//! reports every pair that spans two distinct transactions.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use bitcoin::hex::DisplayHex;
use bitcoin::Txid;
use tracing::{debug, warn};

use crate::signature::extract_signature;
use crate::source::{with_timeout, BlockchainSource};
use crate::types::{NonceReuseFinding, NonceReuseReport, RiskLevel, TransactionInput};

/// Default number of most recent transactions examined per address.
pub const DEFAULT_NONCE_TX_LIMIT: usize = 10;

/// Raw result of one pass over a set of inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonceScan {
    pub findings: Vec<NonceReuseFinding>,
    pub transactions_scanned: usize,
    pub signatures_examined: usize,
    pub malformed_signatures: usize,
}

/// Compare the signatures of `inputs` and collect every reuse of `r` across
/// distinct transactions.
///
/// The first transaction an `r` appears in is remembered; each later
/// transaction carrying the same `r` yields one finding against it. Reuse
/// inside a single transaction is not reported. Undecodable signatures are
/// counted and skipped.
pub fn scan_inputs(inputs: &[TransactionInput]) -> NonceScan {
    let mut first_seen: HashMap<Vec<u8>, Txid> = HashMap::new();
    let mut transactions: HashSet<Txid> = HashSet::new();
    let mut scan = NonceScan::default();

    for input in inputs {
        transactions.insert(input.txid);

        let sig = match extract_signature(input) {
            None => continue,
            Some(Ok(sig)) => sig,
            Some(Err(err)) => {
                debug!(txid = %input.txid, error = %err, "skipping malformed signature");
                scan.malformed_signatures += 1;
                continue;
            }
        };
        scan.signatures_examined += 1;

        let r = sig.normalized_r();
        match first_seen.get(r) {
            Some(first_txid) if *first_txid != input.txid => {
                scan.findings.push(NonceReuseFinding {
                    r: r.to_lower_hex_string(),
                    first_txid: *first_txid,
                    reusing_txid: input.txid,
                });
            }
            Some(_) => {}
            None => {
                first_seen.insert(r.to_vec(), input.txid);
            }
        }
    }

    scan.transactions_scanned = transactions.len();
    scan
}

impl NonceScan {
    /// Map the pass onto a report: any finding is `Critical`, otherwise `Low`.
    pub fn into_report(self) -> NonceReuseReport {
        let mut reasons: Vec<String> = self
            .findings
            .iter()
            .map(|finding| {
                format!(
                    "R value reused in txid {} (first seen in {}) - cryptographic nonce vulnerability.",
                    finding.reusing_txid, finding.first_txid
                )
            })
            .collect();

        let level = if self.findings.is_empty() {
            if self.malformed_signatures > 0 {
                reasons.push(format!(
                    "{} input signature(s) could not be decoded and were skipped.",
                    self.malformed_signatures
                ));
            }
            RiskLevel::Low
        } else {
            RiskLevel::Critical
        };

        NonceReuseReport {
            level,
            reasons,
            findings: self.findings,
            transactions_scanned: self.transactions_scanned,
            signatures_examined: self.signatures_examined,
            malformed_signatures: self.malformed_signatures,
        }
    }
}

/// Fetch the inputs `address` signed in its `tx_limit` most recent
/// transactions and check them for nonce reuse.
///
/// A failed or timed-out fetch yields an `Unknown` report, never `Low`.
pub async fn detect_nonce_reuse(
    source: &dyn BlockchainSource,
    address: &str,
    tx_limit: usize,
    timeout: Duration,
) -> NonceReuseReport {
    let inputs = match with_timeout(timeout, source.fetch_recent_inputs(address, tx_limit)).await
    {
        Ok(inputs) => inputs,
        Err(err) => {
            warn!(%address, error = %err, "nonce scan could not fetch transactions");
            return NonceReuseReport::unknown("Unable to fetch transactions for nonce check.");
        }
    };

    let report = scan_inputs(&inputs).into_report();
    if report.level == RiskLevel::Critical {
        warn!(
            %address,
            findings = report.findings.len(),
            "signature nonce reuse detected"
        );
    }
    report
}
