//! Report rendering for the `scan` and `batch` commands.
//!
//! Everything here is formatting over the serializable results handed back
//! by `riskbtc-core`; no scoring decisions are made in this module.

use std::fmt::Write as _;

use eyre::WrapErr;

use riskbtc_core::types::{AssessmentResult, BatchReport, RiskLevel, ScanOutcome};

use crate::cli::ReportFormat;

const CSV_HEADER: [&str; 3] = ["Address", "Usage Risk", "Vulnerability Risk"];

const USAGE_RECOMMENDATION: &str = "Avoid sending funds to this address. Monitor activity before interacting. Consider additional wallet hygiene checks.";
const VULNERABILITY_RECOMMENDATION: &str = "Treat this address as potentially compromised. Do not store significant funds here. Rotate to a freshly generated wallet using a secure tool.";

// ==============================================================================
// Input
// ==============================================================================

/// One address per line; surrounding whitespace trimmed, blank lines dropped.
pub fn parse_address_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

// ==============================================================================
// Filtering
// ==============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    pub high_only: bool,
    pub vulnerable_only: bool,
}

impl ReportFilter {
    pub fn keeps(&self, result: &AssessmentResult) -> bool {
        (!self.high_only || result.usage.level.is_elevated())
            && (!self.vulnerable_only || result.vulnerability.level.is_elevated())
    }

    /// Filters apply to assessed addresses only; scan errors and skipped
    /// addresses always stay in the report.
    pub fn apply<'a>(&self, report: &'a BatchReport) -> Vec<&'a ScanOutcome> {
        report
            .outcomes
            .iter()
            .filter(|outcome| outcome.as_assessed().map_or(true, |r| self.keeps(r)))
            .collect()
    }
}

// ==============================================================================
// Batch Formats
// ==============================================================================

/// JSON and text keep one entry per outcome; CSV has level columns and
/// lists assessed addresses only.
pub fn render_batch(format: ReportFormat, outcomes: &[&ScanOutcome]) -> eyre::Result<String> {
    match format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(outcomes).wrap_err("serialize JSON report")
        }
        ReportFormat::Csv => {
            let results: Vec<_> = outcomes.iter().filter_map(|o| o.as_assessed()).collect();
            render_csv(&results)
        }
        ReportFormat::Txt => Ok(render_txt(outcomes)),
    }
}

fn render_csv(results: &[&AssessmentResult]) -> eyre::Result<String> {
    // The header is written by hand so an empty report still carries it.
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)
        .wrap_err("write CSV header")?;
    for result in results {
        wtr.serialize(result.to_row())
            .wrap_err_with(|| format!("write CSV row for {}", result.address))?;
    }
    let bytes = wtr.into_inner().wrap_err("flush CSV report")?;
    String::from_utf8(bytes).wrap_err("CSV report is not UTF-8")
}

fn render_txt(outcomes: &[&ScanOutcome]) -> String {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            ScanOutcome::Assessed(result) => format!(
                "Address: {}\nUsage Risk: {}\nVulnerability Risk: {}\n",
                result.address, result.usage.level, result.vulnerability.level
            ),
            ScanOutcome::Failed { address, reason } => {
                format!("Address: {address}\nScan Error: {reason}\n")
            }
            ScanOutcome::Skipped { address } => {
                format!("Address: {address}\nNot scanned (batch cancelled)\n")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Addresses grouped by overall level, most severe first, then the
/// unverified addresses, then the ones that could not be scanned.
pub fn render_summary(report: &BatchReport) -> String {
    let mut out = String::new();
    for (level, addresses) in report.groups.by_severity() {
        let _ = writeln!(out, "{level} Risk:");
        for address in addresses {
            let _ = writeln!(out, "{address}");
        }
        out.push('\n');
    }

    if !report.groups.unverified.is_empty() {
        out.push_str("Unverified (nonce reuse check unavailable, not confirmed Low):\n");
        for address in &report.groups.unverified {
            let _ = writeln!(out, "{address}");
        }
        out.push('\n');
    }

    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            ScanOutcome::Failed { address, reason } => Some((address, reason)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        out.push_str("Scan Errors (malformed or unreachable):\n");
        for (address, reason) in failures {
            let _ = writeln!(out, "{address}: {reason}");
        }
        out.push('\n');
    }

    if report.cancelled {
        let skipped = report
            .outcomes
            .iter()
            .filter(|o| matches!(o, ScanOutcome::Skipped { .. }))
            .count();
        let _ = writeln!(out, "Cancelled: {skipped} address(es) not scanned.");
    }
    out
}

// ==============================================================================
// Single Address
// ==============================================================================

/// Detailed human-readable view of one assessment.
pub fn render_detail(result: &AssessmentResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Address: {}", result.address);

    let _ = writeln!(
        out,
        "Usage Risk: {} (score {})",
        result.usage.level, result.usage.score
    );
    push_reasons(&mut out, &result.usage.reasons);

    let _ = writeln!(
        out,
        "Vulnerability Risk: {} (score {})",
        result.vulnerability.level, result.vulnerability.score
    );
    push_reasons(&mut out, &result.vulnerability.reasons);

    let nonce = &result.nonce_reuse;
    if nonce.level == RiskLevel::Unknown {
        let _ = writeln!(out, "Nonce Reuse: {}", nonce.level);
    } else {
        let _ = writeln!(
            out,
            "Nonce Reuse: {} ({} transactions, {} signatures checked)",
            nonce.level, nonce.transactions_scanned, nonce.signatures_examined
        );
    }
    push_reasons(&mut out, &nonce.reasons);

    let _ = writeln!(
        out,
        "Balance: {:.8} BTC (~${:.2} at placeholder rate)",
        result.balance.btc, result.balance.approx_usd
    );

    if result.usage.level.is_elevated() {
        let _ = writeln!(out, "Recommendation: {USAGE_RECOMMENDATION}");
    }
    if result.vulnerability.level.is_elevated() || nonce.level == RiskLevel::Critical {
        let _ = writeln!(out, "Recommendation: {VULNERABILITY_RECOMMENDATION}");
    }
    out
}

fn push_reasons(out: &mut String, reasons: &[String]) {
    for reason in reasons {
        let _ = writeln!(out, "  - {reason}");
    }
}
