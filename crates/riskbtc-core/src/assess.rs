//! Assessment orchestration.
//!
//! [`Assessor`] composes the usage scorer, the vulnerability scorer and the
//! nonce-reuse detector into one [`AssessmentResult`] per address, and runs
//! batches of addresses with bounded concurrency and cooperative
//! cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::nonce::{detect_nonce_reuse, DEFAULT_NONCE_TX_LIMIT};
use crate::registry::{CompromisedKeyRegistry, NoRegistry};
use crate::score::{score_usage, score_vulnerability, UsageSignals, PLACEHOLDER_USD_PER_BTC};
use crate::source::{with_timeout, BlockchainSource};
use crate::types::{
    AddressSnapshot, AssessmentResult, BalanceSnapshot, BatchReport, LevelGroups, ScanOutcome,
};

// ==============================================================================
// Configuration
// ==============================================================================

#[derive(Debug, Clone)]
pub struct AssessConfig {
    /// Most recent transactions examined by the nonce-reuse detector.
    pub nonce_tx_limit: usize,
    /// Upper bound on each data-source call.
    pub fetch_timeout: Duration,
    /// Conversion rate for `BalanceSnapshot::approx_usd`.
    pub usd_per_btc: f64,
    /// Addresses not valid on this network are rejected.
    pub network: Network,
    /// Addresses assessed at once in a batch. 1 means sequential.
    pub batch_concurrency: usize,
}

impl Default for AssessConfig {
    fn default() -> Self {
        Self {
            nonce_tx_limit: DEFAULT_NONCE_TX_LIMIT,
            fetch_timeout: Duration::from_secs(15),
            usd_per_btc: PLACEHOLDER_USD_PER_BTC,
            network: Network::Bitcoin,
            batch_concurrency: 1,
        }
    }
}

/// Shared cancellation signal for a running batch.
///
/// Checked before each address starts; an address already in flight runs
/// to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ==============================================================================
// Assessor
// ==============================================================================

pub struct Assessor {
    source: Arc<dyn BlockchainSource>,
    registry: Arc<dyn CompromisedKeyRegistry>,
    config: AssessConfig,
}

impl Assessor {
    pub fn new(source: Arc<dyn BlockchainSource>, config: AssessConfig) -> Self {
        Self {
            source,
            registry: Arc::new(NoRegistry),
            config,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn CompromisedKeyRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &AssessConfig {
        &self.config
    }

    /// Assess one address.
    ///
    /// Only a malformed address is an error. An unreachable data source
    /// degrades the result instead: usage falls back to a fixed score and
    /// nonce reuse reports `Unknown`.
    pub async fn assess(&self, address: &str) -> Result<AssessmentResult, CoreError> {
        validate_address(address, self.config.network)?;

        let snapshot = match self.fetch_snapshot(address).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(%address, error = %err, "address snapshot unavailable, using fallback usage risk");
                None
            }
        };
        Ok(self.build_result(address, snapshot).await)
    }

    /// Batch entry point for one address. Never fails: a malformed address
    /// or an unreachable snapshot becomes `ScanOutcome::Failed`.
    pub async fn scan(&self, address: &str) -> ScanOutcome {
        if let Err(err) = validate_address(address, self.config.network) {
            return failed(address, &err);
        }
        match self.fetch_snapshot(address).await {
            Ok(snapshot) => ScanOutcome::Assessed(self.build_result(address, Some(snapshot)).await),
            Err(err) => {
                warn!(%address, error = %err, "scan failed");
                failed(address, &err)
            }
        }
    }

    /// Assess every address in order, at most `batch_concurrency` at a time.
    ///
    /// Produces exactly one outcome per input address, in input order.
    /// Addresses not yet started when `cancel` is raised become `Skipped`.
    pub async fn assess_batch(&self, addresses: &[String], cancel: &CancelFlag) -> BatchReport {
        let concurrency = self.config.batch_concurrency.max(1);
        info!(addresses = addresses.len(), concurrency, "starting batch");

        let scans: Vec<_> = addresses
            .iter()
            .map(|address| async move {
                if cancel.is_cancelled() {
                    return ScanOutcome::Skipped {
                        address: address.clone(),
                    };
                }
                self.scan(address).await
            })
            .collect();
        let outcomes: Vec<ScanOutcome> = stream::iter(scans)
            .buffered(concurrency)
            .collect()
            .await;

        let mut groups = LevelGroups::default();
        let mut cancelled = false;
        for outcome in &outcomes {
            match outcome {
                ScanOutcome::Assessed(result) => groups.record(result),
                ScanOutcome::Failed { address, .. } => groups.scan_errors.push(address.clone()),
                ScanOutcome::Skipped { .. } => cancelled = true,
            }
        }

        info!(
            critical = groups.critical.len(),
            high = groups.high.len(),
            moderate = groups.moderate.len(),
            low = groups.low.len(),
            unverified = groups.unverified.len(),
            scan_errors = groups.scan_errors.len(),
            cancelled,
            "batch complete"
        );

        BatchReport {
            outcomes,
            groups,
            cancelled,
        }
    }

    async fn fetch_snapshot(&self, address: &str) -> Result<AddressSnapshot, CoreError> {
        with_timeout(
            self.config.fetch_timeout,
            self.source.fetch_address_snapshot(address),
        )
        .await
    }

    async fn build_result(
        &self,
        address: &str,
        snapshot: Option<AddressSnapshot>,
    ) -> AssessmentResult {
        let signals = snapshot.and_then(|snapshot| match snapshot.balance() {
            Ok(balance) => Some(UsageSignals {
                transaction_count: snapshot.transaction_count,
                balance,
            }),
            Err(err) => {
                warn!(%address, error = %err, "malformed address snapshot, using fallback usage risk");
                None
            }
        });

        let usage = score_usage(signals.as_ref());
        let vulnerability = score_vulnerability(address, self.registry.as_ref());
        let nonce_reuse = detect_nonce_reuse(
            self.source.as_ref(),
            address,
            self.config.nonce_tx_limit,
            self.config.fetch_timeout,
        )
        .await;

        let balance = signals
            .map(|s| BalanceSnapshot::new(s.balance, self.config.usd_per_btc))
            .unwrap_or_else(BalanceSnapshot::zero);

        let result = AssessmentResult {
            address: address.to_owned(),
            usage: usage.into(),
            vulnerability: vulnerability.into(),
            nonce_reuse,
            balance,
        };

        info!(
            %address,
            usage = %result.usage.level,
            vulnerability = %result.vulnerability.level,
            nonce_reuse = %result.nonce_reuse.level,
            "assessment complete"
        );
        result
    }
}

/// Reject anything that does not parse as an address on `network`.
pub fn validate_address(address: &str, network: Network) -> Result<(), CoreError> {
    let invalid = |reason: String| CoreError::InvalidAddress {
        address: address.to_owned(),
        reason,
    };

    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| invalid(e.to_string()))?
        .require_network(network)
        .map_err(|e| invalid(e.to_string()))?;
    debug!(%address, %network, "address validated");
    Ok(())
}

fn failed(address: &str, err: &CoreError) -> ScanOutcome {
    ScanOutcome::Failed {
        address: address.to_owned(),
        reason: err.to_string(),
    }
}
