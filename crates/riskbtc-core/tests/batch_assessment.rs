//! End-to-end batch assessment over an in-memory blockchain source.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::Txid;
use riskbtc_core::error::DataSourceError;
use riskbtc_core::types::{AddressSnapshot, TransactionInput};
use riskbtc_core::{
    AddressListRegistry, AssessConfig, Assessor, BlockchainSource, CancelFlag, CoreError,
    RiskLevel, ScanOutcome,
};

const REUSED: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";
const QUIET: &str = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy";
const OFFLINE: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
const LEAKED: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

#[derive(Default)]
struct FakeChain {
    snapshots: HashMap<&'static str, AddressSnapshot>,
    inputs: HashMap<&'static str, Vec<TransactionInput>>,
}

#[async_trait]
impl BlockchainSource for FakeChain {
    async fn fetch_address_snapshot(&self, address: &str) -> Result<AddressSnapshot, CoreError> {
        self.snapshots.get(address).copied().ok_or_else(|| {
            DataSourceError::Status {
                status: 502,
                message: "upstream down".into(),
            }
            .into()
        })
    }

    async fn fetch_recent_inputs(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionInput>, CoreError> {
        Ok(self
            .inputs
            .get(address)
            .map(|inputs| inputs.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

fn snapshot(transaction_count: u64, funded_total: u64, spent_total: u64) -> AddressSnapshot {
    AddressSnapshot {
        transaction_count,
        funded_total,
        spent_total,
        first_seen_timestamp: 0,
    }
}

/// A P2PKH spend whose signature carries `r`, with a high bit set so the
/// encoder adds a padding byte.
fn signed_input(txid_byte: u8, r_tag: u8) -> TransactionInput {
    let mut r = vec![0x00, 0x80 | r_tag];
    r.extend_from_slice(&[0x5a; 31]);
    let s = [0x21u8; 32];

    let mut sig = vec![0x30, (r.len() + s.len() + 4) as u8, 0x02, r.len() as u8];
    sig.extend_from_slice(&r);
    sig.extend_from_slice(&[0x02, s.len() as u8]);
    sig.extend_from_slice(&s);
    sig.push(0x01);

    let mut pubkey = vec![0x03];
    pubkey.extend_from_slice(&[0x77; 32]);

    let script = Builder::new()
        .push_slice(PushBytesBuf::try_from(sig).expect("sig push"))
        .push_slice(PushBytesBuf::try_from(pubkey).expect("pubkey push"))
        .into_script();

    let mut txid = [0u8; 32];
    txid[31] = txid_byte;
    TransactionInput {
        txid: Txid::from_byte_array(txid),
        signature_script: Some(script),
        witness: Vec::new(),
    }
}

fn chain() -> FakeChain {
    let mut chain = FakeChain::default();
    chain.snapshots.insert(REUSED, snapshot(14, 90_000, 40_000));
    chain
        .inputs
        .insert(REUSED, vec![signed_input(1, 3), signed_input(2, 4), signed_input(3, 3)]);
    chain.snapshots.insert(QUIET, snapshot(1, 5_000, 0));
    chain.snapshots.insert(LEAKED, snapshot(6, 5_000_000_000, 0));
    chain
}

fn addresses(list: &[&str]) -> Vec<String> {
    list.iter().map(|a| a.to_string()).collect()
}

#[tokio::test]
async fn batch_groups_addresses_and_isolates_failures() {
    let assessor = Assessor::new(Arc::new(chain()), AssessConfig::default())
        .with_registry(Arc::new(AddressListRegistry::from_addresses([LEAKED])));
    let input = addresses(&[REUSED, QUIET, OFFLINE, LEAKED]);

    let report = assessor.assess_batch(&input, &CancelFlag::new()).await;

    assert_eq!(report.outcomes.len(), 4);
    assert!(!report.cancelled);
    assert_eq!(report.groups.critical, addresses(&[REUSED, LEAKED]));
    assert_eq!(report.groups.low, addresses(&[QUIET]));
    assert_eq!(report.groups.scan_errors, addresses(&[OFFLINE]));

    let reused = report.outcomes[0].as_assessed().expect("assessed");
    assert_eq!(reused.usage.level, RiskLevel::Low);
    assert_eq!(reused.nonce_reuse.level, RiskLevel::Critical);
    assert_eq!(reused.nonce_reuse.findings.len(), 1);
    assert_eq!(reused.nonce_reuse.transactions_scanned, 3);

    match &report.outcomes[2] {
        ScanOutcome::Failed { address, reason } => {
            assert_eq!(address, OFFLINE);
            assert!(reason.contains("502"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let leaked = report.outcomes[3].as_assessed().expect("assessed");
    assert_eq!(leaked.vulnerability.level, RiskLevel::Critical);
    assert_eq!(leaked.balance.sats, 5_000_000_000);
}

#[tokio::test]
async fn nonce_limit_hides_reuse_outside_the_window() {
    let config = AssessConfig {
        nonce_tx_limit: 2,
        ..AssessConfig::default()
    };
    let result = Assessor::new(Arc::new(chain()), config)
        .assess(REUSED)
        .await
        .expect("assess");

    assert_eq!(result.nonce_reuse.level, RiskLevel::Low);
    assert_eq!(result.nonce_reuse.signatures_examined, 2);
}

#[tokio::test]
async fn results_serialize_for_reporting() {
    let result = Assessor::new(Arc::new(chain()), AssessConfig::default())
        .assess(QUIET)
        .await
        .expect("assess");

    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json["address"], QUIET);
    assert_eq!(json["usage"]["level"], "Low");
    assert_eq!(json["usage"]["score"], 1);
    assert_eq!(json["nonce_reuse"]["level"], "Low");

    let row = serde_json::to_value(result.to_row()).expect("serialize row");
    assert_eq!(row["Usage Risk"], "Low");
}
