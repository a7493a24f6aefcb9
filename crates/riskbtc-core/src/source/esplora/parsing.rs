use bitcoin::hex::FromHex;
use bitcoin::{ScriptBuf, Txid};
use serde::Deserialize;

use crate::error::{CoreError, DataSourceError};
use crate::types::{AddressSnapshot, TransactionInput};

// ==============================================================================
// Response Shapes
// ==============================================================================
//
// Only the fields riskbtc reads are declared; serde ignores the rest.

#[derive(Deserialize)]
struct AddressResponse {
    chain_stats: ChainStats,
}

#[derive(Deserialize)]
struct ChainStats {
    tx_count: u64,
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

#[derive(Deserialize)]
pub(super) struct TxResponse {
    txid: Txid,
    #[serde(default)]
    vin: Vec<VinResponse>,
}

impl TxResponse {
    pub(super) fn txid(&self) -> Txid {
        self.txid
    }
}

#[derive(Deserialize)]
struct VinResponse {
    #[serde(default)]
    is_coinbase: bool,
    #[serde(default)]
    prevout: Option<PrevoutResponse>,
    #[serde(default)]
    scriptsig: Option<String>,
    #[serde(default)]
    witness: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct PrevoutResponse {
    #[serde(default)]
    scriptpubkey_address: Option<String>,
}

// ==============================================================================
// Conversion
// ==============================================================================

pub(super) fn parse_address_snapshot(body: &str) -> Result<AddressSnapshot, CoreError> {
    let response: AddressResponse = serde_json::from_str(body).map_err(|e| {
        DataSourceError::InvalidResponse(format!("decode address stats: {e}"))
    })?;
    Ok(AddressSnapshot {
        transaction_count: response.chain_stats.tx_count,
        funded_total: response.chain_stats.funded_txo_sum,
        spent_total: response.chain_stats.spent_txo_sum,
        first_seen_timestamp: 0,
    })
}

pub(super) fn parse_tx_list(body: &str) -> Result<Vec<TxResponse>, CoreError> {
    serde_json::from_str(body)
        .map_err(|e| DataSourceError::InvalidResponse(format!("decode address txs: {e}")).into())
}

/// Flatten the inputs of `txs` that spend from `address`.
///
/// Inputs spending someone else's coins are dropped: only signatures made
/// by the assessed address's key are comparable for nonce reuse.
pub(super) fn inputs_spending_from(
    txs: &[TxResponse],
    address: &str,
) -> Result<Vec<TransactionInput>, CoreError> {
    let mut inputs = Vec::new();
    for tx in txs {
        for vin in &tx.vin {
            if vin.is_coinbase {
                continue;
            }
            let spends_from_address = vin
                .prevout
                .as_ref()
                .and_then(|p| p.scriptpubkey_address.as_deref())
                == Some(address);
            if !spends_from_address {
                continue;
            }

            let signature_script = match vin.scriptsig.as_deref() {
                None | Some("") => None,
                Some(hex) => Some(ScriptBuf::from_hex(hex).map_err(|e| {
                    DataSourceError::InvalidResponse(format!(
                        "invalid scriptsig hex in {}: {e}",
                        tx.txid
                    ))
                })?),
            };

            let witness = vin
                .witness
                .iter()
                .flatten()
                .map(|item| {
                    Vec::<u8>::from_hex(item).map_err(|e| {
                        DataSourceError::InvalidResponse(format!(
                            "invalid witness hex in {}: {e}",
                            tx.txid
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            inputs.push(TransactionInput {
                txid: tx.txid,
                signature_script,
                witness,
            });
        }
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

    fn tx_json(txid_byte: &str, vin: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "txid": txid_byte.repeat(32),
            "version": 1,
            "locktime": 0,
            "vin": vin,
            "vout": [],
            "status": { "confirmed": true, "block_height": 100, "block_time": 1_600_000_000 }
        })
    }

    #[test]
    fn parse_address_snapshot_reads_chain_stats() {
        let body = serde_json::json!({
            "address": ADDRESS,
            "chain_stats": {
                "funded_txo_count": 3,
                "funded_txo_sum": 150_000,
                "spent_txo_count": 2,
                "spent_txo_sum": 100_000,
                "tx_count": 5
            },
            "mempool_stats": {
                "funded_txo_count": 0,
                "funded_txo_sum": 0,
                "spent_txo_count": 0,
                "spent_txo_sum": 0,
                "tx_count": 0
            }
        })
        .to_string();

        let snapshot = parse_address_snapshot(&body).expect("should parse");
        assert_eq!(snapshot.transaction_count, 5);
        assert_eq!(snapshot.funded_total, 150_000);
        assert_eq!(snapshot.spent_total, 100_000);
    }

    #[test]
    fn parse_address_snapshot_rejects_missing_stats() {
        let err = parse_address_snapshot(r#"{"address":"x"}"#).expect_err("must fail");
        assert!(err.to_string().contains("decode address stats"));
    }

    #[test]
    fn inputs_are_filtered_to_the_address() {
        let body = serde_json::json!([
            tx_json("aa", serde_json::json!([
                {
                    "is_coinbase": false,
                    "prevout": { "scriptpubkey_address": ADDRESS, "value": 1000 },
                    "scriptsig": "0102",
                    "witness": null
                },
                {
                    "is_coinbase": false,
                    "prevout": { "scriptpubkey_address": "1SomeoneElse", "value": 1000 },
                    "scriptsig": "0103"
                }
            ])),
            tx_json("bb", serde_json::json!([
                {
                    "is_coinbase": false,
                    "prevout": { "scriptpubkey_address": ADDRESS, "value": 500 },
                    "scriptsig": "",
                    "witness": ["3006020101020101", "02ab"]
                }
            ]))
        ])
        .to_string();

        let txs = parse_tx_list(&body).expect("should parse");
        let inputs = inputs_spending_from(&txs, ADDRESS).expect("should convert");

        assert_eq!(inputs.len(), 2);
        assert_eq!(
            inputs[0].signature_script.as_ref().map(|s| s.to_bytes()),
            Some(vec![0x01, 0x02])
        );
        assert!(inputs[1].signature_script.is_none());
        assert_eq!(inputs[1].witness.len(), 2);
        assert_eq!(inputs[1].witness[1], vec![0x02, 0xab]);
    }

    #[test]
    fn coinbase_inputs_are_skipped() {
        let body = serde_json::json!([tx_json("cc", serde_json::json!([
            { "is_coinbase": true, "prevout": null, "scriptsig": "03a0bb0d" }
        ]))])
        .to_string();

        let txs = parse_tx_list(&body).expect("should parse");
        let inputs = inputs_spending_from(&txs, ADDRESS).expect("should convert");
        assert!(inputs.is_empty());
    }

    #[test]
    fn invalid_witness_hex_is_reported() {
        let body = serde_json::json!([tx_json("dd", serde_json::json!([
            {
                "is_coinbase": false,
                "prevout": { "scriptpubkey_address": ADDRESS },
                "witness": ["zz"]
            }
        ]))])
        .to_string();

        let txs = parse_tx_list(&body).expect("should parse");
        let err = inputs_spending_from(&txs, ADDRESS).expect_err("must fail");
        assert!(err.to_string().contains("invalid witness hex"));
    }
}
