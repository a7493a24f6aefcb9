//! Shared test helpers for `riskbtc-core` unit tests.
//!
//! Builders for DER signatures, signed inputs and deterministic txids so the
//! decoder, detector and orchestrator tests share one source of dummy data.

use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::Txid;

use crate::types::{AddressSnapshot, TransactionInput};

// ==============================================================================
// Txid Helpers
// ==============================================================================

/// Create a deterministic `Txid` from a single distinguishing byte.
pub fn txid_from_byte(b: u8) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[0] = b;
    Txid::from_byte_array(bytes)
}

// ==============================================================================
// Signature Builders
// ==============================================================================

/// Encode `(r, s)` as a DER signature with standard padding: leading zeros
/// are dropped and a single `0x00` is prepended when the high bit is set.
pub fn encode_der(r: &[u8], s: &[u8]) -> Vec<u8> {
    let r = der_integer(r);
    let s = der_integer(s);

    let mut out = vec![0x30, (r.len() + s.len() + 4) as u8];
    out.push(0x02);
    out.push(r.len() as u8);
    out.extend_from_slice(&r);
    out.push(0x02);
    out.push(s.len() as u8);
    out.extend_from_slice(&s);
    out
}

fn der_integer(value: &[u8]) -> Vec<u8> {
    let start = value.iter().position(|b| *b != 0).unwrap_or(value.len());
    let trimmed = &value[start..];
    if trimmed.is_empty() {
        return vec![0x00];
    }
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// A compressed-pubkey-shaped dummy push.
pub fn dummy_pubkey() -> Vec<u8> {
    let mut key = vec![0x02];
    key.extend_from_slice(&[0xab; 32]);
    key
}

/// A P2PKH-style input: `<sig+sighash> <pubkey>` in the scriptSig.
pub fn script_sig_input(txid: Txid, der: &[u8]) -> TransactionInput {
    let mut sig = der.to_vec();
    sig.push(0x01);

    let script = Builder::new()
        .push_slice(PushBytesBuf::try_from(sig).expect("signature fits a push"))
        .push_slice(PushBytesBuf::try_from(dummy_pubkey()).expect("pubkey fits a push"))
        .into_script();

    TransactionInput {
        txid,
        signature_script: Some(script),
        witness: Vec::new(),
    }
}

/// A P2WPKH-style input: empty scriptSig, `[sig+sighash, pubkey]` witness.
pub fn witness_input(txid: Txid, der: &[u8]) -> TransactionInput {
    let mut sig = der.to_vec();
    sig.push(0x01);
    TransactionInput {
        txid,
        signature_script: None,
        witness: vec![sig, dummy_pubkey()],
    }
}

/// A signed input whose signature has the given `r` and a fixed `s`.
pub fn input_with_r(txid: Txid, r: &[u8]) -> TransactionInput {
    script_sig_input(txid, &encode_der(r, &[0x24; 32]))
}

/// A 32-byte `r` distinguished by its first and last byte.
pub fn r_value(tag: u8) -> [u8; 32] {
    let mut r = [0x3c; 32];
    r[0] = tag;
    r[31] = tag;
    r
}

// ==============================================================================
// Snapshot Builders
// ==============================================================================

pub fn snapshot(transaction_count: u64, funded_total: u64, spent_total: u64) -> AddressSnapshot {
    AddressSnapshot {
        transaction_count,
        funded_total,
        spent_total,
        first_seen_timestamp: 0,
    }
}
