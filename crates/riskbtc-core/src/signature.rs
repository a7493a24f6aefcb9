//! DER-style ECDSA signature decoding.
//!
//! Only the structure is decoded: `0x30 len 0x02 rlen r 0x02 slen s`.
//! Nothing here checks that the integers are valid curve scalars or that the
//! signature verifies, and the decoder tolerates non-minimal encodings so
//! that odd signatures found on-chain still take part in nonce comparison.

use bitcoin::script::Instruction;

use crate::error::MalformedSignature;
use crate::types::{SignatureComponents, TransactionInput};

const SEQUENCE_TAG: u8 = 0x30;
const INTEGER_TAG: u8 = 0x02;

/// Decode a DER-style signature into its raw `(r, s)` components.
///
/// Bytes after the declared sequence length (normally the sighash-type byte)
/// are ignored.
pub fn decode_der_signature(bytes: &[u8]) -> Result<SignatureComponents, MalformedSignature> {
    let tag = *bytes
        .first()
        .ok_or(MalformedSignature::Truncated { offset: 0 })?;
    if tag != SEQUENCE_TAG {
        return Err(MalformedSignature::MissingSequenceTag { found: tag });
    }

    let (body, body_start) = read_length_prefixed(bytes, 1)?;

    let (r, after_r) = read_integer(body, 0, body_start)?;
    let (s, _) = read_integer(body, after_r, body_start)?;

    Ok(SignatureComponents {
        r: r.to_vec(),
        s: s.to_vec(),
    })
}

/// Read a one-byte length at `offset` and return the slice it covers plus the
/// absolute offset where that slice starts.
fn read_length_prefixed(buf: &[u8], offset: usize) -> Result<(&[u8], usize), MalformedSignature> {
    let declared = *buf
        .get(offset)
        .ok_or(MalformedSignature::Truncated { offset })? as usize;
    let start = offset + 1;
    let available = buf.len() - start;
    if declared > available {
        return Err(MalformedSignature::LengthOverflow {
            offset,
            declared,
            available,
        });
    }
    Ok((&buf[start..start + declared], start))
}

/// Read one `0x02 len value` integer from the sequence body. `base` is the
/// body's absolute offset and is only used for error reporting.
fn read_integer(
    body: &[u8],
    offset: usize,
    base: usize,
) -> Result<(&[u8], usize), MalformedSignature> {
    let tag = *body
        .get(offset)
        .ok_or(MalformedSignature::Truncated {
            offset: base + offset,
        })?;
    if tag != INTEGER_TAG {
        return Err(MalformedSignature::MissingIntegerTag {
            offset: base + offset,
            found: tag,
        });
    }

    let (value, value_start) =
        read_length_prefixed(body, offset + 1).map_err(|err| rebase(err, base))?;
    if value.is_empty() {
        return Err(MalformedSignature::EmptyInteger {
            offset: base + offset,
        });
    }

    Ok((value, value_start + value.len()))
}

fn rebase(err: MalformedSignature, base: usize) -> MalformedSignature {
    match err {
        MalformedSignature::Truncated { offset } => MalformedSignature::Truncated {
            offset: base + offset,
        },
        MalformedSignature::LengthOverflow {
            offset,
            declared,
            available,
        } => MalformedSignature::LengthOverflow {
            offset: base + offset,
            declared,
            available,
        },
        other => other,
    }
}

// ==============================================================================
// Locating Signatures in Inputs
// ==============================================================================

/// Find the first signature-shaped item of an input and decode it.
///
/// The scriptSig is walked instruction by instruction so push-data framing
/// (whose length bytes vary) never has to be stripped by hand. The first
/// pushed item starting with the sequence tag is the signature. Witness
/// items are tried when the scriptSig has none.
///
/// Returns `None` when the input carries nothing that looks like a
/// signature, e.g. a taproot key-path spend.
pub fn extract_signature(
    input: &TransactionInput,
) -> Option<Result<SignatureComponents, MalformedSignature>> {
    let from_script = input.signature_script.as_ref().and_then(|script| {
        script
            .instructions()
            .map_while(Result::ok)
            .find_map(|instruction| match instruction {
                Instruction::PushBytes(push) if push.as_bytes().first() == Some(&SEQUENCE_TAG) => {
                    Some(push.as_bytes())
                }
                _ => None,
            })
    });

    let candidate = from_script.or_else(|| {
        input
            .witness
            .iter()
            .find(|item| item.first() == Some(&SEQUENCE_TAG))
            .map(Vec::as_slice)
    })?;

    Some(decode_der_signature(candidate))
}
