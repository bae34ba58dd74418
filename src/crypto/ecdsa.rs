//! ECDSA (secp256k1) signing with per-network output encoding
//!
//! Signatures are deterministic (RFC 6979) and low-S. Encoding rules:
//!
//! - EVM family: 65-byte `r || s || v`, `v` in {27, 28}
//! - Stacks: 65-byte `r || s || v`, `v` in {0, 1} (27 subtracted)
//! - Bitcoin / testnet / Liquid: fixed-length 64-byte compact `r || s`
//!
//! The Bitcoin-family encoding is deliberately compact, not DER; callers
//! that need DER re-encode on their side.

use crate::core::errors::SignerError;
use crate::core::network::NetworkId;
use crate::crypto::hd::HdKey;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, Secp256k1, SecretKey};

/// Recoverable compact signature.
pub struct EcdsaSignature {
    pub r_s: [u8; 64],
    /// Recovery id in {0, 1, 2, 3}; in practice 0 or 1 for our keys.
    pub recovery_id: u8,
}

/// Parse a 32-byte message hash from hex.
pub fn parse_message_hash(hash_hex: &str) -> Result<[u8; 32], SignerError> {
    let bytes = hex::decode(hash_hex.trim_start_matches("0x"))
        .map_err(|_| SignerError::InvalidMessageHash("Not valid hex".to_string()))?;
    if bytes.len() != 32 {
        return Err(SignerError::InvalidMessageHash(format!(
            "Expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Sign a 32-byte hash, returning the compact signature plus recovery id.
pub fn sign_recoverable(key: &HdKey, hash: &[u8; 32]) -> Result<EcdsaSignature, SignerError> {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(key.private_key_bytes()?.as_ref())
        .map_err(|_| SignerError::Crypto("Invalid private key".to_string()))?;
    let message = Message::from_slice(hash)
        .map_err(|_| SignerError::InvalidMessageHash("Bad digest".to_string()))?;

    let signature = secp.sign_ecdsa_recoverable(&message, &secret);
    let (recovery_id, compact) = signature.serialize_compact();

    let mut r_s = [0u8; 64];
    r_s.copy_from_slice(&compact);
    Ok(EcdsaSignature { r_s: ensure_low_s(&r_s), recovery_id: recovery_id.to_i32() as u8 })
}

/// Ensure the signature uses a low-S value (s <= n/2) to avoid malleability.
pub fn ensure_low_s(compact_sig: &[u8; 64]) -> [u8; 64] {
    if let Ok(mut sig) = Signature::from_compact(compact_sig) {
        sig.normalize_s();
        let mut out = [0u8; 64];
        out.copy_from_slice(&sig.serialize_compact());
        out
    } else {
        *compact_sig
    }
}

/// Encode a signature per the network's canonical rule.
///
/// Returns the signature bytes and, for recovery-id networks, the normalized
/// recovery id (always 0/1 regardless of the `v` convention in the bytes).
pub fn encode_signature(
    network: NetworkId,
    signature: &EcdsaSignature,
) -> (Vec<u8>, Option<u8>) {
    if !network.uses_recovery_id() {
        return (signature.r_s.to_vec(), None);
    }

    let v = match network {
        NetworkId::Evm => 27 + signature.recovery_id,
        // Stacks keeps v in {0, 1}; the 27 offset is an EVM-ism.
        _ => signature.recovery_id,
    };
    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(&signature.r_s);
    out.push(v);
    (out, Some(signature.recovery_id))
}
