//! BIP-340 Schnorr signatures over secp256k1
//!
//! Implemented directly on k256 field/point arithmetic so the construction
//! follows BIP-340 to the letter: tagged hashes with the duplicated
//! pre-hashed tag prefix, Y-parity negation of both the private and nonce
//! scalars, and aux-rand masking of the private key bytes. Signatures are
//! 64 bytes: `R.x || s`, both big-endian and zero-padded.

use crate::core::errors::SignerError;
use k256::elliptic_curve::group::GroupEncoding;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::{Field, Group, PrimeField};
use k256::{AffinePoint, CompressedPoint, FieldBytes, ProjectivePoint, Scalar, U256};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const TAG_AUX: &str = "BIP0340/aux";
const TAG_NONCE: &str = "BIP0340/nonce";
const TAG_CHALLENGE: &str = "BIP0340/challenge";

/// BIP-340 tagged hash: `SHA256(SHA256(tag) || SHA256(tag) || msg)`.
///
/// The tag is pre-hashed and the digest written twice; hashing `tag || tag`
/// directly would be a different (wrong) construction.
fn tagged_hash(tag: &str, chunks: &[&[u8]]) -> [u8; 32] {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

fn scalar_from_canonical(bytes: &[u8; 32]) -> Option<Scalar> {
    Option::from(Scalar::from_repr(*FieldBytes::from_slice(bytes)))
}

fn scalar_reduce(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(bytes))
}

/// Decompress an x-only public key to the even-Y point.
fn lift_x(x: &[u8; 32]) -> Option<AffinePoint> {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(x);
    Option::from(AffinePoint::from_bytes(CompressedPoint::from_slice(&compressed)))
}

/// Sign a 32-byte message with explicit auxiliary randomness.
///
/// A nonce that reduces to zero is rejected with `SchnorrNonceIsZero`; the
/// caller retries with fresh aux randomness rather than this function
/// silently re-rolling.
pub fn sign_with_aux(
    private_key: &[u8; 32],
    message: &[u8; 32],
    aux_rand: &[u8; 32],
) -> Result<[u8; 64], SignerError> {
    let d_unsigned = scalar_from_canonical(private_key)
        .filter(|d| !bool::from(d.is_zero()))
        .ok_or_else(|| SignerError::Crypto("Invalid private scalar".to_string()))?;

    let p_point = (ProjectivePoint::GENERATOR * d_unsigned).to_affine();
    let mut d = if bool::from(p_point.y_is_odd()) { -d_unsigned } else { d_unsigned };
    let px: [u8; 32] = p_point.x().into();

    // t = d XOR H_aux(aux_rand), masking the key bytes that feed the nonce
    let mut aux_hash = tagged_hash(TAG_AUX, &[aux_rand]);
    let mut d_bytes: [u8; 32] = d.to_bytes().into();
    let mut t = [0u8; 32];
    for i in 0..32 {
        t[i] = d_bytes[i] ^ aux_hash[i];
    }
    d_bytes.zeroize();
    aux_hash.zeroize();

    let mut nonce_hash = tagged_hash(TAG_NONCE, &[&t, &px, message]);
    t.zeroize();
    let k_unsigned = scalar_reduce(&nonce_hash);
    nonce_hash.zeroize();
    if bool::from(k_unsigned.is_zero()) {
        return Err(SignerError::SchnorrNonceIsZero);
    }

    let r_point = (ProjectivePoint::GENERATOR * k_unsigned).to_affine();
    let mut k = if bool::from(r_point.y_is_odd()) { -k_unsigned } else { k_unsigned };
    let rx: [u8; 32] = r_point.x().into();

    let e_hash = tagged_hash(TAG_CHALLENGE, &[&rx, &px, message]);
    let e = scalar_reduce(&e_hash);
    let s = k + e * d;

    // intermediate scalars are dead from here on
    d = Scalar::ZERO;
    k = Scalar::ZERO;
    let _ = (d, k);

    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(&rx);
    signature[32..].copy_from_slice(&s.to_bytes());
    Ok(signature)
}

/// Sign with fresh auxiliary randomness from the OS RNG.
pub fn sign(private_key: &[u8; 32], message: &[u8; 32]) -> Result<[u8; 64], SignerError> {
    let mut aux_rand = [0u8; 32];
    OsRng.fill_bytes(&mut aux_rand);
    let result = sign_with_aux(private_key, message, &aux_rand);
    aux_rand.zeroize();
    result
}

/// Verify a BIP-340 signature against an x-only public key.
pub fn verify(public_key_x: &[u8; 32], message: &[u8; 32], signature: &[u8; 64]) -> bool {
    let p_point = match lift_x(public_key_x) {
        Some(point) => point,
        None => return false,
    };

    let mut rx = [0u8; 32];
    rx.copy_from_slice(&signature[..32]);
    // r must itself be a valid x coordinate
    if lift_x(&rx).is_none() {
        return false;
    }

    let mut s_bytes = [0u8; 32];
    s_bytes.copy_from_slice(&signature[32..]);
    let s = match scalar_from_canonical(&s_bytes) {
        Some(scalar) => scalar,
        None => return false,
    };

    let e_hash = tagged_hash(TAG_CHALLENGE, &[&rx, public_key_x, message]);
    let e = scalar_reduce(&e_hash);

    let r_point = ProjectivePoint::GENERATOR * s - ProjectivePoint::from(p_point) * e;
    if bool::from(r_point.is_identity()) {
        return false;
    }
    let r_affine = r_point.to_affine();
    let r_x: [u8; 32] = r_affine.x().into();
    !bool::from(r_affine.y_is_odd()) && r_x == rx
}
