//! Vault cipher: password-based key derivation and seed envelope AEAD
//!
//! The encrypted vault is a versioned JSON envelope
//! `{ "v": 1, "salt": [...], "iv": [...], "data": [...] }` produced by
//! PBKDF2-HMAC-SHA256 key derivation followed by AES-256-GCM. Version 1 is
//! the only recognized format; anything else fails closed before any key
//! material is touched.

use crate::core::errors::SignerError;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

/// Supported envelope version.
pub const VAULT_VERSION: u32 = 1;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Per-vault salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Symmetric key derived from the user credential. Zeroed on drop.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Raw wallet seed recovered from the vault. Zeroed on drop.
pub type Seed = Zeroizing<Vec<u8>>;

/// Versioned seed envelope as stored/transported by the caller.
///
/// `salt` and `iv` are per-vault; the nonce is sampled internally on every
/// `encrypt` call, so a nonce can never repeat under the same derived key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedVault {
    #[serde(rename = "v")]
    pub version: u32,
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    pub data: Vec<u8>,
}

impl EncryptedVault {
    /// Parse a vault from its JSON wire form, failing closed on unknown
    /// versions or missing fields.
    pub fn from_json(json: &str) -> Result<Self, SignerError> {
        let vault: EncryptedVault = serde_json::from_str(json)
            .map_err(|e| SignerError::InvalidInput(format!("Malformed vault envelope: {}", e)))?;
        vault.check_version()?;
        Ok(vault)
    }

    pub fn to_json(&self) -> Result<String, SignerError> {
        serde_json::to_string(self)
            .map_err(|e| SignerError::InvalidInput(format!("Vault serialization failed: {}", e)))
    }

    pub fn check_version(&self) -> Result<(), SignerError> {
        if self.version != VAULT_VERSION {
            return Err(SignerError::InvalidInput(format!(
                "Unknown vault version: {}",
                self.version
            )));
        }
        Ok(())
    }
}

/// Derive the vault key from a credential and salt via PBKDF2-HMAC-SHA256.
///
/// The iteration count is the versioned constant from `SignerConfig`
/// (200,000 for v1); callers pass it through rather than choosing per call.
pub fn derive_key(credential: &str, salt: &[u8], iterations: u32) -> Result<DerivedKey, SignerError> {
    if salt.is_empty() {
        return Err(SignerError::InvalidInput("Vault salt is empty".to_string()));
    }
    debug!("Deriving vault key ({} PBKDF2 iterations)", iterations);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(credential.as_bytes(), salt, iterations, key.as_mut());
    Ok(key)
}

/// Authenticated decryption of the seed envelope.
///
/// Every failure mode (bad tag, wrong key, corrupted data, short iv) maps to
/// the same `AuthenticationFailure` so the response cannot leak which check
/// tripped.
pub fn decrypt(vault: &EncryptedVault, key: &DerivedKey) -> Result<Seed, SignerError> {
    vault.check_version().map_err(|_| SignerError::AuthenticationFailure)?;
    if vault.iv.len() != NONCE_LEN {
        return Err(SignerError::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|_| SignerError::AuthenticationFailure)?;
    let nonce = GenericArray::from_slice(&vault.iv);

    let plaintext = cipher
        .decrypt(nonce, vault.data.as_slice())
        .map_err(|_| SignerError::AuthenticationFailure)?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt a seed into a fresh v1 envelope.
///
/// The salt must be the per-vault salt the key was derived with. The nonce
/// is always sampled here; there is deliberately no way for a caller to
/// supply one.
pub fn encrypt(plaintext: &[u8], key: &DerivedKey, salt: &[u8]) -> Result<EncryptedVault, SignerError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|_| SignerError::Crypto("Invalid key length".to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = GenericArray::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| SignerError::Crypto("Vault encryption failed".to_string()))?;

    Ok(EncryptedVault {
        version: VAULT_VERSION,
        salt: salt.to_vec(),
        iv: nonce_bytes.to_vec(),
        data: ciphertext,
    })
}

/// Generate a fresh random per-vault salt.
pub fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Create a new vault from a seed and credential in one step.
pub fn seal(seed: &[u8], credential: &str, iterations: u32) -> Result<EncryptedVault, SignerError> {
    let salt = generate_salt();
    let key = derive_key(credential, &salt, iterations)?;
    encrypt(seed, &key, &salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ITERATIONS: u32 = 1_000; // keep unit tests fast

    fn test_vault(seed: &[u8], credential: &str) -> EncryptedVault {
        seal(seed, credential, TEST_ITERATIONS).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let seed = b"super secret wallet entropy bytes";
        let vault = test_vault(seed, "1234");
        let key = derive_key("1234", &vault.salt, TEST_ITERATIONS).unwrap();
        let recovered = decrypt(&vault, &key).unwrap();
        assert_eq!(recovered.as_slice(), seed);
    }

    #[test]
    fn test_wrong_credential_fails_as_auth() {
        let vault = test_vault(b"seed", "1234");
        let key = derive_key("4321", &vault.salt, TEST_ITERATIONS).unwrap();
        let err = decrypt(&vault, &key).unwrap_err();
        assert_eq!(err.code(), "auth_failed");
    }

    #[test]
    fn test_tampered_ciphertext_fails_as_auth() {
        let mut vault = test_vault(b"seed", "1234");
        let last = vault.data.len() - 1;
        vault.data[last] ^= 0x01;
        let key = derive_key("1234", &vault.salt, TEST_ITERATIONS).unwrap();
        let err = decrypt(&vault, &key).unwrap_err();
        assert_eq!(err.code(), "auth_failed");
    }

    #[test]
    fn test_unknown_version_fails_closed() {
        let mut vault = test_vault(b"seed", "1234");
        vault.version = 2;
        assert!(vault.check_version().is_err());
        let key = derive_key("1234", &vault.salt, TEST_ITERATIONS).unwrap();
        assert_eq!(decrypt(&vault, &key).unwrap_err().code(), "auth_failed");
    }

    #[test]
    fn test_nonce_is_fresh_per_encrypt() {
        let salt = generate_salt();
        let key = derive_key("1234", &salt, TEST_ITERATIONS).unwrap();
        let a = encrypt(b"seed", &key, &salt).unwrap();
        let b = encrypt(b"seed", &key, &salt).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_json_wire_format() {
        let vault = test_vault(&[7u8; 32], "pin");
        let json = vault.to_json().unwrap();
        let parsed = EncryptedVault::from_json(&json).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.salt, vault.salt);
        assert_eq!(parsed.iv, vault.iv);
        assert_eq!(parsed.data, vault.data);
        // wire field is "v"
        assert!(json.contains("\"v\":1"));
    }

    #[test]
    fn test_malformed_json_rejected_before_crypto() {
        let err = EncryptedVault::from_json("{not json").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        let err = EncryptedVault::from_json(r#"{"v":9,"salt":[],"iv":[],"data":[]}"#).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let salt = [9u8; SALT_LEN];
        let k1 = derive_key("pin", &salt, TEST_ITERATIONS).unwrap();
        let k2 = derive_key("pin", &salt, TEST_ITERATIONS).unwrap();
        assert_eq!(AsRef::<[u8]>::as_ref(&k1), AsRef::<[u8]>::as_ref(&k2));
        let k3 = derive_key("other", &salt, TEST_ITERATIONS).unwrap();
        assert_ne!(AsRef::<[u8]>::as_ref(&k1), AsRef::<[u8]>::as_ref(&k3));
    }
}
