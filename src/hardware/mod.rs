//! Hardware key provider capability
//!
//! Abstraction over whatever key-wrapping hardware the host platform offers:
//! a dedicated secure element, a trusted execution environment, or nothing
//! (software fallback). Providers wrap and unwrap small at-rest secrets such
//! as vault records; the wallet seed itself never goes through this layer.
//!
//! Wrapped records are versioned: `v1` is a plain wrap, `v2` additionally
//! requires a fresh user-presence confirmation at unwrap time.

use crate::core::errors::SignerError;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{info, warn};
use zeroize::Zeroizing;

const RECORD_V1: u8 = 0x01;
const RECORD_V2: u8 = 0x02;
const NONCE_LEN: usize = 12;

/// Provider strength, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityTier {
    StrongHardware,
    TrustedEnvironment,
    SoftwareFallback,
}

impl SecurityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityTier::StrongHardware => "strong_hardware",
            SecurityTier::TrustedEnvironment => "trusted_environment",
            SecurityTier::SoftwareFallback => "software_fallback",
        }
    }
}

/// A key-wrapping backend.
pub trait HardwareKeyProvider: Send + Sync {
    fn tier(&self) -> SecurityTier;

    /// Whether the backend can be used right now (hardware present, keys
    /// provisioned).
    fn is_available(&self) -> bool;

    /// Wrap a secret into a versioned record. `require_presence` produces a
    /// v2 record whose unwrap demands a user-presence confirmation.
    fn wrap(&self, secret: &[u8], require_presence: bool) -> Result<Vec<u8>, SignerError>;

    /// Unwrap a record produced by `wrap`. For v2 records,
    /// `presence_confirmed` must be true or the unwrap is refused.
    fn unwrap_record(
        &self,
        record: &[u8],
        presence_confirmed: bool,
    ) -> Result<Zeroizing<Vec<u8>>, SignerError>;
}

/// Pick the strongest available provider, recording the tier actually used.
pub fn negotiate<'a>(
    providers: &'a [Box<dyn HardwareKeyProvider>],
) -> Result<&'a dyn HardwareKeyProvider, SignerError> {
    let mut candidates: Vec<&dyn HardwareKeyProvider> =
        providers.iter().map(AsRef::as_ref).collect();
    candidates.sort_by_key(|p| p.tier());

    for provider in candidates {
        if provider.is_available() {
            info!("Negotiated key provider tier: {}", provider.tier().as_str());
            return Ok(provider);
        }
        warn!("Provider tier {} unavailable, trying next", provider.tier().as_str());
    }
    Err(SignerError::Hardware("No key provider available".to_string()))
}

/// Software fallback: AES-256-GCM under a process-local device key.
///
/// Present so the rest of the stack can run on hosts with no secure
/// hardware; offers no protection against an attacker who can read this
/// process's memory.
pub struct SoftwareKeyProvider {
    device_key: Zeroizing<[u8; 32]>,
}

impl SoftwareKeyProvider {
    pub fn new() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(key.as_mut());
        Self { device_key: key }
    }

    fn cipher(&self) -> Result<Aes256Gcm, SignerError> {
        Aes256Gcm::new_from_slice(self.device_key.as_ref())
            .map_err(|_| SignerError::Hardware("Bad device key".to_string()))
    }
}

impl Default for SoftwareKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareKeyProvider for SoftwareKeyProvider {
    fn tier(&self) -> SecurityTier {
        SecurityTier::SoftwareFallback
    }

    fn is_available(&self) -> bool {
        true
    }

    fn wrap(&self, secret: &[u8], require_presence: bool) -> Result<Vec<u8>, SignerError> {
        let cipher = self.cipher()?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, secret)
            .map_err(|_| SignerError::Hardware("Wrap failed".to_string()))?;

        let mut record = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        record.push(if require_presence { RECORD_V2 } else { RECORD_V1 });
        record.extend_from_slice(&nonce_bytes);
        record.extend_from_slice(&ciphertext);
        Ok(record)
    }

    fn unwrap_record(
        &self,
        record: &[u8],
        presence_confirmed: bool,
    ) -> Result<Zeroizing<Vec<u8>>, SignerError> {
        if record.len() < 1 + NONCE_LEN {
            return Err(SignerError::Hardware("Record too short".to_string()));
        }
        match record[0] {
            RECORD_V1 => {}
            RECORD_V2 => {
                if !presence_confirmed {
                    return Err(SignerError::Hardware(
                        "Record requires user presence confirmation".to_string(),
                    ));
                }
            }
            other => {
                return Err(SignerError::Hardware(format!("Unknown record version: {}", other)));
            }
        }

        let cipher = self.cipher()?;
        let nonce = GenericArray::from_slice(&record[1..1 + NONCE_LEN]);
        let plaintext = cipher
            .decrypt(nonce, &record[1 + NONCE_LEN..])
            .map_err(|_| SignerError::Hardware("Unwrap failed".to_string()))?;
        Ok(Zeroizing::new(plaintext))
    }
}
