//! Signing orchestrator
//!
//! Composes the vault cipher, HD derivation, signature engines, risk
//! classifier and session cache into the operations the bridge exposes.
//! Every call follows the same order: validate inputs, classify the payload
//! (abort on a warning), resolve the vault key, decrypt the seed, derive,
//! sign, wipe, respond. Nothing here does I/O; once key material is in
//! memory a call runs to completion.

use crate::core::config::SignerConfig;
use crate::core::errors::SignerError;
use crate::core::network::NetworkId;
use crate::crypto::vault::{self, EncryptedVault, Seed};
use crate::crypto::{ecdsa, schnorr, DerivationPath, HdKey};
use crate::risk::{self, TransactionRisk};
use crate::session::SessionManager;
use secp256k1::PublicKey;
use serde::Serialize;
use sha3::{Digest, Keccak256};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Taproot purpose field; BIP-86 paths select Schnorr on Bitcoin networks.
const PURPOSE_TAPROOT: u32 = 86;

/// Where the vault key for one call comes from.
pub enum KeySource {
    /// One-shot credential; the key is derived, used, and dropped.
    Credential(Zeroizing<String>),
    /// The cached session key from a prior `unlock`.
    Session,
}

/// One signature with the key it verifies against.
#[derive(Debug, Clone, Serialize)]
pub struct SignatureBundle {
    /// Hex signature: 128 chars (compact/Schnorr) or 130 chars (r||s||v).
    pub signature: String,
    /// Hex public key: compressed (66 chars) or x-only for Schnorr (64).
    pub public_key: String,
    /// Normalized recovery id (0/1) for networks that use one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rec_id: Option<u8>,
}

/// Per-chain public keys for the default paths, plus the EVM address.
#[derive(Debug, Clone, Serialize)]
pub struct WalletInfo {
    pub bitcoin_public_key: String,
    pub taproot_public_key: String,
    pub stacks_public_key: String,
    pub evm_public_key: String,
    pub liquid_public_key: String,
    pub evm_address: String,
}

/// Child private key escape hatch. Handle with care: the caller owns
/// wiping its copy once the hex leaves this struct.
pub struct DerivedSecret {
    pub private_key: Zeroizing<String>,
    pub public_key: String,
}

/// Observable operation counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SignerStats {
    pub vault_decrypts: u64,
}

pub struct SigningOrchestrator {
    config: SignerConfig,
    session: SessionManager,
    vault_decrypts: AtomicU64,
}

impl SigningOrchestrator {
    pub fn new(config: SignerConfig) -> Self {
        let session = SessionManager::new(&config);
        Self { config, session, vault_decrypts: AtomicU64::new(0) }
    }

    /// Verify the credential and open a session window.
    pub fn unlock(&self, vault: &EncryptedVault, credential: &str) -> Result<(), SignerError> {
        self.session.unlock(vault, credential)?;
        // the unlock probe decrypts the vault once
        self.vault_decrypts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn clear_session(&self) {
        self.session.clear();
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    pub fn stats(&self) -> SignerStats {
        SignerStats { vault_decrypts: self.vault_decrypts.load(Ordering::Relaxed) }
    }

    /// Classify a payload and return the digest that binds the result to it.
    pub fn classify(
        &self,
        payload: Option<&str>,
        network: NetworkId,
    ) -> (TransactionRisk, String) {
        (risk::classify(payload, network), risk::risk_id(payload, network))
    }

    /// Derive and return the public key for a path (default path when none
    /// given). BIP-86 paths on Bitcoin-family networks yield x-only keys.
    pub fn derive_public_key(
        &self,
        vault: &EncryptedVault,
        source: KeySource,
        path: Option<&str>,
        network: NetworkId,
    ) -> Result<String, SignerError> {
        let path = DerivationPath::parse(path.unwrap_or_else(|| network.default_path()))?;
        self.with_seed(vault, source, |seed| {
            let mut node = HdKey::master_from_seed(seed)?.derive_path(&path)?;
            let hex = if is_taproot(&path, network) {
                hex::encode(node.x_only_public_key())
            } else {
                node.public_key_hex()
            };
            node.wipe();
            Ok(hex)
        })
    }

    /// Sign one message hash.
    ///
    /// The payload is classified first and a `warning` refuses the call
    /// outright; `confirmed_risk_id`, when present, must match the digest
    /// recomputed over the same payload, proving the approval referred to
    /// these exact bytes. Neither check can be skipped by the caller.
    pub fn sign(
        &self,
        vault: &EncryptedVault,
        source: KeySource,
        path: Option<&str>,
        message_hash: &str,
        payload: Option<&str>,
        network: NetworkId,
        confirmed_risk_id: Option<&str>,
    ) -> Result<SignatureBundle, SignerError> {
        let hash = ecdsa::parse_message_hash(message_hash)?;
        let path = DerivationPath::parse(path.unwrap_or_else(|| network.default_path()))?;
        self.gate_on_risk(payload, network, confirmed_risk_id)?;

        self.with_seed(vault, source, |seed| {
            let mut node = HdKey::master_from_seed(seed)?.derive_path(&path)?;
            let bundle = sign_with_node(&node, &hash, &path, network);
            node.wipe();
            bundle
        })
    }

    /// Sign a batch of message hashes with one decrypt and one HD walk.
    ///
    /// All hashes are validated before the vault is opened; one bad hash
    /// fails the whole batch without touching key material.
    pub fn sign_batch(
        &self,
        vault: &EncryptedVault,
        source: KeySource,
        path: Option<&str>,
        message_hashes: &[String],
        payload: Option<&str>,
        network: NetworkId,
        confirmed_risk_id: Option<&str>,
    ) -> Result<Vec<SignatureBundle>, SignerError> {
        if message_hashes.is_empty() {
            return Err(SignerError::InvalidInput("Empty batch".to_string()));
        }
        let hashes = message_hashes
            .iter()
            .map(|h| ecdsa::parse_message_hash(h))
            .collect::<Result<Vec<_>, _>>()?;
        let path = DerivationPath::parse(path.unwrap_or_else(|| network.default_path()))?;
        self.gate_on_risk(payload, network, confirmed_risk_id)?;

        debug!("Signing batch of {} hashes", hashes.len());
        self.with_seed(vault, source, |seed| {
            let mut node = HdKey::master_from_seed(seed)?.derive_path(&path)?;
            let mut bundles = Vec::with_capacity(hashes.len());
            for hash in &hashes {
                match sign_with_node(&node, hash, &path, network) {
                    Ok(bundle) => bundles.push(bundle),
                    Err(e) => {
                        node.wipe();
                        return Err(e);
                    }
                }
            }
            node.wipe();
            Ok(bundles)
        })
    }

    /// Public keys for every supported chain's default path, plus the EVM
    /// address, from a single decrypt.
    pub fn wallet_info(
        &self,
        vault: &EncryptedVault,
        source: KeySource,
    ) -> Result<WalletInfo, SignerError> {
        self.with_seed(vault, source, |seed| {
            let master = HdKey::master_from_seed(seed)?;
            let mut derive = |path: &str| -> Result<HdKey, SignerError> {
                master.derive_path(&DerivationPath::parse(path)?)
            };

            let bitcoin = derive(NetworkId::Bitcoin.default_path())?;
            let taproot = derive(NetworkId::taproot_path())?;
            let stacks = derive(NetworkId::Stacks.default_path())?;
            let evm = derive(NetworkId::Evm.default_path())?;
            let liquid = derive(NetworkId::Liquid.default_path())?;

            let info = WalletInfo {
                bitcoin_public_key: bitcoin.public_key_hex(),
                taproot_public_key: hex::encode(taproot.x_only_public_key()),
                stacks_public_key: stacks.public_key_hex(),
                evm_public_key: evm.public_key_hex(),
                liquid_public_key: liquid.public_key_hex(),
                evm_address: evm_address(evm.public_key())?,
            };

            for mut node in [bitcoin, taproot, stacks, evm, liquid] {
                node.wipe();
            }
            Ok(info)
        })
    }

    /// Export a child private key.
    ///
    /// Security-sensitive by construction: this hands raw key material to
    /// the caller. Only exposed for interoperability flows that genuinely
    /// need the scalar (e.g. importing an account elsewhere).
    pub fn derived_secret(
        &self,
        vault: &EncryptedVault,
        source: KeySource,
        path: &str,
        _network: NetworkId,
    ) -> Result<DerivedSecret, SignerError> {
        let path = DerivationPath::parse(path)?;
        info!("Derived-secret export requested");
        self.with_seed(vault, source, |seed| {
            let mut node = HdKey::master_from_seed(seed)?.derive_path(&path)?;
            let secret = DerivedSecret {
                private_key: Zeroizing::new(hex::encode(node.private_key_bytes()?.as_slice())),
                public_key: node.public_key_hex(),
            };
            node.wipe();
            Ok(secret)
        })
    }

    /// Risk gate shared by `sign` and `sign_batch`. Runs before any key
    /// material is resolved.
    fn gate_on_risk(
        &self,
        payload: Option<&str>,
        network: NetworkId,
        confirmed_risk_id: Option<&str>,
    ) -> Result<(), SignerError> {
        let risk = risk::classify(payload, network);
        if risk.warning {
            info!("Refusing to sign: risk classifier warning");
            return Err(SignerError::TransactionRiskRejected(risk.warning_message));
        }
        if let Some(confirmed) = confirmed_risk_id {
            if confirmed != risk::risk_id(payload, network) {
                return Err(SignerError::InvalidInput(
                    "Risk confirmation does not match the payload being signed".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve the vault key, decrypt the seed, run `f`, wipe the seed.
    fn with_seed<T>(
        &self,
        vault: &EncryptedVault,
        source: KeySource,
        f: impl FnOnce(&Seed) -> Result<T, SignerError>,
    ) -> Result<T, SignerError> {
        vault.check_version()?;
        let key = match source {
            KeySource::Credential(credential) => {
                vault::derive_key(&credential, &vault.salt, self.config.pbkdf2_iterations)?
            }
            KeySource::Session => self.session.active_key(vault)?,
        };
        let seed = vault::decrypt(vault, &key)?;
        self.vault_decrypts.fetch_add(1, Ordering::Relaxed);
        // key and seed are Zeroizing; both wipe on every exit path
        f(&seed)
    }
}

fn is_taproot(path: &DerivationPath, network: NetworkId) -> bool {
    path.purpose() == Some(PURPOSE_TAPROOT) && network.is_bitcoin_family()
}

/// Sign one hash with an already-derived node, picking the scheme from the
/// path purpose and network.
fn sign_with_node(
    node: &HdKey,
    hash: &[u8; 32],
    path: &DerivationPath,
    network: NetworkId,
) -> Result<SignatureBundle, SignerError> {
    if is_taproot(path, network) {
        let signature = schnorr::sign(node.private_key_bytes()?, hash)?;
        return Ok(SignatureBundle {
            signature: hex::encode(signature),
            public_key: hex::encode(node.x_only_public_key()),
            rec_id: None,
        });
    }

    let signature = ecdsa::sign_recoverable(node, hash)?;
    let (bytes, rec_id) = ecdsa::encode_signature(network, &signature);
    Ok(SignatureBundle {
        signature: hex::encode(bytes),
        public_key: node.public_key_hex(),
        rec_id,
    })
}

/// EVM address: Keccak-256 of the uncompressed public key (without the 0x04
/// prefix byte), last 20 bytes, 0x-prefixed.
fn evm_address(compressed_public_key: &[u8; 33]) -> Result<String, SignerError> {
    let public = PublicKey::from_slice(compressed_public_key)
        .map_err(|_| SignerError::Crypto("Corrupt public key".to_string()))?;
    let uncompressed = public.serialize_uncompressed();
    let digest = Keccak256::digest(&uncompressed[1..]);
    Ok(format!("0x{}", hex::encode(&digest[12..])))
}
