//! # signing-enclave
//!
//! Signing core for a multi-chain self-custody wallet. The crate owns the
//! secret-touching half of the wallet: the encrypted seed vault, BIP32
//! derivation, ECDSA and BIP-340 Schnorr signing with per-network encoding,
//! a bounded session cache, and a transaction-risk gate in front of every
//! signature. Everything is synchronous and I/O-free; hosts embed it behind
//! the typed `api` boundary.
//!
//! ## Modules
//!
//! - [`core`] - errors, configuration, supported-network table
//! - [`crypto`] - vault cipher, HD derivation, signature engines, mnemonic
//! - [`session`] - bounded in-memory session cache
//! - [`risk`] - transaction risk classifier
//! - [`service`] - signing orchestrator composing the above
//! - [`api`] - typed request/response bridge boundary
//! - [`hardware`] - key-wrapping provider capability

pub mod api;
pub mod core;
pub mod crypto;
pub mod hardware;
pub mod risk;
pub mod service;
pub mod session;

pub use crate::core::config::SignerConfig;
pub use crate::core::errors::SignerError;
pub use crate::core::network::NetworkId;
pub use crate::crypto::vault::EncryptedVault;
pub use crate::service::{KeySource, SigningOrchestrator};
