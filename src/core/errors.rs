//! Crate-wide error type
//!
//! Every fallible operation in the signing core returns `SignerError`. The
//! bridge layer maps each variant to a stable string code so callers can
//! branch without parsing messages.

use thiserror::Error;

/// Signing core error type
#[derive(Debug, Error)]
pub enum SignerError {
    /// Missing or malformed request fields, rejected before touching secrets
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrong credential or tampered vault. Deliberately carries no detail so
    /// the response cannot be used as a decryption oracle.
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// Session window elapsed, caller should prompt for the credential again
    #[error("Session expired or invalid. Unlock required.")]
    SessionExpired,

    /// Cached session key belongs to a different vault (salt mismatch)
    #[error("Session valid but wallet mismatch. Unlock required.")]
    WalletMismatch,

    /// Malformed derivation path segment
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    /// Network identifier not in the supported set
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Risk classifier flagged the payload. Hard stop, never bypassable.
    #[error("{0}")]
    TransactionRiskRejected(String),

    /// Message hash is not 32 bytes of valid hex
    #[error("Invalid message hash: {0}")]
    InvalidMessageHash(String),

    /// BIP-340 nonce reduced to zero; safe to retry with fresh aux randomness
    #[error("Schnorr nonce is zero")]
    SchnorrNonceIsZero,

    /// Hardened child derivation attempted on a public-only parent
    #[error("Hardened derivation requires the parent private key")]
    HardenedDerivationRequiresPrivateKey,

    /// Degenerate cryptographic case, fatal for this call only
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Hardware key provider failure
    #[error("Hardware provider error: {0}")]
    Hardware(String),
}

impl SignerError {
    /// Stable error code for the caller/bridge boundary.
    pub fn code(&self) -> &'static str {
        match self {
            SignerError::InvalidInput(_) => "invalid_input",
            SignerError::AuthenticationFailure => "auth_failed",
            SignerError::SessionExpired => "session_expired",
            SignerError::WalletMismatch => "wallet_mismatch",
            SignerError::InvalidPath(_) => "invalid_path",
            SignerError::UnsupportedNetwork(_) => "unsupported_network",
            SignerError::TransactionRiskRejected(_) => "risk_rejected",
            SignerError::InvalidMessageHash(_) => "invalid_message_hash",
            SignerError::SchnorrNonceIsZero => "schnorr_nonce_zero",
            SignerError::HardenedDerivationRequiresPrivateKey => "hardened_requires_private",
            SignerError::Crypto(_) => "crypto_error",
            SignerError::Hardware(_) => "hardware_error",
        }
    }

    /// True when the caller may retry the same call with fresh randomness.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SignerError::SchnorrNonceIsZero)
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(err: serde_json::Error) -> Self {
        SignerError::InvalidInput(err.to_string())
    }
}
