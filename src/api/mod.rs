//! Typed bridge boundary
//!
//! One strongly-typed request variant per operation, tagged by `operation`
//! in the JSON wire form. Requests are fully deserialized and validated
//! before any cryptographic code runs; errors surface as
//! `{"error": {"code", "message"}}` with the stable codes from
//! `SignerError::code`, never raw key material.

use crate::core::errors::SignerError;
use crate::core::network::NetworkId;
use crate::crypto::vault::EncryptedVault;
use crate::risk::TransactionRisk;
use crate::service::{KeySource, SignatureBundle, SigningOrchestrator, WalletInfo};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum SignerRequest {
    Unlock {
        vault: EncryptedVault,
        credential: String,
    },
    ClearSession,
    GetPublicKey {
        vault: EncryptedVault,
        credential: Option<String>,
        path: Option<String>,
        network: String,
    },
    Sign {
        vault: EncryptedVault,
        credential: Option<String>,
        path: Option<String>,
        message_hash: String,
        payload: Option<String>,
        network: String,
        confirmed_risk_id: Option<String>,
    },
    SignBatch {
        vault: EncryptedVault,
        credential: Option<String>,
        path: Option<String>,
        hashes: Vec<String>,
        payload: Option<String>,
        network: String,
        confirmed_risk_id: Option<String>,
    },
    Classify {
        payload: Option<String>,
        network: String,
    },
    GetWalletInfo {
        vault: EncryptedVault,
        credential: Option<String>,
    },
    GetDerivedSecret {
        vault: EncryptedVault,
        credential: Option<String>,
        path: String,
        network: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SignerResponse {
    Unlocked { unlocked: bool },
    Cleared { cleared: bool },
    PublicKey { public_key: String },
    Signature(SignatureBundle),
    Signatures { signatures: Vec<SignatureBundle> },
    Risk { risk: TransactionRisk, risk_id: String },
    Wallet(WalletInfo),
    Secret { private_key: String, public_key: String },
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Missing credential means "use the cached session".
fn key_source(credential: Option<String>) -> KeySource {
    match credential {
        Some(c) => KeySource::Credential(Zeroizing::new(c)),
        None => KeySource::Session,
    }
}

/// Execute one typed request against the orchestrator.
pub fn dispatch(
    orchestrator: &SigningOrchestrator,
    request: SignerRequest,
) -> Result<SignerResponse, SignerError> {
    match request {
        SignerRequest::Unlock { vault, credential } => {
            let credential = Zeroizing::new(credential);
            orchestrator.unlock(&vault, &credential)?;
            Ok(SignerResponse::Unlocked { unlocked: true })
        }
        SignerRequest::ClearSession => {
            orchestrator.clear_session();
            Ok(SignerResponse::Cleared { cleared: true })
        }
        SignerRequest::GetPublicKey { vault, credential, path, network } => {
            let network: NetworkId = network.parse()?;
            let public_key = orchestrator.derive_public_key(
                &vault,
                key_source(credential),
                path.as_deref(),
                network,
            )?;
            Ok(SignerResponse::PublicKey { public_key })
        }
        SignerRequest::Sign {
            vault,
            credential,
            path,
            message_hash,
            payload,
            network,
            confirmed_risk_id,
        } => {
            let network: NetworkId = network.parse()?;
            let bundle = orchestrator.sign(
                &vault,
                key_source(credential),
                path.as_deref(),
                &message_hash,
                payload.as_deref(),
                network,
                confirmed_risk_id.as_deref(),
            )?;
            Ok(SignerResponse::Signature(bundle))
        }
        SignerRequest::SignBatch {
            vault,
            credential,
            path,
            hashes,
            payload,
            network,
            confirmed_risk_id,
        } => {
            let network: NetworkId = network.parse()?;
            let signatures = orchestrator.sign_batch(
                &vault,
                key_source(credential),
                path.as_deref(),
                &hashes,
                payload.as_deref(),
                network,
                confirmed_risk_id.as_deref(),
            )?;
            Ok(SignerResponse::Signatures { signatures })
        }
        SignerRequest::Classify { payload, network } => {
            let network: NetworkId = network.parse()?;
            let (risk, risk_id) = orchestrator.classify(payload.as_deref(), network);
            Ok(SignerResponse::Risk { risk, risk_id })
        }
        SignerRequest::GetWalletInfo { vault, credential } => {
            let info = orchestrator.wallet_info(&vault, key_source(credential))?;
            Ok(SignerResponse::Wallet(info))
        }
        SignerRequest::GetDerivedSecret { vault, credential, path, network } => {
            let network: NetworkId = network.parse()?;
            let secret = orchestrator.derived_secret(
                &vault,
                key_source(credential),
                &path,
                network,
            )?;
            Ok(SignerResponse::Secret {
                private_key: secret.private_key.to_string(),
                public_key: secret.public_key,
            })
        }
    }
}

/// JSON-in, JSON-out entry point for host bridges.
pub fn handle_json(orchestrator: &SigningOrchestrator, request_json: &str) -> String {
    let result = serde_json::from_str::<SignerRequest>(request_json)
        .map_err(SignerError::from)
        .and_then(|request| {
            debug!("Dispatching bridge request");
            dispatch(orchestrator, request)
        });

    match result {
        Ok(response) => serde_json::to_string(&response).unwrap_or_else(|e| {
            error_json(&SignerError::Crypto(format!("Response serialization failed: {}", e)))
        }),
        Err(e) => error_json(&e),
    }
}

fn error_json(error: &SignerError) -> String {
    let body = ErrorBody {
        error: ErrorDetail { code: error.code(), message: error.to_string() },
    };
    serde_json::to_string(&body)
        .unwrap_or_else(|_| r#"{"error":{"code":"crypto_error","message":"internal"}}"#.to_string())
}
