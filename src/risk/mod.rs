//! Transaction risk classifier
//!
//! Pure, synchronous inspection of the payload the caller intends to sign.
//! The classifier extracts a human-auditable summary (action, amount,
//! recipient) and flags payloads that must never be signed. A `warning` here
//! is a hard gate: the orchestrator refuses to sign regardless of any caller
//! confirmation.

use crate::core::network::NetworkId;
use bitcoin::consensus::encode::deserialize;
use bitcoin::{Address, Network, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Stacks post-condition-mode byte value for ALLOW.
const STACKS_PC_MODE_ALLOW: u8 = 0x02;

const STACKS_ALLOW_MESSAGE: &str =
    "REJECTED: Stacks PostConditionMode.ALLOW is not permitted for security reasons.";

/// Caller-facing classification of a transaction payload.
///
/// Unknown payloads classify as `Unknown`/`Unknown` with `warning = false`;
/// the uncertainty is surfaced to the caller rather than guessed away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRisk {
    pub action: String,
    pub amount: String,
    pub recipient: String,
    pub warning: bool,
    pub warning_message: String,
}

impl TransactionRisk {
    fn unknown() -> Self {
        Self {
            action: "Unknown".to_string(),
            amount: "Unknown".to_string(),
            recipient: "Unknown".to_string(),
            warning: false,
            warning_message: String::new(),
        }
    }
}

/// Classify a payload for the given network. Pure; never touches secrets.
pub fn classify(payload: Option<&str>, network: NetworkId) -> TransactionRisk {
    let payload = match payload {
        Some(p) if !p.trim().is_empty() => p.trim(),
        _ => return TransactionRisk::unknown(),
    };

    if let Some(bytes) = decode_hex_payload(payload) {
        match network {
            NetworkId::Stacks => return classify_stacks(&bytes),
            NetworkId::Bitcoin => return classify_bitcoin(&bytes, Network::Bitcoin),
            NetworkId::BitcoinTestnet => return classify_bitcoin(&bytes, Network::Testnet),
            // Liquid raw transactions are not parseable with mainnet
            // consensus rules; fall through to the JSON/unknown path.
            NetworkId::Evm | NetworkId::Liquid => {}
        }
    }

    classify_json(payload, network)
}

/// Stable digest binding a classification to the exact payload it inspected.
///
/// Truncated SHA-256 over a presence byte, the length-prefixed payload and
/// the network name, so `None`, the empty payload, and any concatenation
/// trick all hash distinctly. The signing path recomputes it to verify a
/// confirmation refers to the same bytes.
pub fn risk_id(payload: Option<&str>, network: NetworkId) -> String {
    let mut hasher = Sha256::new();
    match payload {
        Some(p) => {
            hasher.update([0x01]);
            hasher.update((p.len() as u64).to_be_bytes());
            hasher.update(p.as_bytes());
        }
        None => hasher.update([0x00]),
    }
    hasher.update(network.to_string().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

fn decode_hex_payload(payload: &str) -> Option<Vec<u8>> {
    let stripped = payload.strip_prefix("0x").unwrap_or(payload);
    if stripped.is_empty() || stripped.len() % 2 != 0 {
        return None;
    }
    hex::decode(stripped).ok()
}

/// Byte offset 1 of a serialized Stacks transaction is the
/// post-condition-mode field. ALLOW (0x02) lets a contract move arbitrary
/// assets, so it is always rejected.
fn classify_stacks(bytes: &[u8]) -> TransactionRisk {
    let mut risk = TransactionRisk::unknown();
    risk.action = "Stacks Transaction".to_string();

    if bytes.len() >= 2 && bytes[1] == STACKS_PC_MODE_ALLOW {
        warn!("Stacks payload uses PostConditionMode.ALLOW, flagging");
        risk.warning = true;
        risk.warning_message = STACKS_ALLOW_MESSAGE.to_string();
    }
    risk
}

fn classify_bitcoin(bytes: &[u8], network: Network) -> TransactionRisk {
    let tx: Transaction = match deserialize(bytes) {
        Ok(tx) => tx,
        Err(_) => return TransactionRisk::unknown(),
    };

    let total: f64 = tx.output.iter().map(|out| out.value.to_btc()).sum();
    let recipients: Vec<String> = tx
        .output
        .iter()
        .filter_map(|out| Address::from_script(&out.script_pubkey, network).ok())
        .map(|addr| addr.to_string())
        .collect();

    TransactionRisk {
        action: "Transfer".to_string(),
        amount: format!("{:.8} BTC", total),
        recipient: if recipients.is_empty() {
            "Unknown".to_string()
        } else {
            recipients.join(", ")
        },
        warning: false,
        warning_message: String::new(),
    }
}

fn classify_json(payload: &str, network: NetworkId) -> TransactionRisk {
    let value: Value = match serde_json::from_str(payload) {
        Ok(Value::Object(map)) => Value::Object(map),
        _ => return TransactionRisk::unknown(),
    };

    let (recipient_field, amount_field) = match network {
        NetworkId::Evm => ("to", "value"),
        _ => ("recipient", "amount"),
    };

    let action = value
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or("Transfer")
        .to_string();

    let mut risk = TransactionRisk {
        action,
        amount: field_as_string(&value, amount_field),
        recipient: field_as_string(&value, recipient_field),
        warning: false,
        warning_message: String::new(),
    };

    // structured Stacks payloads carry the mode as a field, not a byte
    if network == NetworkId::Stacks && post_condition_mode_is_allow(&value) {
        warn!("Stacks JSON payload uses PostConditionMode.ALLOW, flagging");
        risk.warning = true;
        risk.warning_message = STACKS_ALLOW_MESSAGE.to_string();
    }
    risk
}

fn post_condition_mode_is_allow(value: &Value) -> bool {
    match value.get("postConditionMode") {
        Some(Value::Number(n)) => n.as_u64() == Some(STACKS_PC_MODE_ALLOW as u64),
        Some(Value::String(s)) => s.trim().parse::<u8>().ok() == Some(STACKS_PC_MODE_ALLOW),
        _ => false,
    }
}

fn field_as_string(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_unknown() {
        for payload in [None, Some(""), Some("   ")] {
            let risk = classify(payload, NetworkId::Evm);
            assert_eq!(risk.action, "Unknown");
            assert_eq!(risk.amount, "Unknown");
            assert_eq!(risk.recipient, "Unknown");
            assert!(!risk.warning);
        }
    }

    #[test]
    fn test_stacks_allow_mode_always_warns() {
        // byte 1 = 0x02 is PostConditionMode.ALLOW
        let risk = classify(Some("0x0002aabbccdd"), NetworkId::Stacks);
        assert!(risk.warning);
        assert_eq!(
            risk.warning_message,
            "REJECTED: Stacks PostConditionMode.ALLOW is not permitted for security reasons."
        );

        // without the 0x prefix too
        let risk = classify(Some("0002aabbccdd"), NetworkId::Stacks);
        assert!(risk.warning);
    }

    #[test]
    fn test_stacks_json_allow_mode_always_warns() {
        // mode as a JSON field, integer and numeric-string forms
        for payload in [
            r#"{"recipient":"SP000","amount":"5","postConditionMode":2}"#,
            r#"{"recipient":"SP000","amount":"5","postConditionMode":"2"}"#,
        ] {
            let risk = classify(Some(payload), NetworkId::Stacks);
            assert!(risk.warning, "payload {:?} must warn", payload);
            assert_eq!(
                risk.warning_message,
                "REJECTED: Stacks PostConditionMode.ALLOW is not permitted for security reasons."
            );
            // the summary fields are still extracted
            assert_eq!(risk.recipient, "SP000");
        }
    }

    #[test]
    fn test_stacks_json_deny_mode_passes() {
        let risk = classify(
            Some(r#"{"recipient":"SP000","amount":"5","postConditionMode":1}"#),
            NetworkId::Stacks,
        );
        assert!(!risk.warning);

        // the field only means something on Stacks
        let risk = classify(Some(r#"{"to":"0xabc","postConditionMode":2}"#), NetworkId::Evm);
        assert!(!risk.warning);
    }

    #[test]
    fn test_stacks_deny_mode_passes() {
        let risk = classify(Some("0x0001aabbccdd"), NetworkId::Stacks);
        assert!(!risk.warning);
        assert_eq!(risk.action, "Stacks Transaction");
    }

    #[test]
    fn test_evm_json_fields() {
        let payload = r#"{"to":"0xabc0000000000000000000000000000000000def","value":"1.5 ETH"}"#;
        let risk = classify(Some(payload), NetworkId::Evm);
        assert_eq!(risk.recipient, "0xabc0000000000000000000000000000000000def");
        assert_eq!(risk.amount, "1.5 ETH");
        assert_eq!(risk.action, "Transfer");
        assert!(!risk.warning);
    }

    #[test]
    fn test_generic_json_fields() {
        let payload = r#"{"action":"Contract Call","recipient":"SP000","amount":100}"#;
        let risk = classify(Some(payload), NetworkId::Stacks);
        assert_eq!(risk.action, "Contract Call");
        assert_eq!(risk.recipient, "SP000");
        assert_eq!(risk.amount, "100");
    }

    #[test]
    fn test_bitcoin_raw_transaction() {
        use bitcoin::absolute::LockTime;
        use bitcoin::transaction::Version;
        use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Witness};

        let pubkey = bitcoin::PublicKey::from_slice(
            &hex::decode("0339a36013301597daef41fbe593a02cc513d0b55527ec2df1050e2e8ff49c85c2")
                .unwrap(),
        )
        .unwrap();
        let address = Address::p2wpkh(&pubkey, Network::Bitcoin).unwrap();

        let tx = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(150_000_000),
                script_pubkey: address.script_pubkey(),
            }],
        };
        let raw = hex::encode(bitcoin::consensus::encode::serialize(&tx));

        let risk = classify(Some(&raw), NetworkId::Bitcoin);
        assert_eq!(risk.action, "Transfer");
        assert_eq!(risk.amount, "1.50000000 BTC");
        assert_eq!(risk.recipient, address.to_string());
        assert!(!risk.warning);
    }

    #[test]
    fn test_garbage_hex_is_unknown_not_error() {
        let risk = classify(Some("0xdeadbeef"), NetworkId::Bitcoin);
        assert_eq!(risk.amount, "Unknown");
        assert!(!risk.warning);
    }

    #[test]
    fn test_risk_id_binds_payload_and_network() {
        let a = risk_id(Some("{\"to\":\"0xabc\"}"), NetworkId::Evm);
        let b = risk_id(Some("{\"to\":\"0xabc\"}"), NetworkId::Evm);
        let c = risk_id(Some("{\"to\":\"0xdef\"}"), NetworkId::Evm);
        let d = risk_id(Some("{\"to\":\"0xabc\"}"), NetworkId::Stacks);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_risk_id_distinguishes_absent_and_empty_payload() {
        let absent = risk_id(None, NetworkId::Evm);
        let empty = risk_id(Some(""), NetworkId::Evm);
        assert_ne!(absent, empty);
    }
}
