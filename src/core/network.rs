//! Supported networks and their canonical derivation paths
//!
//! Each network maps to one default BIP32 path used by the wallet-info
//! bundle, and to a signature encoding rule applied by the engine.

use crate::core::errors::SignerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network identifier as understood by the signing core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Bitcoin,
    BitcoinTestnet,
    Evm,
    Stacks,
    Liquid,
}

impl NetworkId {
    /// Canonical default derivation path for the network.
    pub fn default_path(&self) -> &'static str {
        match self {
            NetworkId::Bitcoin | NetworkId::BitcoinTestnet => "m/84'/0'/0'/0/0",
            NetworkId::Evm => "m/44'/60'/0'/0/0",
            NetworkId::Stacks => "m/44'/5757'/0'/0/0",
            NetworkId::Liquid => "m/84'/1776'/0'/0/0",
        }
    }

    /// Default Taproot path (BIP-86), signed with BIP-340 Schnorr.
    pub fn taproot_path() -> &'static str {
        "m/86'/0'/0'/0/0"
    }

    /// Networks that attach a recovery id to ECDSA signatures.
    pub fn uses_recovery_id(&self) -> bool {
        matches!(self, NetworkId::Evm | NetworkId::Stacks)
    }

    /// Bitcoin-family networks, where BIP-86 paths select Schnorr signing.
    pub fn is_bitcoin_family(&self) -> bool {
        matches!(self, NetworkId::Bitcoin | NetworkId::BitcoinTestnet | NetworkId::Liquid)
    }
}

impl FromStr for NetworkId {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "bitcoin" => Ok(NetworkId::Bitcoin),
            "testnet" => Ok(NetworkId::BitcoinTestnet),
            "ethereum" | "evm" | "rsk" => Ok(NetworkId::Evm),
            "stacks" => Ok(NetworkId::Stacks),
            "liquid" => Ok(NetworkId::Liquid),
            other => Err(SignerError::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkId::Bitcoin => "mainnet",
            NetworkId::BitcoinTestnet => "testnet",
            NetworkId::Evm => "evm",
            NetworkId::Stacks => "stacks",
            NetworkId::Liquid => "liquid",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("mainnet".parse::<NetworkId>().unwrap(), NetworkId::Bitcoin);
        assert_eq!("bitcoin".parse::<NetworkId>().unwrap(), NetworkId::Bitcoin);
        assert_eq!("rsk".parse::<NetworkId>().unwrap(), NetworkId::Evm);
        assert_eq!("ethereum".parse::<NetworkId>().unwrap(), NetworkId::Evm);
        assert_eq!("stacks".parse::<NetworkId>().unwrap(), NetworkId::Stacks);
    }

    #[test]
    fn test_unknown_network_rejected() {
        let err = "dogecoin".parse::<NetworkId>().unwrap_err();
        assert_eq!(err.code(), "unsupported_network");
    }

    #[test]
    fn test_recovery_id_networks() {
        assert!(NetworkId::Evm.uses_recovery_id());
        assert!(NetworkId::Stacks.uses_recovery_id());
        assert!(!NetworkId::Bitcoin.uses_recovery_id());
        assert!(!NetworkId::BitcoinTestnet.uses_recovery_id());
        assert!(!NetworkId::Liquid.uses_recovery_id());
    }

    #[test]
    fn test_default_paths() {
        assert_eq!(NetworkId::Bitcoin.default_path(), "m/84'/0'/0'/0/0");
        assert_eq!(NetworkId::Stacks.default_path(), "m/44'/5757'/0'/0/0");
        assert_eq!(NetworkId::Liquid.default_path(), "m/84'/1776'/0'/0/0");
        assert_eq!(NetworkId::taproot_path(), "m/86'/0'/0'/0/0");
    }
}
