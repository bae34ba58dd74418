//! BIP-39 mnemonic to wallet seed

use crate::core::errors::SignerError;
use crate::crypto::vault::Seed;
use bip39::Mnemonic;
use zeroize::{Zeroize, Zeroizing};

/// Convert a BIP-39 mnemonic phrase (plus optional passphrase) into the
/// 64-byte wallet seed. The phrase is checksum-validated; a bad word or
/// checksum is rejected before any derivation happens.
pub fn seed_from_mnemonic(mnemonic: &str, passphrase: &str) -> Result<Seed, SignerError> {
    let parsed = Mnemonic::parse(mnemonic)
        .map_err(|e| SignerError::InvalidInput(format!("Invalid mnemonic: {}", e)))?;

    let mut seed_bytes = parsed.to_seed(passphrase);
    let seed = Zeroizing::new(seed_bytes.to_vec());
    seed_bytes.zeroize();
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_known_seed() {
        let seed = seed_from_mnemonic(PHRASE, "").unwrap();
        assert_eq!(
            hex::encode(seed.as_slice()),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
                .replace(char::is_whitespace, "")
        );
    }

    #[test]
    fn test_passphrase_changes_seed() {
        let plain = seed_from_mnemonic(PHRASE, "").unwrap();
        let salted = seed_from_mnemonic(PHRASE, "TREZOR").unwrap();
        assert_eq!(plain.len(), 64);
        assert_eq!(salted.len(), 64);
        assert_ne!(plain.as_slice(), salted.as_slice());
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let bad = PHRASE.replace("about", "abandon");
        let err = seed_from_mnemonic(&bad, "").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(seed_from_mnemonic("not a mnemonic at all", "").is_err());
    }
}
