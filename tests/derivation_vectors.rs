//! Published BIP32 and BIP-39 vectors against the derivation stack.

use signing_enclave::crypto::hd::{DerivationPath, HdKey};
use signing_enclave::crypto::mnemonic::seed_from_mnemonic;

// BIP32 test vector 2
const VECTOR2_SEED: &str =
    "fffcf9f6f3f0edeae7e4e1dedbd8d5d2cfccc9c6c3c0bdbab7b4b1aeaba8a5a2\
     9f9c999693908d8a8784817e7b7875726f6c696663605d5a5754514e4b484542";

#[test]
fn bip32_vector2_master() {
    let seed = hex::decode(VECTOR2_SEED.replace(char::is_whitespace, "")).unwrap();
    let master = HdKey::master_from_seed(&seed).unwrap();
    assert_eq!(
        hex::encode(master.private_key_bytes().unwrap().as_slice()),
        "4b03d6fc340455b363f51020ad3ecca4f0850280cf436c70c727923f6db46c3e"
    );
    assert_eq!(
        hex::encode(master.chain_code),
        "60499f801b896d83179a4374aeb7822aaeaceaa0db1f85ee3e904c4defbd9689"
    );
}

#[test]
fn bip32_vector2_child_m_0() {
    let seed = hex::decode(VECTOR2_SEED.replace(char::is_whitespace, "")).unwrap();
    let master = HdKey::master_from_seed(&seed).unwrap();
    let child = master.derive_path(&DerivationPath::parse("m/0").unwrap()).unwrap();
    assert_eq!(
        hex::encode(child.private_key_bytes().unwrap().as_slice()),
        "abe74a98f6c7eabee0428f53798f0ab8aa1bd37873999041703c742f15ac7e1e"
    );
}

#[test]
fn mnemonic_to_bip32_account() {
    // seed derived from the all-abandon phrase feeds the HD tree directly
    let seed = seed_from_mnemonic(
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        "",
    )
    .unwrap();
    let master = HdKey::master_from_seed(&seed).unwrap();
    let account = master
        .derive_path(&DerivationPath::parse("m/84'/0'/0'/0/0").unwrap())
        .unwrap();
    // determinism end to end
    let again = HdKey::master_from_seed(&seed)
        .unwrap()
        .derive_path(&DerivationPath::parse("m/84'/0'/0'/0/0").unwrap())
        .unwrap();
    assert_eq!(account.public_key_hex(), again.public_key_hex());
    assert_eq!(account.public_key_hex().len(), 66);
}
