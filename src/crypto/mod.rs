pub mod ecdsa;
pub mod hd;
pub mod mnemonic;
pub mod schnorr;
pub mod vault;

pub use hd::{ChildIndex, DerivationPath, HdKey};
pub use vault::{DerivedKey, EncryptedVault, Seed};
