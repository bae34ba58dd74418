//! BIP32 hierarchical deterministic key derivation
//!
//! The tree is purely functional: every derivation returns a new,
//! independently owned node, and private key bytes live inside `Zeroizing`
//! buffers that are wiped on drop. Hardened derivation requires the parent
//! private key; non-hardened derivation works from either a private or a
//! public-only parent (point tweak-add).

use crate::core::errors::SignerError;
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;
use std::str::FromStr;
use zeroize::{Zeroize, Zeroizing};

type HmacSha512 = Hmac<Sha512>;

const HARDENED_BIT: u32 = 0x8000_0000;

/// One step of a derivation path: an unsigned 31-bit index plus the
/// hardened marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildIndex {
    pub index: u32,
    pub hardened: bool,
}

impl ChildIndex {
    pub fn normal(index: u32) -> Self {
        Self { index, hardened: false }
    }

    pub fn hardened(index: u32) -> Self {
        Self { index, hardened: true }
    }

    /// Raw 32-bit index as serialized into the HMAC input.
    pub fn raw(&self) -> u32 {
        if self.hardened {
            HARDENED_BIT | self.index
        } else {
            self.index
        }
    }
}

impl FromStr for ChildIndex {
    type Err = SignerError;

    fn from_str(segment: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match segment.strip_suffix('\'').or_else(|| segment.strip_suffix('h')) {
            Some(rest) => (rest, true),
            None => (segment, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SignerError::InvalidPath(format!("Bad path segment: {}", segment)));
        }
        let index: u32 = digits
            .parse()
            .map_err(|_| SignerError::InvalidPath(format!("Bad path segment: {}", segment)))?;
        if index >= HARDENED_BIT {
            return Err(SignerError::InvalidPath(format!("Index out of range: {}", segment)));
        }
        Ok(Self { index, hardened })
    }
}

/// Ordered derivation path, parsed from `m/84'/0'/0'/0/0`-style strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(pub Vec<ChildIndex>);

impl DerivationPath {
    pub fn parse(path: &str) -> Result<Self, SignerError> {
        if path.is_empty() {
            return Err(SignerError::InvalidPath("Empty path".to_string()));
        }
        let mut indices = Vec::new();
        for (i, segment) in path.split('/').enumerate() {
            if i == 0 && segment == "m" {
                continue;
            }
            indices.push(segment.parse()?);
        }
        Ok(Self(indices))
    }

    /// BIP44-style purpose field (first hardened index), if present.
    pub fn purpose(&self) -> Option<u32> {
        self.0.first().filter(|c| c.hardened).map(|c| c.index)
    }
}

/// A node in the BIP32 tree.
///
/// `Debug` is implemented manually so the private key bytes are never
/// printed.
pub struct HdKey {
    pub chain_code: [u8; 32],
    private_key: Option<Zeroizing<[u8; 32]>>,
    public_key: [u8; 33],
}

impl core::fmt::Debug for HdKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HdKey")
            .field("chain_code", &self.chain_code)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl HdKey {
    /// Master key from raw seed entropy, per BIP32:
    /// HMAC-SHA512("Bitcoin seed", seed).
    pub fn master_from_seed(seed: &[u8]) -> Result<Self, SignerError> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(SignerError::InvalidInput(
                "Seed must be between 16 and 64 bytes".to_string(),
            ));
        }

        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|e| SignerError::Crypto(format!("HMAC init failed: {}", e)))?;
        mac.update(seed);
        let mut i_out = [0u8; 64];
        i_out.copy_from_slice(&mac.finalize().into_bytes());

        let node = Self::from_parts(&i_out[..32], &i_out[32..]);
        i_out.zeroize();
        node
    }

    fn from_parts(key_bytes: &[u8], chain_bytes: &[u8]) -> Result<Self, SignerError> {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(key_bytes)
            .map_err(|_| SignerError::Crypto("Derived key is not a valid scalar".to_string()))?;
        let public_key = PublicKey::from_secret_key(&secp, &secret).serialize();

        let mut private_key = Zeroizing::new([0u8; 32]);
        private_key.copy_from_slice(key_bytes);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(chain_bytes);

        Ok(Self { chain_code, private_key: Some(private_key), public_key })
    }

    /// Derive one child node, per BIP32.
    pub fn derive_child(&self, child: ChildIndex) -> Result<Self, SignerError> {
        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| SignerError::Crypto(format!("HMAC init failed: {}", e)))?;

        if child.hardened {
            let private = self
                .private_key
                .as_ref()
                .ok_or(SignerError::HardenedDerivationRequiresPrivateKey)?;
            mac.update(&[0x00]);
            mac.update(private.as_ref());
        } else {
            mac.update(&self.public_key);
        }
        mac.update(&child.raw().to_be_bytes());

        let mut i_out = [0u8; 64];
        i_out.copy_from_slice(&mac.finalize().into_bytes());

        let result = self.apply_tweak(&i_out);
        i_out.zeroize();
        result
    }

    fn apply_tweak(&self, i_out: &[u8; 64]) -> Result<Self, SignerError> {
        let secp = Secp256k1::new();
        let mut tweak_bytes = [0u8; 32];
        tweak_bytes.copy_from_slice(&i_out[..32]);
        let tweak = Scalar::from_be_bytes(tweak_bytes)
            .map_err(|_| SignerError::Crypto("Child tweak out of range".to_string()))?;
        tweak_bytes.zeroize();

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&i_out[32..]);

        match &self.private_key {
            Some(parent_private) => {
                let parent_secret = SecretKey::from_slice(parent_private.as_ref())
                    .map_err(|_| SignerError::Crypto("Corrupt parent key".to_string()))?;
                let child_secret = parent_secret
                    .add_tweak(&tweak)
                    .map_err(|_| SignerError::Crypto("Child key derivation degenerate".to_string()))?;
                let public_key = PublicKey::from_secret_key(&secp, &child_secret).serialize();
                let private_key = Zeroizing::new(child_secret.secret_bytes());
                Ok(Self { chain_code, private_key: Some(private_key), public_key })
            }
            None => {
                let parent_public = PublicKey::from_slice(&self.public_key)
                    .map_err(|_| SignerError::Crypto("Corrupt parent public key".to_string()))?;
                let child_public = parent_public
                    .add_exp_tweak(&secp, &tweak)
                    .map_err(|_| SignerError::Crypto("Child key derivation degenerate".to_string()))?;
                Ok(Self { chain_code, private_key: None, public_key: child_public.serialize() })
            }
        }
    }

    /// Fold `derive_child` along the whole path.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, SignerError> {
        let mut node = self.clone_node()?;
        for child in &path.0 {
            node = node.derive_child(*child)?;
        }
        Ok(node)
    }

    fn clone_node(&self) -> Result<Self, SignerError> {
        Ok(Self {
            chain_code: self.chain_code,
            private_key: self.private_key.clone(),
            public_key: self.public_key,
        })
    }

    /// Public-only view of this node; non-hardened children remain derivable.
    pub fn neutered(&self) -> Self {
        Self { chain_code: self.chain_code, private_key: None, public_key: self.public_key }
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Compressed SEC1 public key (33 bytes).
    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    /// X-only public key for BIP-340 (32 bytes).
    pub fn x_only_public_key(&self) -> [u8; 32] {
        let mut x = [0u8; 32];
        x.copy_from_slice(&self.public_key[1..33]);
        x
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    /// Private key bytes; only the explicitly security-warned derived-secret
    /// operation and the signature engine may call this.
    pub fn private_key_bytes(&self) -> Result<&Zeroizing<[u8; 32]>, SignerError> {
        self.private_key
            .as_ref()
            .ok_or(SignerError::HardenedDerivationRequiresPrivateKey)
    }

    /// Wipe the private half in place once downstream output is extracted.
    pub fn wipe(&mut self) {
        if let Some(mut private) = self.private_key.take() {
            private.zeroize();
        }
    }
}
