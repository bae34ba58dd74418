//! Bounded in-memory session cache
//!
//! After a successful unlock the derived vault key is cached for a fixed
//! window so follow-up operations skip the PBKDF2 cost. The cache holds at
//! most one key, is bound to one vault via a salt fingerprint, and the key is
//! zeroed the moment the session is cleared or found expired. The wallet seed
//! itself is never cached.

use crate::core::config::SignerConfig;
use crate::core::errors::SignerError;
use crate::crypto::vault::{self, DerivedKey, EncryptedVault};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Cached unlock state. Owned exclusively by the session manager.
struct SessionKey {
    key: DerivedKey,
    salt_fingerprint: Vec<u8>,
    expires_at: Instant,
}

/// Two-state (locked/unlocked) session cache behind a single mutex.
///
/// Unlock, use, and clear are linearized; a caller observing an expired or
/// mismatched session gets an error telling it to re-prompt, never a stale
/// key.
pub struct SessionManager {
    state: Mutex<Option<SessionKey>>,
    duration: Duration,
    pbkdf2_iterations: u32,
}

impl SessionManager {
    pub fn new(config: &SignerConfig) -> Self {
        Self {
            state: Mutex::new(None),
            duration: config.session_duration(),
            pbkdf2_iterations: config.pbkdf2_iterations,
        }
    }

    /// Verify the credential against the vault and cache the derived key.
    ///
    /// The decrypted seed is a probe only; it is wiped before this function
    /// returns. A wrong credential leaves any previous session untouched.
    pub fn unlock(&self, vault: &EncryptedVault, credential: &str) -> Result<(), SignerError> {
        vault.check_version()?;
        let key = vault::derive_key(credential, &vault.salt, self.pbkdf2_iterations)?;

        // decrypt probe; the Zeroizing seed is dropped (and wiped) right here
        let _seed = vault::decrypt(vault, &key)?;

        let mut state = self.state.lock();
        *state = Some(SessionKey {
            key,
            salt_fingerprint: vault.salt.clone(),
            expires_at: Instant::now() + self.duration,
        });
        info!("Session unlocked ({}s window)", self.duration.as_secs());
        Ok(())
    }

    /// Fetch the cached key for this vault.
    ///
    /// `SessionExpired` when there is no session or the window elapsed (the
    /// key is wiped on the spot); `WalletMismatch` when the session belongs
    /// to a vault with a different salt.
    pub fn active_key(&self, vault: &EncryptedVault) -> Result<DerivedKey, SignerError> {
        let mut state = self.state.lock();
        let session = state.as_ref().ok_or(SignerError::SessionExpired)?;

        if Instant::now() >= session.expires_at {
            // drop wipes the Zeroizing key
            *state = None;
            debug!("Session window elapsed");
            return Err(SignerError::SessionExpired);
        }
        if session.salt_fingerprint != vault.salt {
            return Err(SignerError::WalletMismatch);
        }

        Ok(Zeroizing::new(*session.key))
    }

    /// Wipe the cached key synchronously and return to the locked state.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        if state.take().is_some() {
            info!("Session cleared");
        }
    }

    pub fn is_unlocked(&self) -> bool {
        let state = self.state.lock();
        matches!(state.as_ref(), Some(s) if Instant::now() < s.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::vault::seal;

    const TEST_ITERATIONS: u32 = 1_000;

    fn test_config(duration_secs: u64) -> SignerConfig {
        SignerConfig {
            pbkdf2_iterations: TEST_ITERATIONS,
            session_duration_secs: duration_secs,
        }
    }

    #[test]
    fn test_unlock_then_active_key() {
        let vault = seal(b"wallet seed entropy bytes!!!", "1234", TEST_ITERATIONS).unwrap();
        let manager = SessionManager::new(&test_config(300));

        manager.unlock(&vault, "1234").unwrap();
        assert!(manager.is_unlocked());

        let key = manager.active_key(&vault).unwrap();
        let seed = vault::decrypt(&vault, &key).unwrap();
        assert_eq!(seed.as_slice(), b"wallet seed entropy bytes!!!");
    }

    #[test]
    fn test_wrong_credential_does_not_unlock() {
        let vault = seal(b"seed bytes 0123456789abcdef!", "1234", TEST_ITERATIONS).unwrap();
        let manager = SessionManager::new(&test_config(300));

        let err = manager.unlock(&vault, "4321").unwrap_err();
        assert_eq!(err.code(), "auth_failed");
        assert!(!manager.is_unlocked());
        assert_eq!(manager.active_key(&vault).unwrap_err().code(), "session_expired");
    }

    #[test]
    fn test_locked_by_default() {
        let vault = seal(b"seed bytes 0123456789abcdef!", "1234", TEST_ITERATIONS).unwrap();
        let manager = SessionManager::new(&test_config(300));
        assert!(!manager.is_unlocked());
        assert_eq!(manager.active_key(&vault).unwrap_err().code(), "session_expired");
    }

    #[test]
    fn test_expiry_wipes_and_reports() {
        let vault = seal(b"seed bytes 0123456789abcdef!", "1234", TEST_ITERATIONS).unwrap();
        // zero-length window: the session is expired the moment it is cached
        let manager = SessionManager::new(&test_config(0));

        manager.unlock(&vault, "1234").unwrap();
        assert_eq!(manager.active_key(&vault).unwrap_err().code(), "session_expired");
        // and the cache slot is gone, not just flagged
        assert!(!manager.is_unlocked());
    }

    #[test]
    fn test_wallet_mismatch() {
        let vault_a = seal(b"seed bytes 0123456789abcdef!", "1234", TEST_ITERATIONS).unwrap();
        let vault_b = seal(b"other seed bytes 9876543210!", "1234", TEST_ITERATIONS).unwrap();
        let manager = SessionManager::new(&test_config(300));

        manager.unlock(&vault_a, "1234").unwrap();
        let err = manager.active_key(&vault_b).unwrap_err();
        assert_eq!(err.code(), "wallet_mismatch");
        // the original session is still intact
        assert!(manager.active_key(&vault_a).is_ok());
    }

    #[test]
    fn test_clear() {
        let vault = seal(b"seed bytes 0123456789abcdef!", "1234", TEST_ITERATIONS).unwrap();
        let manager = SessionManager::new(&test_config(300));

        manager.unlock(&vault, "1234").unwrap();
        manager.clear();
        assert!(!manager.is_unlocked());
        assert_eq!(manager.active_key(&vault).unwrap_err().code(), "session_expired");
    }

    #[test]
    fn test_reunlock_replaces_session() {
        let vault_a = seal(b"seed bytes 0123456789abcdef!", "1234", TEST_ITERATIONS).unwrap();
        let vault_b = seal(b"other seed bytes 9876543210!", "pin2", TEST_ITERATIONS).unwrap();
        let manager = SessionManager::new(&test_config(300));

        manager.unlock(&vault_a, "1234").unwrap();
        manager.unlock(&vault_b, "pin2").unwrap();
        assert!(manager.active_key(&vault_b).is_ok());
        assert_eq!(manager.active_key(&vault_a).unwrap_err().code(), "wallet_mismatch");
    }
}
