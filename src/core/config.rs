use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signing core configuration
///
/// The KDF iteration count and session window are versioned constants: they
/// are fixed per vault version and must never vary call-to-call. The defaults
/// here are the v1 values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// PBKDF2-HMAC-SHA256 iteration count for vault v1.
    ///
    /// Fixed at 200,000. Earlier revisions of the envelope format used
    /// 100,000; those vaults are not readable and must be re-encrypted.
    #[serde(default = "SignerConfig::default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// Session cache lifetime in seconds.
    ///
    /// Fixed at 300 (5 minutes). The 30-minute window that existed in one
    /// revision was rejected as too wide for a hot signing key.
    #[serde(default = "SignerConfig::default_session_duration_secs")]
    pub session_duration_secs: u64,
}

impl SignerConfig {
    fn default_pbkdf2_iterations() -> u32 {
        200_000
    }

    fn default_session_duration_secs() -> u64 {
        300
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session_duration_secs)
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: Self::default_pbkdf2_iterations(),
            session_duration_secs: Self::default_session_duration_secs(),
        }
    }
}
