//! Signing wallet configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::routing::WalletCredentials;

/// Wallet keys, normally interpolated from `${WALLET_PUBLIC_KEY}` and
/// `${WALLET_SECRET_KEY}`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Public key of the signing wallet.
    #[serde(default)]
    pub public_key: String,
    /// Secret key of the signing wallet.
    #[serde(default, skip_serializing)]
    pub secret_key: String,
}

impl WalletConfig {
    /// Credentials handed to the executor.
    #[must_use]
    pub fn credentials(&self) -> WalletCredentials {
        WalletCredentials::new(self.public_key.clone(), self.secret_key.clone())
    }
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
