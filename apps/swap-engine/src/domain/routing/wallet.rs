//! Payer credentials handed to venues when building a swap.

use std::fmt;

/// Signing credentials for the payer wallet.
///
/// Key custody is external; the engine only passes these through.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletCredentials {
    public_key: String,
    secret_key: String,
}

impl WalletCredentials {
    /// Create credentials from encoded keys.
    #[must_use]
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Encoded public key of the payer.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Encoded secret key of the payer.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for WalletCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredentials")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
