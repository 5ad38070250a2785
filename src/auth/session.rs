//! Session tokens and the session store seam.
//!
//! Raw tokens are only handed to the caller (for the cookie). Stores keep the
//! SHA-256 of the token, so a leaked session table cannot be replayed.

use async_trait::async_trait;
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::time::Duration;

use super::{account::AccountId, error::StoreError};

/// Raw session token as presented by the client.
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    /// Create a fresh 32-byte random token, base64url encoded without padding.
    ///
    /// # Errors
    /// Returns an error if the operating system RNG is unavailable.
    pub fn generate() -> Result<Self, StoreError> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| StoreError::TokenGeneration)?;
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);
        Ok(Self(SecretString::from(encoded)))
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    #[must_use]
    pub fn hash(&self) -> Vec<u8> {
        hash_session_token(self.expose_secret())
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Hash a session token so raw values never reach storage.
#[must_use]
pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Login/logout collaborator.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session for an authenticated account and return its raw token.
    async fn establish_session(
        &self,
        account_id: AccountId,
        ttl: Duration,
    ) -> Result<SessionToken, StoreError>;

    /// Resolve a raw token to the account it belongs to, if still valid.
    async fn resolve_session(&self, token: &str) -> Result<Option<AccountId>, StoreError>;

    /// Drop a session. Unknown tokens are not an error.
    async fn terminate_session(&self, token: &str) -> Result<(), StoreError>;
}
