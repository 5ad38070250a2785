//! Argon2id password hashing.
//!
//! Stored hashes are PHC strings, so verification reads the cost parameters
//! from the hash itself. Hashes produced with cheaper parameters (tests) and
//! the production defaults verify side by side.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;
use std::sync::Arc;

use super::error::StoreError;

pub(crate) const DUMMY_PASSWORD: &str = "dummy-password";

/// Salted Argon2id hasher with fixed cost parameters.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Build a hasher from explicit costs (memory in KiB).
    ///
    /// # Errors
    /// Returns an error if the parameters are outside Argon2's accepted range.
    pub fn with_cost(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, StoreError> {
        Params::new(memory_kib, iterations, parallelism, None)
            .map(Self::new)
            .map_err(|err| StoreError::Hash(err.to_string()))
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if the underlying hash computation fails.
    pub fn hash(&self, password: &str) -> Result<String, StoreError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| StoreError::Hash(err.to_string()))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

/// Hash a password with the default Argon2id parameters.
///
/// # Errors
/// Returns an error if the underlying hash computation fails.
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    PasswordHasher::default().hash(password)
}

/// Check a candidate password against a stored PHC hash.
///
/// Anything that cannot be parsed or verified is a non-match.
#[must_use]
pub fn verify_hash(stored_hash: &str, candidate: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Stand-in hash verified when no account matches an identifier.
///
/// Generated once at start-up with the same hasher as real accounts so a miss
/// costs the same as a wrong password.
#[derive(Clone)]
pub struct DummyHash(Arc<str>);

impl DummyHash {
    /// # Errors
    /// Returns an error if the hash computation fails.
    pub fn generate(hasher: &PasswordHasher) -> Result<Self, StoreError> {
        hasher.hash(DUMMY_PASSWORD).map(|hash| Self(Arc::from(hash)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DummyHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DummyHash(***)")
    }
}
