use thiserror::Error;

/// Failures raised by account and session collaborators.
///
/// The verifier never forwards these to a login caller; they only reach the
/// logs and the administrative paths (start-up seeding, `create-admin`).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("invalid account data: {0}")]
    Invalid(&'static str),
    #[error("account already exists: {0}")]
    Conflict(String),
    #[error("failed to generate session token")]
    TokenGeneration,
}
