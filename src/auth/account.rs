use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;

use super::error::StoreError;

pub type AccountId = i64;

/// Identity record as seen by the verifier. Never mutated by it.
#[derive(Clone, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub is_admin: bool,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

/// Read-only account lookup.
///
/// Email and username lookups use case-insensitive equality, not pattern
/// matching; callers pass values that are already trimmed and lower-cased.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn find_by_email_ci(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn find_by_username_ci(&self, username: &str) -> Result<Option<Account>, StoreError>;
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
}

/// Admin account to create or update.
#[derive(Debug)]
pub struct NewAdmin {
    pub username: String,
    pub email: Option<String>,
    pub password: SecretString,
    pub update: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created(AccountId),
    Updated(AccountId),
    Unchanged(AccountId),
}

/// Account storage that can also provision administrators.
#[async_trait]
pub trait AccountStore: AccountLookup {
    /// Store an already hashed admin account.
    ///
    /// An existing username (case-insensitive) is only touched when
    /// `admin.update` is set; otherwise the existing id is reported as
    /// [`ProvisionOutcome::Unchanged`].
    async fn upsert_admin(
        &self,
        admin: &NewAdmin,
        password_hash: String,
    ) -> Result<ProvisionOutcome, StoreError>;
}
