//! Credential verification.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, instrument};

use super::{
    account::{AccountId, AccountLookup},
    compare::constant_time_eq_str,
    hash::{DummyHash, verify_hash},
};

/// Outcome of a login attempt.
///
/// `Rejected` carries no reason on purpose: unknown identifiers and wrong
/// passwords must be indistinguishable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated(AccountId),
    Rejected,
}

impl AuthResult {
    #[must_use]
    pub fn account_id(self) -> Option<AccountId> {
        match self {
            Self::Authenticated(id) => Some(id),
            Self::Rejected => None,
        }
    }
}

/// Normalize a login identifier (email or username) for lookup.
#[must_use]
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

struct Candidate {
    id: AccountId,
    password_hash: String,
    stored_identifier: String,
}

/// Decides whether an identifier/password pair belongs to a known account.
#[derive(Clone)]
pub struct CredentialVerifier {
    accounts: Arc<dyn AccountLookup>,
    dummy_hash: DummyHash,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountLookup>, dummy_hash: DummyHash) -> Self {
        Self {
            accounts,
            dummy_hash,
        }
    }

    #[must_use]
    pub fn accounts(&self) -> &dyn AccountLookup {
        self.accounts.as_ref()
    }

    /// Verify a login attempt.
    ///
    /// Exactly one hash verification and one constant-time identifier
    /// comparison run on every call, including empty input and unknown
    /// identifiers.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, identifier: &str, password: &SecretString) -> AuthResult {
        let identifier = normalize_identifier(identifier);
        let candidate = self.find_candidate(&identifier).await;

        let (record_hash, stored_identifier) = match &candidate {
            Some(candidate) => (
                candidate.password_hash.clone(),
                candidate.stored_identifier.as_str(),
            ),
            None => (self.dummy_hash.as_str().to_string(), ""),
        };

        let password_matches = verify_blocking(record_hash, password.clone()).await;
        let identifier_matches = constant_time_eq_str(stored_identifier, &identifier);

        match candidate {
            Some(candidate) if identifier_matches && password_matches => {
                debug!("credentials accepted");
                AuthResult::Authenticated(candidate.id)
            }
            _ => {
                debug!("credentials rejected");
                AuthResult::Rejected
            }
        }
    }

    /// Both lookups always run; an email match wins over a username match.
    async fn find_candidate(&self, identifier: &str) -> Option<Candidate> {
        let (by_email, by_username) = tokio::join!(
            self.accounts.find_by_email_ci(identifier),
            self.accounts.find_by_username_ci(identifier),
        );

        let by_email = by_email.unwrap_or_else(|err| {
            error!("Account lookup by email failed: {err}");
            None
        });
        let by_username = by_username.unwrap_or_else(|err| {
            error!("Account lookup by username failed: {err}");
            None
        });

        if let Some(account) = by_email {
            let stored_identifier = account
                .email
                .as_deref()
                .map(normalize_identifier)
                .unwrap_or_default();
            return Some(Candidate {
                id: account.id,
                password_hash: account.password_hash,
                stored_identifier,
            });
        }

        by_username.map(|account| Candidate {
            id: account.id,
            stored_identifier: normalize_identifier(&account.username),
            password_hash: account.password_hash,
        })
    }
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("dummy_hash", &self.dummy_hash)
            .finish_non_exhaustive()
    }
}

/// Run the hash check on the blocking pool. A panicked or cancelled task is a
/// non-match.
async fn verify_blocking(stored_hash: String, candidate: SecretString) -> bool {
    match task::spawn_blocking(move || verify_hash(&stored_hash, candidate.expose_secret())).await
    {
        Ok(matches) => matches,
        Err(err) => {
            error!("Password verification task failed: {err}");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{Account, MemoryAccountStore, PasswordHasher, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hasher() -> PasswordHasher {
        PasswordHasher::with_cost(1024, 1, 1).unwrap()
    }

    async fn fixture() -> (CredentialVerifier, AccountId, AccountId) {
        let hasher = hasher();
        let store = MemoryAccountStore::new();
        let alice = store
            .insert(
                "alice",
                Some("A@Example.com"),
                hasher.hash("alice-password").unwrap(),
                false,
            )
            .await
            .unwrap();
        let bob = store
            .insert("Bob", None, hasher.hash("bob-password").unwrap(), true)
            .await
            .unwrap();
        let verifier =
            CredentialVerifier::new(Arc::new(store), DummyHash::generate(&hasher).unwrap());
        (verifier, alice, bob)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn correct_password_by_email_is_authenticated() {
        let (verifier, alice, _) = fixture().await;
        let result = verifier
            .authenticate("a@example.com", &secret("alice-password"))
            .await;
        assert_eq!(result, AuthResult::Authenticated(alice));
    }

    #[tokio::test]
    async fn email_match_ignores_case_and_whitespace() {
        let (verifier, alice, _) = fixture().await;
        let result = verifier
            .authenticate("  A@EXAMPLE.COM ", &secret("alice-password"))
            .await;
        assert_eq!(result, AuthResult::Authenticated(alice));
    }

    #[tokio::test]
    async fn username_is_accepted_when_no_email_matches() {
        let (verifier, alice, bob) = fixture().await;
        assert_eq!(
            verifier.authenticate("bob", &secret("bob-password")).await,
            AuthResult::Authenticated(bob)
        );
        assert_eq!(
            verifier.authenticate("Alice", &secret("alice-password")).await,
            AuthResult::Authenticated(alice)
        );
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (verifier, _, _) = fixture().await;
        let result = verifier
            .authenticate("a@example.com", &secret("bob-password"))
            .await;
        assert_eq!(result, AuthResult::Rejected);
        assert_eq!(result.account_id(), None);
    }

    #[tokio::test]
    async fn unknown_identifier_is_rejected() {
        let (verifier, _, _) = fixture().await;
        assert_eq!(
            verifier
                .authenticate("nobody@example.com", &secret("alice-password"))
                .await,
            AuthResult::Rejected
        );
    }

    #[tokio::test]
    async fn dummy_password_does_not_open_unknown_accounts() {
        let (verifier, _, _) = fixture().await;
        assert_eq!(
            verifier
                .authenticate("nobody", &secret(crate::auth::hash::DUMMY_PASSWORD))
                .await,
            AuthResult::Rejected
        );
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let (verifier, _, _) = fixture().await;
        assert_eq!(
            verifier.authenticate("", &secret("")).await,
            AuthResult::Rejected
        );
        assert_eq!(
            verifier.authenticate("   ", &secret("x")).await,
            AuthResult::Rejected
        );
    }

    struct CountingLookup {
        account: Option<Account>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AccountLookup for CountingLookup {
        async fn find_by_email_ci(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(None)
        }

        async fn find_by_username_ci(
            &self,
            _username: &str,
        ) -> Result<Option<Account>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(self.account.clone())
        }

        async fn find_by_id(&self, _id: AccountId) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }
    }

    fn account_with_hash(password_hash: String) -> Account {
        Account {
            id: 7,
            username: "carol".to_string(),
            email: None,
            password_hash,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn malformed_stored_hash_is_rejected() {
        let lookup = CountingLookup {
            account: Some(account_with_hash("$bogus$".to_string())),
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let verifier =
            CredentialVerifier::new(Arc::new(lookup), DummyHash::generate(&hasher()).unwrap());
        assert_eq!(
            verifier.authenticate("carol", &secret("anything")).await,
            AuthResult::Rejected
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_rejected() {
        let lookup = Arc::new(CountingLookup {
            account: None,
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let verifier =
            CredentialVerifier::new(lookup.clone(), DummyHash::generate(&hasher()).unwrap());
        assert_eq!(
            verifier.authenticate("carol", &secret("anything")).await,
            AuthResult::Rejected
        );
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn identifier_mismatch_after_lookup_is_rejected() {
        // A lookup that returns an account whose stored username differs from
        // the requested identifier must not authenticate.
        let hasher = hasher();
        let lookup = CountingLookup {
            account: Some(account_with_hash(hasher.hash("pw").unwrap())),
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let verifier =
            CredentialVerifier::new(Arc::new(lookup), DummyHash::generate(&hasher).unwrap());
        assert_eq!(
            verifier.authenticate("mallory", &secret("pw")).await,
            AuthResult::Rejected
        );
        assert_eq!(
            verifier.authenticate("CAROL", &secret("pw")).await,
            AuthResult::Authenticated(7)
        );
    }

    #[test]
    fn normalize_identifier_trims_and_lowercases() {
        assert_eq!(normalize_identifier(" Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_identifier(""), "");
    }
}
