//! Administrator provisioning for start-up seeding and `create-admin`.

use regex::Regex;
use secrecy::ExposeSecret;
use tokio::task;
use tracing::{info, instrument};

use super::{
    account::{AccountStore, NewAdmin, ProvisionOutcome},
    error::StoreError,
    hash::PasswordHasher,
};

/// Basic email format check.
pub(crate) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

fn validate(admin: &NewAdmin) -> Result<(), StoreError> {
    if admin.username.trim().is_empty() {
        return Err(StoreError::Invalid("username cannot be empty"));
    }
    if admin.password.expose_secret().is_empty() {
        return Err(StoreError::Invalid("password cannot be empty"));
    }
    if let Some(email) = &admin.email
        && !valid_email(email)
    {
        return Err(StoreError::Invalid("email is not a valid address"));
    }
    Ok(())
}

/// Create or update an administrator account.
///
/// # Errors
/// Returns an error if the input is invalid, hashing fails, or the store
/// rejects the account.
#[instrument(skip(store, hasher), fields(username = %admin.username))]
pub async fn provision_admin(
    store: &dyn AccountStore,
    hasher: &PasswordHasher,
    admin: &NewAdmin,
) -> Result<ProvisionOutcome, StoreError> {
    validate(admin)?;

    let hasher = hasher.clone();
    let password = admin.password.clone();
    let password_hash = task::spawn_blocking(move || hasher.hash(password.expose_secret()))
        .await
        .map_err(|err| StoreError::Hash(err.to_string()))??;

    let outcome = store.upsert_admin(admin, password_hash).await?;
    match outcome {
        ProvisionOutcome::Created(id) => info!("Created admin user {id}"),
        ProvisionOutcome::Updated(id) => info!("Updated admin user {id}"),
        ProvisionOutcome::Unchanged(id) => info!("Admin user {id} already exists"),
    }
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{AccountLookup, MemoryAccountStore, verify_hash};
    use secrecy::SecretString;

    fn hasher() -> PasswordHasher {
        PasswordHasher::with_cost(1024, 1, 1).unwrap()
    }

    fn admin(username: &str, password: &str, email: Option<&str>, update: bool) -> NewAdmin {
        NewAdmin {
            username: username.to_string(),
            email: email.map(ToString::to_string),
            password: SecretString::from(password.to_string()),
            update,
        }
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-domain@"));
    }

    #[tokio::test]
    async fn provision_hashes_password() {
        let store = MemoryAccountStore::new();
        let outcome = provision_admin(&store, &hasher(), &admin("root", "s3cret", None, false))
            .await
            .unwrap();
        let ProvisionOutcome::Created(id) = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        let account = store.find_by_id(id).await.unwrap().unwrap();
        assert!(account.is_admin);
        assert!(verify_hash(&account.password_hash, "s3cret"));
    }

    #[tokio::test]
    async fn provision_update_resets_password() {
        let store = MemoryAccountStore::new();
        provision_admin(&store, &hasher(), &admin("root", "first", None, false))
            .await
            .unwrap();
        let outcome = provision_admin(&store, &hasher(), &admin("root", "second", None, true))
            .await
            .unwrap();
        assert!(matches!(outcome, ProvisionOutcome::Updated(_)));
        let account = store.find_by_username_ci("root").await.unwrap().unwrap();
        assert!(verify_hash(&account.password_hash, "second"));
        assert!(!verify_hash(&account.password_hash, "first"));
    }

    #[tokio::test]
    async fn provision_rejects_invalid_input() {
        let store = MemoryAccountStore::new();
        for input in [
            admin(" ", "pw", None, false),
            admin("root", "", None, false),
            admin("root", "pw", Some("nope"), false),
        ] {
            assert!(matches!(
                provision_admin(&store, &hasher(), &input).await,
                Err(StoreError::Invalid(_))
            ));
        }
        assert!(store.find_by_username_ci("root").await.unwrap().is_none());
    }
}
