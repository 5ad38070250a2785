//! In-memory account and session stores.
//!
//! Used when the server runs without a database and by the test suites.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use super::{
    account::{Account, AccountId, AccountLookup, AccountStore, NewAdmin, ProvisionOutcome},
    error::StoreError,
    session::{SessionStore, SessionToken, hash_session_token},
};

#[derive(Default)]
struct Accounts {
    next_id: AccountId,
    rows: Vec<Account>,
}

impl Accounts {
    fn by_username(&mut self, username: &str) -> Option<&mut Account> {
        let username = username.to_lowercase();
        self.rows
            .iter_mut()
            .find(|account| account.username.to_lowercase() == username)
    }

    fn email_taken(&self, email: &str, except: Option<AccountId>) -> bool {
        let email = email.to_lowercase();
        self.rows.iter().any(|account| {
            Some(account.id) != except
                && account
                    .email
                    .as_deref()
                    .is_some_and(|stored| stored.to_lowercase() == email)
        })
    }
}

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Accounts>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account with an already hashed password.
    ///
    /// # Errors
    /// Returns [`StoreError::Conflict`] if the username or email is taken.
    pub async fn insert(
        &self,
        username: &str,
        email: Option<&str>,
        password_hash: String,
        is_admin: bool,
    ) -> Result<AccountId, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.by_username(username).is_some() {
            return Err(StoreError::Conflict(username.to_string()));
        }
        if let Some(email) = email
            && accounts.email_taken(email, None)
        {
            return Err(StoreError::Conflict(email.to_string()));
        }

        accounts.next_id += 1;
        let id = accounts.next_id;
        accounts.rows.push(Account {
            id,
            username: username.to_string(),
            email: email.map(ToString::to_string),
            password_hash,
            is_admin,
        });
        Ok(id)
    }
}

#[async_trait]
impl AccountLookup for MemoryAccountStore {
    async fn find_by_email_ci(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = email.to_lowercase();
        let accounts = self.accounts.read().await;
        Ok(accounts
            .rows
            .iter()
            .find(|account| {
                account
                    .email
                    .as_deref()
                    .is_some_and(|stored| stored.to_lowercase() == email)
            })
            .cloned())
    }

    async fn find_by_username_ci(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let username = username.to_lowercase();
        let accounts = self.accounts.read().await;
        Ok(accounts
            .rows
            .iter()
            .find(|account| account.username.to_lowercase() == username)
            .cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.rows.iter().find(|account| account.id == id).cloned())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn upsert_admin(
        &self,
        admin: &NewAdmin,
        password_hash: String,
    ) -> Result<ProvisionOutcome, StoreError> {
        let existing = {
            let mut accounts = self.accounts.write().await;
            let existing_id = accounts.by_username(&admin.username).map(|account| account.id);

            match existing_id {
                Some(id) if !admin.update => return Ok(ProvisionOutcome::Unchanged(id)),
                Some(id) => {
                    if let Some(email) = &admin.email
                        && accounts.email_taken(email, Some(id))
                    {
                        return Err(StoreError::Conflict(email.clone()));
                    }
                    if let Some(account) = accounts.by_username(&admin.username) {
                        account.password_hash = password_hash.clone();
                        account.is_admin = true;
                        if admin.email.is_some() {
                            account.email.clone_from(&admin.email);
                        }
                    }
                    Some(id)
                }
                None => None,
            }
        };

        match existing {
            Some(id) => Ok(ProvisionOutcome::Updated(id)),
            None => self
                .insert(&admin.username, admin.email.as_deref(), password_hash, true)
                .await
                .map(ProvisionOutcome::Created),
        }
    }
}

struct SessionEntry {
    account_id: AccountId,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Vec<u8>, SessionEntry>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn establish_session(
        &self,
        account_id: AccountId,
        ttl: Duration,
    ) -> Result<SessionToken, StoreError> {
        let token = SessionToken::generate()?;
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            token.hash(),
            SessionEntry {
                account_id,
                expires_at: now + ttl,
            },
        );
        Ok(token)
    }

    async fn resolve_session(&self, token: &str) -> Result<Option<AccountId>, StoreError> {
        let token_hash = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&token_hash) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.account_id)),
            Some(_) => {
                sessions.remove(&token_hash);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn terminate_session(&self, token: &str) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .await
            .remove(&hash_session_token(token));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn admin(username: &str, email: Option<&str>, update: bool) -> NewAdmin {
        NewAdmin {
            username: username.to_string(),
            email: email.map(ToString::to_string),
            password: SecretString::from("unused".to_string()),
            update,
        }
    }

    #[tokio::test]
    async fn lookups_are_case_insensitive_equality() {
        let store = MemoryAccountStore::new();
        let id = store
            .insert("Alice", Some("A@Example.com"), "hash".to_string(), false)
            .await
            .unwrap();

        let by_email = store.find_by_email_ci("a@example.com").await.unwrap();
        assert_eq!(by_email.map(|a| a.id), Some(id));
        let by_username = store.find_by_username_ci("ALICE").await.unwrap();
        assert_eq!(by_username.map(|a| a.id), Some(id));

        // No pattern matching.
        assert!(store.find_by_email_ci("%").await.unwrap().is_none());
        assert!(store.find_by_username_ci("ali").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let store = MemoryAccountStore::new();
        store
            .insert("alice", Some("a@example.com"), "h".to_string(), false)
            .await
            .unwrap();
        assert!(matches!(
            store.insert("ALICE", None, "h".to_string(), false).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store
                .insert("bob", Some("A@EXAMPLE.COM"), "h".to_string(), false)
                .await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn upsert_admin_creates_then_respects_update_flag() {
        let store = MemoryAccountStore::new();
        let created = store
            .upsert_admin(&admin("root", None, false), "h1".to_string())
            .await
            .unwrap();
        let ProvisionOutcome::Created(id) = created else {
            panic!("expected Created, got {created:?}");
        };

        let unchanged = store
            .upsert_admin(&admin("root", None, false), "h2".to_string())
            .await
            .unwrap();
        assert_eq!(unchanged, ProvisionOutcome::Unchanged(id));
        let account = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(account.password_hash, "h1");

        let updated = store
            .upsert_admin(&admin("Root", Some("root@example.com"), true), "h3".to_string())
            .await
            .unwrap();
        assert_eq!(updated, ProvisionOutcome::Updated(id));
        let account = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(account.password_hash, "h3");
        assert_eq!(account.email.as_deref(), Some("root@example.com"));
        assert!(account.is_admin);
    }

    #[tokio::test]
    async fn sessions_resolve_until_terminated() {
        let store = MemorySessionStore::new();
        let token = store
            .establish_session(3, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.resolve_session(token.expose_secret()).await.unwrap(),
            Some(3)
        );
        assert_eq!(store.resolve_session("bogus").await.unwrap(), None);

        store.terminate_session(token.expose_secret()).await.unwrap();
        assert_eq!(
            store.resolve_session(token.expose_secret()).await.unwrap(),
            None
        );
        store.terminate_session("bogus").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let store = MemorySessionStore::new();
        let token = store.establish_session(1, Duration::ZERO).await.unwrap();
        assert_eq!(
            store.resolve_session(token.expose_secret()).await.unwrap(),
            None
        );
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn raw_tokens_are_not_stored() {
        let store = MemorySessionStore::new();
        let token = store
            .establish_session(1, Duration::from_secs(60))
            .await
            .unwrap();
        let sessions = store.sessions.lock().await;
        assert!(sessions.contains_key(&token.hash()));
        assert!(!sessions.contains_key(token.expose_secret().as_bytes()));
    }
}
