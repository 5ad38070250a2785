use crate::{
    api,
    auth::{
        AccountStore, AuthConfig, AuthState, CredentialVerifier, DummyHash, MemoryAccountStore,
        MemorySessionStore, NewAdmin, PasswordHasher, SessionStore, provision::provision_admin,
        storage::{PgAccountStore, PgSessionStore, apply_schema},
    },
    cli::commands::admin::Seed,
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub default_redirect: String,
    pub failure_delay_ms: u64,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub admin_seed: Option<Seed>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the admin seed fails, or
/// the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let hasher = PasswordHasher::default();

    let auth_config = AuthConfig::new()
        .with_default_target(args.default_redirect)
        .with_failure_delay(Duration::from_millis(args.failure_delay_ms))
        .with_session_ttl(Duration::from_secs(args.session_ttl_seconds))
        .with_cookie_secure(args.cookie_secure);

    debug!("Auth config: {:?}", auth_config);

    let auth_state = if let Some(dsn) = &args.dsn {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        apply_schema(&pool)
            .await
            .context("Failed to apply database schema")?;

        build_state(
            Arc::new(PgAccountStore::new(pool.clone())),
            Arc::new(PgSessionStore::new(pool)),
            &hasher,
            args.admin_seed.as_ref(),
            auth_config,
        )
        .await?
    } else {
        warn!("No database configured; accounts and sessions are kept in memory");
        build_state(
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemorySessionStore::new()),
            &hasher,
            args.admin_seed.as_ref(),
            auth_config,
        )
        .await?
    };

    api::new(args.port, Arc::new(auth_state)).await
}

async fn build_state<A>(
    accounts: Arc<A>,
    sessions: Arc<dyn SessionStore>,
    hasher: &PasswordHasher,
    seed: Option<&Seed>,
    config: AuthConfig,
) -> Result<AuthState>
where
    A: AccountStore + 'static,
{
    if let Some(seed) = seed {
        let admin = NewAdmin {
            username: seed.username.clone(),
            email: seed.email.clone(),
            password: seed.password.clone(),
            update: false,
        };
        provision_admin(accounts.as_ref(), hasher, &admin)
            .await
            .context("Failed to seed administrator")?;
    }

    // Generated once per process; stands in for a stored hash on unknown identifiers.
    let dummy_hash = DummyHash::generate(hasher).context("Failed to generate dummy hash")?;
    let verifier = CredentialVerifier::new(accounts, dummy_hash);

    Ok(AuthState::new(config, verifier, sessions))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{AccountLookup, AuthResult};
    use secrecy::SecretString;

    #[tokio::test]
    async fn build_state_seeds_admin_once() {
        let hasher = PasswordHasher::with_cost(1024, 1, 1).unwrap();
        let accounts = Arc::new(MemoryAccountStore::new());
        let seed = Seed {
            username: "root".to_string(),
            password: SecretString::from("s3cret".to_string()),
            email: Some("root@example.com".to_string()),
        };

        let state = build_state(
            accounts.clone(),
            Arc::new(MemorySessionStore::new()),
            &hasher,
            Some(&seed),
            AuthConfig::new(),
        )
        .await
        .unwrap();

        let password = SecretString::from("s3cret".to_string());
        let result = state
            .verifier()
            .authenticate("ROOT@example.com", &password)
            .await;
        assert!(matches!(result, AuthResult::Authenticated(_)));

        // A second seed with a different password leaves the account alone.
        let reseed = Seed {
            password: SecretString::from("other".to_string()),
            ..seed
        };
        build_state(
            accounts.clone(),
            Arc::new(MemorySessionStore::new()),
            &hasher,
            Some(&reseed),
            AuthConfig::new(),
        )
        .await
        .unwrap();
        let account = accounts.find_by_username_ci("root").await.unwrap().unwrap();
        assert!(crate::auth::verify_hash(&account.password_hash, "s3cret"));
    }
}
