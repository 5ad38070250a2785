//! Postgres-backed account and session stores.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{
    account::{Account, AccountId, AccountLookup, AccountStore, NewAdmin, ProvisionOutcome},
    error::StoreError,
    session::{SessionStore, SessionToken, hash_session_token},
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Apply `sql/schema.sql`. Statements are idempotent.
///
/// # Errors
/// Returns an error if a statement fails.
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    for statement in split_sql_statements(SCHEMA_SQL) {
        sqlx::query(&statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    debug!("schema applied");
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let without_comments: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn conflict_or_database(err: sqlx::Error, value: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(value.to_string())
    } else {
        StoreError::Database(err)
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
    })
}

#[derive(Clone, Debug)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountLookup for PgAccountStore {
    #[instrument(skip_all)]
    async fn find_by_email_ci(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, is_admin FROM users \
             WHERE lower(email) = lower($1) LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    #[instrument(skip_all)]
    async fn find_by_username_ci(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, is_admin FROM users \
             WHERE lower(username) = lower($1) LIMIT 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, is_admin FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(account_from_row).transpose()?)
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(
        skip(self, password_hash),
        fields(username = %admin.username, update = admin.update)
    )]
    async fn upsert_admin(
        &self,
        admin: &NewAdmin,
        password_hash: String,
    ) -> Result<ProvisionOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<AccountId> = sqlx::query_scalar(
            "SELECT id FROM users WHERE lower(username) = lower($1) FOR UPDATE",
        )
        .bind(&admin.username)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some(id) if !admin.update => ProvisionOutcome::Unchanged(id),
            Some(id) => {
                sqlx::query(
                    "UPDATE users SET password_hash = $2, is_admin = TRUE, \
                     email = COALESCE($3, email), updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .bind(&password_hash)
                .bind(admin.email.as_deref())
                .execute(&mut *tx)
                .await
                .map_err(|err| {
                    conflict_or_database(err, admin.email.as_deref().unwrap_or_default())
                })?;
                ProvisionOutcome::Updated(id)
            }
            None => {
                let id: AccountId = sqlx::query_scalar(
                    "INSERT INTO users (username, email, password_hash, is_admin) \
                     VALUES ($1, $2, $3, TRUE) RETURNING id",
                )
                .bind(&admin.username)
                .bind(admin.email.as_deref())
                .bind(&password_hash)
                .fetch_one(&mut *tx)
                .await
                .map_err(|err| conflict_or_database(err, &admin.username))?;
                ProvisionOutcome::Created(id)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[instrument(skip(self))]
    async fn establish_session(
        &self,
        account_id: AccountId,
        ttl: Duration,
    ) -> Result<SessionToken, StoreError> {
        let token = SessionToken::generate()?;

        sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, expires_at) \
             VALUES ($1, $2, NOW() + make_interval(secs => $3))",
        )
        .bind(token.hash())
        .bind(account_id)
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    #[instrument(skip_all)]
    async fn resolve_session(&self, token: &str) -> Result<Option<AccountId>, StoreError> {
        let account_id: Option<AccountId> = sqlx::query_scalar(
            "SELECT user_id FROM sessions WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(hash_session_token(token))
        .fetch_optional(&self.pool)
        .await?;
        Ok(account_id)
    }

    #[instrument(skip_all)]
    async fn terminate_session(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
