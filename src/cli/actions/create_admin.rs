use crate::auth::{
    NewAdmin, PasswordHasher, ProvisionOutcome,
    provision::provision_admin,
    storage::{PgAccountStore, apply_schema},
};
use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub username: String,
    pub password: SecretString,
    pub email: Option<String>,
    pub update: bool,
}

/// Create or update an administrator in the configured database.
/// # Errors
/// Returns an error if the database is unreachable, the input is invalid, or
/// the user already exists and `--update` was not given.
pub async fn execute(args: Args) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;
    apply_schema(&pool)
        .await
        .context("Failed to apply database schema")?;

    let store = PgAccountStore::new(pool);
    let admin = NewAdmin {
        username: args.username,
        email: args.email,
        password: args.password,
        update: args.update,
    };

    let outcome = provision_admin(&store, &PasswordHasher::default(), &admin).await?;
    println!("{}", outcome_message(&admin, outcome)?);
    Ok(())
}

fn outcome_message(admin: &NewAdmin, outcome: ProvisionOutcome) -> Result<String> {
    match outcome {
        ProvisionOutcome::Created(id) => Ok(format!(
            "Created admin user '{}' (id {id})",
            admin.username
        )),
        ProvisionOutcome::Updated(id) => Ok(format!(
            "Updated admin user '{}' (id {id})",
            admin.username
        )),
        ProvisionOutcome::Unchanged(_) => bail!(
            "User '{}' already exists. Use --update to reset the password.",
            admin.username
        ),
    }
}
