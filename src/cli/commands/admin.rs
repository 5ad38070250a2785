//! Administrator arguments: the start-up seed and the `create-admin` subcommand.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const CMD_CREATE_ADMIN: &str = "create-admin";

pub const ARG_ADMIN_USER: &str = "admin-user";
pub const ARG_ADMIN_PASSWORD: &str = "admin-password";
pub const ARG_ADMIN_EMAIL: &str = "admin-email";

/// Administrator seeded on server start when it does not exist yet.
#[derive(Debug)]
pub struct Seed {
    pub username: String,
    pub password: SecretString,
    pub email: Option<String>,
}

impl Seed {
    /// Returns `None` when no seed user was configured.
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Option<Self> {
        let username = matches.get_one::<String>(ARG_ADMIN_USER)?;
        let password = matches.get_one::<String>(ARG_ADMIN_PASSWORD)?;
        Some(Self {
            username: username.clone(),
            password: SecretString::from(password.clone()),
            email: matches.get_one::<String>(ARG_ADMIN_EMAIL).cloned(),
        })
    }
}

#[derive(Debug)]
pub struct CreateOptions {
    pub username: String,
    pub password: SecretString,
    pub email: Option<String>,
    pub update: bool,
}

impl CreateOptions {
    /// # Errors
    /// Returns an error if a required positional argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let username = matches
            .get_one::<String>("username")
            .cloned()
            .context("missing required argument: <username>")?;
        let password = matches
            .get_one::<String>("password")
            .cloned()
            .context("missing required argument: <password>")?;
        Ok(Self {
            username,
            password: SecretString::from(password),
            email: matches.get_one::<String>("email").cloned(),
            update: matches.get_flag("update"),
        })
    }
}

#[must_use]
pub fn with_seed_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_USER)
                .long(ARG_ADMIN_USER)
                .help("Administrator username created on start if missing")
                .env("REFLEX_ADMIN_USER")
                .requires(ARG_ADMIN_PASSWORD),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long(ARG_ADMIN_PASSWORD)
                .help("Password for the seeded administrator")
                .env("REFLEX_ADMIN_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_ADMIN_USER),
        )
        .arg(
            Arg::new(ARG_ADMIN_EMAIL)
                .long(ARG_ADMIN_EMAIL)
                .help("Email for the seeded administrator")
                .env("REFLEX_ADMIN_EMAIL")
                .requires(ARG_ADMIN_USER),
        )
}

#[must_use]
pub fn create_admin() -> Command {
    Command::new(CMD_CREATE_ADMIN)
        .about("Create or update an administrator account")
        .arg(
            Arg::new("username")
                .help("Administrator username")
                .required(true),
        )
        .arg(
            Arg::new("password")
                .help("Administrator password")
                .required(true),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .help("Optional email address for the account"),
        )
        .arg(
            Arg::new("update")
                .long("update")
                .help("Reset the password and promote to admin if the user exists")
                .action(ArgAction::SetTrue),
        )
}
