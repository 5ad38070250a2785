//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an action: the HTTP server by default, or
//! the `create-admin` subcommand.

use crate::cli::actions::{Action, create_admin, server};
use crate::cli::commands::{ARG_DSN, ARG_PORT, admin, auth};
use anyhow::{Context, Result};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches(admin::CMD_CREATE_ADMIN) {
        let dsn = sub
            .get_one::<String>(ARG_DSN)
            .cloned()
            .context("missing required argument: --dsn")?;
        let options = admin::CreateOptions::parse(sub)?;

        return Ok(Action::CreateAdmin(create_admin::Args {
            dsn,
            username: options.username,
            password: options.password,
            email: options.email,
            update: options.update,
        }));
    }

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>(ARG_DSN).cloned();
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(server::Args {
        port,
        dsn,
        default_redirect: auth_opts.default_redirect,
        failure_delay_ms: auth_opts.failure_delay_ms,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        cookie_secure: auth_opts.cookie_secure,
        admin_seed: admin::Seed::parse(matches),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn with_cleared_env<F: FnOnce() -> R, R>(f: F) -> R {
        temp_env::with_vars(
            [
                ("REFLEX_DSN", None::<&str>),
                ("REFLEX_ADMIN_USER", None::<&str>),
                ("REFLEX_ADMIN_PASSWORD", None::<&str>),
                ("REFLEX_ADMIN_EMAIL", None::<&str>),
            ],
            f,
        )
    }

    #[test]
    fn server_action_from_env() {
        with_cleared_env(|| {
            temp_env::with_vars(
                [
                    ("REFLEX_ADMIN_USER", Some("root")),
                    ("REFLEX_ADMIN_PASSWORD", Some("s3cret")),
                    ("REFLEX_DEFAULT_REDIRECT", Some("/scenarios")),
                ],
                || {
                    let matches = crate::cli::commands::new().get_matches_from(vec!["reflex-auth"]);
                    let action = handler(&matches);
                    let Ok(Action::Server(args)) = action else {
                        panic!("expected server action");
                    };
                    assert!(args.dsn.is_none());
                    assert_eq!(args.default_redirect, "/scenarios");
                    let Some(seed) = args.admin_seed else {
                        panic!("expected admin seed");
                    };
                    assert_eq!(seed.username, "root");
                    assert_eq!(seed.password.expose_secret(), "s3cret");
                    assert!(seed.email.is_none());
                },
            );
        });
    }

    #[test]
    fn create_admin_requires_dsn() {
        with_cleared_env(|| {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "reflex-auth",
                "create-admin",
                "root",
                "s3cret",
            ]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err.to_string().contains("missing required argument: --dsn"));
            }
        });
    }

    #[test]
    fn create_admin_action() {
        with_cleared_env(|| {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "reflex-auth",
                "--dsn",
                "postgres://localhost/reflex",
                "create-admin",
                "root",
                "s3cret",
                "--update",
            ]);
            let action = handler(&matches);
            let Ok(Action::CreateAdmin(args)) = action else {
                panic!("expected create-admin action");
            };
            assert_eq!(args.dsn, "postgres://localhost/reflex");
            assert_eq!(args.username, "root");
            assert!(args.update);
            assert!(args.email.is_none());
        });
    }
}
