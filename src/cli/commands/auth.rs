use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_DEFAULT_REDIRECT: &str = "default-redirect";
pub const ARG_FAILURE_DELAY_MS: &str = "failure-delay-ms";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug)]
pub struct Options {
    pub default_redirect: String,
    pub failure_delay_ms: u64,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            default_redirect: matches
                .get_one::<String>(ARG_DEFAULT_REDIRECT)
                .cloned()
                .context("missing required argument: --default-redirect")?,
            failure_delay_ms: matches
                .get_one::<u64>(ARG_FAILURE_DELAY_MS)
                .copied()
                .context("missing required argument: --failure-delay-ms")?,
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DEFAULT_REDIRECT)
                .long(ARG_DEFAULT_REDIRECT)
                .help("Landing path after login when `next` is missing or unsafe")
                .env("REFLEX_DEFAULT_REDIRECT")
                .default_value("/"),
        )
        .arg(
            Arg::new(ARG_FAILURE_DELAY_MS)
                .long(ARG_FAILURE_DELAY_MS)
                .help("Fixed delay before answering a rejected login, in milliseconds")
                .env("REFLEX_FAILURE_DELAY_MS")
                .default_value("500")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("REFLEX_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie `Secure` (serve over HTTPS)")
                .env("REFLEX_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}
