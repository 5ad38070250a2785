//! # Reflex Auth (login verification core)
//!
//! `reflex-auth` verifies login credentials, establishes sessions, and decides
//! where an authenticated caller is sent next.
//!
//! ## Credential verification
//!
//! A login identifier is either an email address or a username, matched
//! case-insensitively. Every attempt performs exactly one password hash
//! verification and one constant-time identifier comparison, whether or not an
//! account exists. Unknown identifiers are verified against a dummy hash built
//! at start-up with the same parameters as real accounts.
//!
//! Failures are never explained: an unknown identifier, a wrong password, a
//! malformed stored hash and a storage error all look the same to the caller.
//!
//! ## Redirects
//!
//! The `next` query parameter of a login is only honoured when it is a bare
//! same-origin path. Anything carrying a scheme or a network location falls
//! back to the configured default target.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
