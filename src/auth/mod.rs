//! Login verification, session stores, and redirect sanitizing.
//!
//! ## Verification
//!
//! [`CredentialVerifier::authenticate`] is a pure decision over the supplied
//! identifier and password plus a read-only account lookup. It never creates a
//! session; callers do that through a [`SessionStore`] once the result is
//! [`AuthResult::Authenticated`].
//!
//! ## Storage
//!
//! Accounts and sessions are reached through traits so the verifier does not
//! care where they live. Postgres implementations back the server when a DSN
//! is configured; in-memory implementations cover development and tests.

mod account;
mod compare;
mod error;
pub mod hash;
mod memory;
pub mod provision;
pub mod redirect;
pub mod session;
mod state;
pub mod storage;
mod verifier;

pub use account::{Account, AccountId, AccountLookup, AccountStore, NewAdmin, ProvisionOutcome};
pub use compare::constant_time_eq_str;
pub use error::StoreError;
pub use hash::{DummyHash, PasswordHasher, hash_password, verify_hash};
pub use memory::{MemoryAccountStore, MemorySessionStore};
pub use redirect::resolve_post_login_target;
pub use session::{SessionStore, SessionToken};
pub use state::{AuthConfig, AuthState};
pub use verifier::{AuthResult, CredentialVerifier, normalize_identifier};
