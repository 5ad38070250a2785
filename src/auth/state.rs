//! Auth state and configuration.

use std::sync::Arc;
use std::time::Duration;

use super::{session::SessionStore, verifier::CredentialVerifier};

const DEFAULT_TARGET: &str = "/";
const DEFAULT_FAILURE_DELAY_MS: u64 = 500;
const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    default_target: String,
    failure_delay: Duration,
    session_ttl: Duration,
    cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_target: DEFAULT_TARGET.to_string(),
            failure_delay: Duration::from_millis(DEFAULT_FAILURE_DELAY_MS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_default_target(mut self, target: String) -> Self {
        self.default_target = target;
        self
    }

    #[must_use]
    pub fn with_failure_delay(mut self, delay: Duration) -> Self {
        self.failure_delay = delay;
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Where callers land when `next` is missing or unsafe.
    #[must_use]
    pub fn default_target(&self) -> &str {
        &self.default_target
    }

    /// Fixed delay applied to every rejected login at the HTTP boundary.
    #[must_use]
    pub fn failure_delay(&self) -> Duration {
        self.failure_delay
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, read-only state handed to the HTTP handlers.
pub struct AuthState {
    config: AuthConfig,
    verifier: CredentialVerifier,
    sessions: Arc<dyn SessionStore>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        verifier: CredentialVerifier,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            verifier,
            sessions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}
