//! Session cookie helpers plus the logout and session lookup endpoints.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, InvalidHeaderValue, LOCATION, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use super::types::SessionResponse;
use crate::auth::{AccountId, AuthConfig, AuthState, StoreError};

pub(crate) const SESSION_COOKIE_NAME: &str = "reflex_session";

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    // Missing cookies are treated as "no session" to avoid leaking auth state.
    let account_id = match current_account_id(&headers, &auth_state).await {
        Ok(Some(account_id)) => account_id,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match auth_state.verifier().accounts().find_by_id(account_id).await {
        Ok(Some(account)) => {
            let response = SessionResponse {
                account_id: account.id.to_string(),
                username: account.username,
                is_admin: account.is_admin,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        // The account was removed while the session was still alive.
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to load session account: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 303, description = "Session cleared, redirect to the landing page")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    if let Some(token) = extract_session_token(&headers)
        && let Err(err) = auth_state.sessions().terminate_session(&token).await
    {
        error!("Failed to delete session: {err}");
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = see_other(auth_state.config().default_target(), "/");
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::SEE_OTHER, response_headers).into_response()
}

/// Resolve the session cookie on a request into the account it belongs to.
///
/// Returns `Ok(None)` when the cookie is missing, unknown or expired.
pub(crate) async fn current_account_id(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<Option<AccountId>, StoreError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    auth_state.sessions().resolve_session(&token).await
}

/// Build an `HttpOnly` cookie for the session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl().as_secs();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    // Only mark cookies secure when the app is served over HTTPS.
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

/// Headers for a `303 See Other` to `target`, or to `fallback` when `target`
/// is not a valid header value.
pub(crate) fn see_other(target: &str, fallback: &str) -> HeaderMap {
    let location = HeaderValue::from_str(target)
        .or_else(|_| HeaderValue::from_str(fallback))
        .unwrap_or_else(|_| HeaderValue::from_static("/"));
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, location);
    headers
}
