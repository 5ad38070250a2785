//! Form login endpoint.

use axum::{
    Form, Json,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use super::{
    session::{current_account_id, see_other, session_cookie},
    types::LoginError,
};
use crate::auth::{AuthResult, AuthState, resolve_post_login_target};

/// The only message a rejected caller ever sees.
pub(crate) const LOGIN_FAILED_MESSAGE: &str = "Invalid email or password.";

#[derive(Deserialize, ToSchema)]
pub struct LoginForm {
    /// Email address or username, matched case-insensitively.
    #[serde(default, alias = "email")]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("identifier", &self.identifier)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Same-origin path to land on after a successful login.
    pub next: Option<String>,
}

#[utoipa::path(
    post,
    path = "/login",
    params(LoginQuery),
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in (or already logged in), redirect to target"),
        (status = 401, description = "Invalid email or password", body = LoginError),
        (status = 500, description = "Session could not be established")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> Response {
    let config = auth_state.config();

    match current_account_id(&headers, &auth_state).await {
        Ok(Some(_)) => {
            return (
                StatusCode::SEE_OTHER,
                see_other(config.default_target(), "/"),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(err) => warn!("Failed to resolve existing session: {err}"),
    }

    let LoginForm {
        identifier,
        password,
    } = form;
    let password = SecretString::from(password);

    let AuthResult::Authenticated(account_id) = auth_state
        .verifier()
        .authenticate(&identifier, &password)
        .await
    else {
        sleep(config.failure_delay()).await;
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginError {
                error: LOGIN_FAILED_MESSAGE.to_string(),
            }),
        )
            .into_response();
    };

    let token = match auth_state
        .sessions()
        .establish_session(account_id, config.session_ttl())
        .await
    {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to establish session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cookie = match session_cookie(config, token.expose_secret()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let target = resolve_post_login_target(query.next.as_deref(), config.default_target());
    info!(account_id, "login succeeded");

    let mut response_headers = see_other(&target, config.default_target());
    response_headers.insert(SET_COOKIE, cookie);
    (StatusCode::SEE_OTHER, response_headers).into_response()
}
