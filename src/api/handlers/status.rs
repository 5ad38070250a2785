use axum::{Json, response::IntoResponse};

use super::types::StatusResponse;

#[utoipa::path(
    get,
    path = "/auth/status",
    responses(
        (status = 200, description = "Auth routes are mounted", body = StatusResponse)
    ),
    tag = "auth"
)]
pub async fn status() -> impl IntoResponse {
    Json(StatusResponse {
        status: "auth-ready".to_string(),
    })
}
