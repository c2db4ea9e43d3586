//! Login, session and logout endpoints.

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::{AuthError, AuthService};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(
        content = String,
        description = "User name, a single newline, then the password",
        content_type = "text/plain"
    ),
    responses(
        (status = 200, description = "Login successful, session cookie set", body = SessionResponse),
        (status = 400, description = "Malformed login payload", body = ErrorResponse),
        (status = 401, description = "Credentials rejected", body = ErrorResponse),
        (status = 503, description = "Verification backend unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(service: Extension<Arc<AuthService>>, body: Bytes) -> impl IntoResponse {
    let mut headers = HeaderMap::new();

    match service.login(&body, &mut headers).await {
        Ok(creds) => {
            let response = SessionResponse {
                user: creds.user().to_string(),
            };
            (StatusCode::OK, headers, Json(response)).into_response()
        }
        Err(err) => {
            let status = match &err {
                AuthError::InvalidData(_) => StatusCode::BAD_REQUEST,
                AuthError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
                AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthError::Internal(inner) => {
                    error!("Login failed: {inner:#}");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            let response = ErrorResponse {
                error: err.kind().to_string(),
            };
            (status, Json(response)).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, service: Extension<Arc<AuthService>>) -> impl IntoResponse {
    // Missing, stale and forged cookies all look like "no session".
    match service.check_cookie(&headers) {
        Some(creds) => {
            let response = SessionResponse {
                user: creds.user().to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, service: Extension<Arc<AuthService>>) -> impl IntoResponse {
    let mut response_headers = HeaderMap::new();
    service.logout(&headers, &mut response_headers);
    (StatusCode::NO_CONTENT, response_headers).into_response()
}
