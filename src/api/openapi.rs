use super::handlers::{health, session};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        session::login,
        session::session,
        session::logout,
    ),
    components(schemas(health::Health, session::SessionResponse, session::ErrorResponse)),
    tags(
        (name = "auth", description = "Password login and session cookies"),
        (name = "health", description = "Service status")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
