//! System handlers: liveness and OpenAPI.

use crate::api::AppState;
use axum::{Json, extract::State, response::IntoResponse};

/// GET / - Liveness text
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service is up; body is the configured banner", content_type = "text/plain")
    )
)]
pub async fn liveness(State(state): State<AppState>) -> impl IntoResponse {
    state.config.server.banner.clone()
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
