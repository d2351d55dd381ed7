//! HTTP surface
//!
//! One router serves both listeners. Per-listener details (scheme, port,
//! timeout) are layered on by [`crate::transport`], not here.

use crate::config::{Config, CorsConfig};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{
    ServiceBuilderExt,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::MakeRequestUuid,
    set_header::SetResponseHeaderLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod extract;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

const ALLOWED_REQUEST_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";

/// Create the router shared by the plaintext and encrypted listeners
///
/// # Routes
///
/// - `GET /` - Liveness text
/// - `POST /` - Submit an export (404 in dedicated mode)
/// - `GET /:key` and `GET /:key/` - One-time artifact download
/// - `HEAD /:key` and `HEAD /:key/` - Artifact check that leaves it in place
/// - `GET /resources/*` - Static files (only when `resources` is configured)
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Swagger UI (if enabled)
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let root = if config.server.dedicated {
        tracing::info!("Dedicated mode: POST / is not mounted");
        get(routes::liveness).fallback(not_mounted)
    } else {
        get(routes::liveness).post(routes::submit_export)
    };

    let router = Router::new()
        .route("/", root)
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/:key", get(routes::download_artifact).head(routes::check_artifact))
        .route("/:key/", get(routes::download_artifact).head(routes::check_artifact));

    let router = match &config.resources {
        Some(dir) => router.nest_service("/resources", ServeDir::new(dir)),
        None => router,
    };

    let router = if config.server.swagger_ui {
        router.merge(
            SwaggerUi::new("/swagger-ui").url("/swagger-ui/openapi.json", ApiDoc::openapi()),
        )
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid)
                .propagate_x_request_id(),
        );

    with_cors(router, &config)
}

/// Methods other than GET on `/` in dedicated mode look unrouted, not disallowed
async fn not_mounted() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn with_cors(router: Router, config: &Config) -> Router {
    if config.cors.enabled {
        tracing::info!(origin = %config.cors.origin, "Access-Control-Allow-Origin");
        // CorsLayer only lists allowed headers on preflights
        router
            .layer(build_cors_layer(&config.cors))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_REQUEST_HEADERS),
            ))
    } else {
        router
    }
}

/// Build a CORS layer for the configured origin
///
/// Every response carries `Access-Control-Allow-Origin`; preflights answer
/// with the allowed methods and request headers.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_origin = if cors.origin == "*" {
        AllowOrigin::from(Any)
    } else {
        match HeaderValue::from_str(&cors.origin) {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(_) => {
                tracing::warn!(origin = %cors.origin, "Invalid CORS origin, allowing any origin");
                AllowOrigin::from(Any)
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
