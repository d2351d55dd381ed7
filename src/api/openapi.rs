//! OpenAPI documentation and schema generation
//!
//! Compile-time spec generation with utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the export-courier HTTP API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "export-courier HTTP API",
        version = "0.1.0",
        description = "Accepts export requests, delegates generation, and delivers the result inline or through one-time download links",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Export
        crate::api::routes::submit_export,

        // Artifacts
        crate::api::routes::download_artifact,

        // System
        crate::api::routes::liveness,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::ExportOptions,
        crate::types::ExportLink,
        crate::types::ExportFailureBody,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "export", description = "Export submission - Generate a file and receive it inline or as a link"),
        (name = "artifacts", description = "Artifacts - Download a generated file exactly once"),
        (name = "system", description = "System endpoints - Liveness text and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
