//! Request body extraction for `POST /`

use crate::error::Error;
use axum::{
    Form, Json, async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// An export request body, decoded from JSON or a url-encoded form
///
/// Form fields all arrive as strings; the lifecycle controller reads them
/// leniently. Anything that is not a form is parsed as JSON, so a missing
/// or wrong content type is rejected by the JSON extractor.
#[derive(Debug, Clone)]
pub struct ExportPayload(pub Value);

#[async_trait]
impl<S> FromRequest<S> for ExportPayload
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(rejected)?;
            let object: Map<String, Value> = fields
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect();
            return Ok(Self(Value::Object(object)));
        }

        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(rejected)?;
        Ok(Self(value))
    }
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| {
            content_type
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
}

fn rejected(rejection: impl IntoResponse + std::fmt::Display) -> Error {
    let message = rejection.to_string();
    let status = rejection.into_response().status().as_u16();
    Error::PayloadRejected { status, message }
}
