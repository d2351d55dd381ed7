//! Request and response types for the export API

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Typed view of the fields the service itself reads from an export request
///
/// The full request object is passed to the pipeline untouched (apart from
/// `html` normalization); these are only the fields that steer delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Content subtype of the produced file (`pdf`, `png`, ...)
    pub file_format: String,

    /// Base name of the downloaded file, without extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Exported range, used for the default file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Value>,

    /// Return the bytes inline instead of a download link
    #[serde(default, deserialize_with = "lenient_bool")]
    pub send_as_binary: bool,
}

impl ExportOptions {
    /// Options for `file_format` with every optional field unset
    pub fn new(file_format: impl Into<String>) -> Self {
        Self {
            file_format: file_format.into(),
            file_name: None,
            range: None,
            send_as_binary: false,
        }
    }

    /// Name offered for download: `<fileName>.<fileFormat>`, or
    /// `export-<range>.<fileFormat>` when no name was given.
    pub fn download_name(&self) -> String {
        let stem = match (&self.file_name, &self.range) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(Value::String(range))) if !range.is_empty() => format!("export-{range}"),
            (_, Some(Value::String(_) | Value::Null)) | (_, None) => "export".to_string(),
            (_, Some(range)) => format!("export-{range}"),
        };
        format!("{stem}.{}", self.file_format)
    }
}

/// One normalized export request as handed to the pipeline
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Correlation id assigned to the HTTP request
    pub request_id: String,
    /// The request object, with `html` decoded if it arrived as a JSON string
    pub payload: Value,
    /// Delivery options read from the payload
    pub options: ExportOptions,
}

/// Successful link delivery: `{"success": true, "url": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportLink {
    /// Always `true`
    pub success: bool,
    /// One-time download URL
    pub url: String,
}

/// Failed export: `{"success": false, "msg": ..., "stack": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportFailureBody {
    /// Always `false`
    pub success: bool,
    /// Failure message
    pub msg: String,
    /// Diagnostic trace
    pub stack: String,
}

/// Query parameters accepted by `POST /`
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// JSONP callback name; wraps the JSON envelope when present
    pub callback: Option<String>,
}

/// Accepts `true`/`false`, `"true"`/`"false"`, `1`/`0` and `null`
///
/// Form-encoded requests deliver every field as a string.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(value) => Ok(value),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            other => Err(D::Error::custom(format!(
                "sendAsBinary must be a boolean, got {other:?}"
            ))),
        },
        other => Err(D::Error::custom(format!(
            "sendAsBinary must be a boolean, got {other}"
        ))),
    }
}
