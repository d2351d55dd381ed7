//! Configuration types for export-courier

use crate::error::{Error, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    time::Duration,
};

/// Prefix for environment variables read by [`Config::load`]
pub const ENV_PREFIX: &str = "EXPORT_COURIER_";

/// Main configuration for the export server
///
/// All fields have sensible defaults, so an empty file (or no file at all) is a
/// valid configuration.
///
/// # Example TOML
///
/// ```toml
/// resources = "./public"
/// cors = "https://app.example.com"
///
/// [server]
/// http_port = 8080
/// find_next_http_port = true
/// timeout = 300000
///
/// [server.https]
/// enabled = false
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Cross-origin policy (accepts `"false"`, an origin string, or a table)
    #[serde(default)]
    pub cors: CorsConfig,

    /// Directory served under `/resources` (not mounted when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<PathBuf>,

    /// Ephemeral artifact store settings
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// External generation pipeline
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Listener configuration shared by the plaintext and encrypted listeners
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address both listeners bind to (default: 0.0.0.0)
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,

    /// Preferred plaintext port (default: 8080, overridden by `PORT`)
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Try the next port up when the plaintext port is taken (default: false)
    #[serde(default)]
    pub find_next_http_port: bool,

    /// Upper bound on ports tried by the plaintext port search (default: 100)
    #[serde(default = "default_max_port_attempts")]
    pub max_port_attempts: u16,

    /// Per-request timeout applied on every listener, in milliseconds (default: 5 minutes)
    #[serde(default = "default_timeout", with = "duration_ms_serde")]
    pub timeout: Duration,

    /// Request body size cap in bytes (default: 50 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Dedicated mode: `POST /` is not mounted (default: false)
    #[serde(default)]
    pub dedicated: bool,

    /// Text returned by the liveness endpoint
    #[serde(default = "default_banner")]
    pub banner: String,

    /// Mount Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,

    /// Encrypted listener
    #[serde(default)]
    pub https: HttpsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            http_port: default_http_port(),
            find_next_http_port: false,
            max_port_attempts: default_max_port_attempts(),
            timeout: default_timeout(),
            max_body_bytes: default_max_body_bytes(),
            dedicated: false,
            banner: default_banner(),
            swagger_ui: false,
            https: HttpsConfig::default(),
        }
    }
}

/// Encrypted listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpsConfig {
    /// Construct the encrypted listener at all (default: true)
    ///
    /// Once enabled, missing or unreadable certificate material is fatal.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Port for the encrypted listener (default: 8443, no port search)
    #[serde(default = "default_https_port")]
    pub port: u16,

    /// Directory holding `server.key` and `server.crt` (default: "cert")
    #[serde(default = "default_cert_dir")]
    pub cert_dir: PathBuf,
}

impl Default for HttpsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_https_port(),
            cert_dir: default_cert_dir(),
        }
    }
}

/// Cross-origin configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CorsConfig {
    /// Attach CORS headers to every response (default: true)
    pub enabled: bool,

    /// Value of `Access-Control-Allow-Origin` (default: "*")
    pub origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: default_cors_origin(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CorsRepr {
    Toggle(bool),
    Origin(String),
    Table {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default = "default_cors_origin")]
        origin: String,
    },
}

impl<'de> Deserialize<'de> for CorsConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let config = match CorsRepr::deserialize(deserializer)? {
            CorsRepr::Toggle(enabled) => Self {
                enabled,
                origin: default_cors_origin(),
            },
            CorsRepr::Origin(origin) if origin == "false" => Self {
                enabled: false,
                origin: default_cors_origin(),
            },
            CorsRepr::Origin(origin) if origin.is_empty() => Self::default(),
            CorsRepr::Origin(origin) => Self {
                enabled: true,
                origin,
            },
            CorsRepr::Table { enabled, origin } => Self { enabled, origin },
        };
        Ok(config)
    }
}

/// Ephemeral artifact store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// How long an artifact stays retrievable, in milliseconds (default: 10 seconds)
    #[serde(default = "default_artifact_ttl", with = "duration_ms_serde")]
    pub ttl: Duration,

    /// Length of generated keys (default: 21)
    #[serde(default = "default_key_length")]
    pub key_length: usize,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            ttl: default_artifact_ttl(),
            key_length: default_key_length(),
        }
    }
}

/// External generation pipeline configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Command that produces the export (request JSON on stdin, file on stdout)
    ///
    /// A bare name is resolved through `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<PathBuf>,

    /// Extra arguments passed to the command
    #[serde(default)]
    pub args: Vec<String>,
}

impl Config {
    /// Load configuration from an optional TOML file plus `EXPORT_COURIER_*` variables.
    ///
    /// Nested keys use `__` in variable names (`EXPORT_COURIER_SERVER__HTTP_PORT`).
    /// `PORT` is applied last, then the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = path {
            if path.exists() {
                tracing::info!(config_path = %path.display(), "Loading configuration from file");
                figment = figment.merge(Toml::file(path));
            } else {
                tracing::debug!(config_path = %path.display(), "No config file found");
            }
        }

        let mut config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
            .extract()
            .map_err(|e| Error::Config {
                key: (!e.path.is_empty()).then(|| e.path.join(".")),
                message: e.to_string(),
            })?;

        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply process-level overrides (currently `PORT` for the plaintext listener)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.http_port = port.trim().parse().map_err(|_| Error::Config {
                message: format!("PORT must be a port number, got {port:?}"),
                key: Some("PORT".into()),
            })?;
        }
        Ok(())
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.artifacts.ttl.is_zero() {
            return Err(Error::Config {
                message: "artifact ttl must be greater than zero".into(),
                key: Some("artifacts.ttl".into()),
            });
        }

        if self.artifacts.key_length < 16 {
            return Err(Error::Config {
                message: "artifact keys must be at least 16 characters".into(),
                key: Some("artifacts.key_length".into()),
            });
        }

        if self.server.max_port_attempts == 0 {
            return Err(Error::Config {
                message: "max_port_attempts must be at least 1".into(),
                key: Some("server.max_port_attempts".into()),
            });
        }

        if self.server.timeout.is_zero() {
            return Err(Error::Config {
                message: "timeout must be greater than zero".into(),
                key: Some("server.timeout".into()),
            });
        }

        if self.cors.enabled
            && self.cors.origin != "*"
            && axum::http::HeaderValue::from_str(&self.cors.origin).is_err()
        {
            return Err(Error::Config {
                message: format!("invalid CORS origin {:?}", self.cors.origin),
                key: Some("cors.origin".into()),
            });
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_bind_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_http_port() -> u16 {
    8080
}

fn default_https_port() -> u16 {
    8443
}

fn default_max_port_attempts() -> u16 {
    100
}

fn default_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_banner() -> String {
    "Export server".into()
}

fn default_cert_dir() -> PathBuf {
    PathBuf::from("cert")
}

fn default_cors_origin() -> String {
    "*".into()
}

fn default_artifact_ttl() -> Duration {
    Duration::from_secs(10)
}

fn default_key_length() -> usize {
    21
}

// Durations are configured in milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
