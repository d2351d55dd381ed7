//! Test configuration helpers

use export_courier::Config;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Loopback-only configuration on OS-assigned ports, encrypted listener off
pub fn local_config() -> Config {
    let mut config = Config::default();
    config.server.bind_host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.server.http_port = 0;
    config.server.https.enabled = false;
    config.server.https.port = 0;
    config
}

/// Like [`local_config`], with the encrypted listener using the fixture certificate
pub fn local_tls_config() -> Config {
    let mut config = local_config();
    config.server.https.enabled = true;
    config.server.https.cert_dir = fixture_cert_dir();
    config
}

/// Directory holding the self-signed `server.crt` / `server.key` pair
pub fn fixture_cert_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cert")
}
