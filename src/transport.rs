//! Listener bootstrap
//!
//! Serves one router over a plaintext listener and, when enabled, a TLS
//! listener on its own port. Each listener gets its own request timeout and
//! tags requests with a [`ListenerInfo`] extension so handlers can tell which
//! scheme a request arrived on.
//!
//! Only the plaintext listener searches for a free port. The encrypted listener
//! binds exactly the configured port or fails.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use axum::{Extension, Router};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

/// File name of the PEM certificate chain inside the certificate directory
pub const CERT_FILE: &str = "server.crt";

/// File name of the PEM private key inside the certificate directory
pub const KEY_FILE: &str = "server.key";

/// How long in-flight TLS connections may drain after shutdown is requested
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// URL scheme a listener serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plaintext HTTP
    Http,
    /// HTTP over TLS
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        })
    }
}

/// Which listener accepted a request
///
/// Inserted as a request extension by every listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerInfo {
    /// Scheme of the listener
    pub scheme: Scheme,
    /// Port the listener is actually bound to
    pub port: u16,
}

/// Bind the plaintext listener, optionally walking upward from `preferred`
///
/// With `search` enabled, a port that is already in use is skipped and the
/// next one tried, up to `max_attempts` ports in total. Any other bind error
/// fails immediately.
pub async fn bind_plaintext(
    host: IpAddr,
    preferred: u16,
    search: bool,
    max_attempts: u16,
) -> Result<TcpListener> {
    let mut tried = 0u16;
    let mut port = Some(preferred);

    while let Some(candidate) = port {
        if tried >= max_attempts {
            break;
        }
        tried += 1;

        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => {
                if candidate != preferred {
                    tracing::info!(preferred, port = candidate, "Preferred port in use, using next free port");
                }
                return Ok(listener);
            }
            Err(e) if search && e.kind() == io::ErrorKind::AddrInUse => {
                tracing::debug!(port = candidate, "Port in use, trying next");
                port = candidate.checked_add(1);
            }
            Err(e) => return Err(Error::Bind { port: candidate, source: e }),
        }
    }

    Err(Error::PortSearchExhausted {
        start: preferred,
        attempts: tried,
    })
}

/// Load `server.crt` and `server.key` from `cert_dir`
pub async fn load_certificates(cert_dir: &Path) -> Result<RustlsConfig> {
    RustlsConfig::from_pem_file(cert_dir.join(CERT_FILE), cert_dir.join(KEY_FILE))
        .await
        .map_err(|source| Error::Certificate {
            path: cert_dir.to_path_buf(),
            source,
        })
}

/// Starts listeners serving a shared router
pub struct Transport {
    router: Router,
    server: ServerConfig,
    shutdown: CancellationToken,
}

impl Transport {
    /// Create a transport for `router` configured by `server`
    pub fn new(router: Router, server: ServerConfig) -> Self {
        Self {
            router,
            server,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops every listener started by this transport when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn listener_router(&self, info: ListenerInfo) -> Router {
        self.router
            .clone()
            .layer(TimeoutLayer::new(self.server.timeout))
            .layer(Extension(info))
    }

    /// Bind and serve the plaintext listener
    pub async fn start_plaintext(&self) -> Result<BoundListener> {
        let listener = bind_plaintext(
            self.server.bind_host,
            self.server.http_port,
            self.server.find_next_http_port,
            self.server.max_port_attempts,
        )
        .await?;
        let addr = listener.local_addr()?;
        let info = ListenerInfo {
            scheme: Scheme::Http,
            port: addr.port(),
        };

        let app = self.listener_router(info);
        let token = self.shutdown.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        });

        tracing::info!(port = addr.port(), "HTTP server started");
        Ok(BoundListener::new(info, addr, task))
    }

    /// Load certificates, then bind and serve the TLS listener
    pub async fn start_encrypted(&self) -> Result<BoundListener> {
        let tls = load_certificates(&self.server.https.cert_dir).await?;
        self.serve_encrypted(tls)
    }

    /// Bind and serve the TLS listener with certificates already loaded
    fn serve_encrypted(&self, tls: RustlsConfig) -> Result<BoundListener> {
        let https = &self.server.https;
        let listener = std::net::TcpListener::bind((self.server.bind_host, https.port))
            .map_err(|source| Error::Bind {
                port: https.port,
                source,
            })?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let info = ListenerInfo {
            scheme: Scheme::Https,
            port: addr.port(),
        };

        let app = self.listener_router(info);
        let token = self.shutdown.clone();
        let handle = Handle::new();
        let server = axum_server::from_tcp_rustls(listener, tls)
            .handle(handle.clone())
            .serve(app.into_make_service());

        let task = tokio::spawn(async move {
            tokio::pin!(server);
            tokio::select! {
                result = &mut server => result,
                () = token.cancelled() => {
                    handle.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
                    server.await
                }
            }
        });

        tracing::info!(port = addr.port(), "HTTPS server started");
        Ok(BoundListener::new(info, addr, task))
    }

    /// Start the plaintext listener and, if enabled, the encrypted one
    ///
    /// Certificates are loaded before either port is bound, so a bad
    /// certificate directory leaves nothing listening. After that startup
    /// still fails as a whole: if either bind fails, the other listener is torn
    /// down before the error is returned.
    pub async fn start_all(&self) -> Result<RunningTransport> {
        let tls = if self.server.https.enabled {
            Some(load_certificates(&self.server.https.cert_dir).await?)
        } else {
            tracing::debug!("HTTPS listener disabled");
            None
        };

        let encrypted = async { tls.map(|tls| self.serve_encrypted(tls)).transpose() };
        let (http, https) = tokio::try_join!(self.start_plaintext(), encrypted)?;

        Ok(RunningTransport {
            http,
            https,
            shutdown: self.shutdown.clone(),
        })
    }
}

/// A listener that is accepting connections
///
/// Dropping it without calling [`BoundListener::join`] aborts the server task.
pub struct BoundListener {
    info: ListenerInfo,
    addr: SocketAddr,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl BoundListener {
    fn new(info: ListenerInfo, addr: SocketAddr, task: JoinHandle<io::Result<()>>) -> Self {
        Self {
            info,
            addr,
            task: Some(task),
        }
    }

    /// Scheme and bound port
    pub fn info(&self) -> ListenerInfo {
        self.info
    }

    /// Local address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server task to finish
    pub async fn join(mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(Ok(())) => {
                tracing::info!(scheme = %self.info.scheme, port = self.info.port, "Listener stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Server(format!("{} listener failed: {e}", self.info.scheme))),
            Err(e) => Err(Error::Server(format!("{} listener task failed: {e}", self.info.scheme))),
        }
    }
}

impl Drop for BoundListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Every listener started by [`Transport::start_all`]
pub struct RunningTransport {
    http: BoundListener,
    https: Option<BoundListener>,
    shutdown: CancellationToken,
}

impl RunningTransport {
    /// Address of the plaintext listener
    pub fn http_addr(&self) -> SocketAddr {
        self.http.local_addr()
    }

    /// Address of the encrypted listener, if it was started
    pub fn https_addr(&self) -> Option<SocketAddr> {
        self.https.as_ref().map(BoundListener::local_addr)
    }

    /// Token that stops every listener when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ask every listener to stop accepting and drain
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait until every listener has stopped
    pub async fn wait(self) -> Result<()> {
        let RunningTransport { http, https, .. } = self;
        let encrypted = async {
            match https {
                Some(listener) => listener.join().await,
                None => Ok(()),
            }
        };
        let (http, https) = tokio::join!(http.join(), encrypted);
        http.and(https)
    }
}
