//! ProxyServer struct and main run loop.
//!
//! Binding is separate from serving so bind failures surface before any
//! request is accepted and so callers can learn the actual port when the
//! configured one is `0`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::context::ProxyContext;
use super::handler::handle_request;
use crate::config::ProxyConfig;
use crate::error::ServerError;

/// Pause after a failed `accept` (e.g. file descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

pub struct ProxyServer {
    config: Arc<ProxyConfig>,
    ctx: Arc<ProxyContext>,
}

impl ProxyServer {
    /// Validate `config` and prepare the shared request context.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let config = config.validated()?;
        let ctx = ProxyContext::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            ctx: Arc::new(ctx),
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Bind the listener. Fails if the address is unavailable.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let addr = SocketAddr::new(self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(BoundServer {
            listener,
            local_addr,
            server: self,
        })
    }

    /// Bind and serve until the task is dropped.
    pub async fn run(self) -> Result<(), ServerError> {
        self.bind().await?.run().await;
        Ok(())
    }
}

/// A server whose listener is bound but not yet accepting.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    server: ProxyServer,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &ProxyConfig {
        self.server.config()
    }

    /// Accept connections forever, one task per connection.
    pub async fn run(self) {
        let config = &self.server.config;
        info!(
            "Proxy started on http://{} (path: /{}/, target: {}, allow-origin: {}, allow-methods: {}, allow-headers: {})",
            self.local_addr,
            config.path_prefix,
            config.target_base_url,
            config.cors.allow_origin,
            config.cors.allow_methods,
            config.cors.allow_headers
        );
        match config.upstream_timeout_ms {
            Some(ms) => info!("Upstream timeout: {}ms", ms),
            None => debug!("No upstream timeout configured"),
        }

        loop {
            let (stream, remote_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!("Failed to accept connection: {}", err);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let ctx = Arc::clone(&self.server.ctx);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let ctx = Arc::clone(&ctx);
                    async move { handle_request(&ctx, req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}

/// Validate `config`, bind, and serve forever.
///
/// Only returns on a configuration or bind error.
pub async fn start(config: ProxyConfig) -> Result<(), ServerError> {
    ProxyServer::new(config)?.run().await
}
