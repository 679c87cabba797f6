//! Outbound HTTP client.
//!
//! One client is created per server and shared by every request. Idle
//! upstream connections are not kept: each forwarded request opens its own.

use std::sync::Arc;

use hyper_rustls::{ConfigBuilderExt, HttpsConnector};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use super::Body;
use crate::error::ServerError;

/// Type alias for the HTTP client used by the proxy.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Create the upstream client. Speaks both `http://` and `https://`.
pub fn create_http_client() -> Result<HttpClient, ServerError> {
    let mut http_connector = HttpConnector::new();
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS

    let tls_config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_webpki_roots()
    .with_no_client_auth();

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    let http_client = Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(0)
        .build(https_connector);

    debug!("Upstream client configured (HTTP/1.1, no idle pooling)");

    Ok(http_client)
}
