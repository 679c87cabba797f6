use std::time::Duration;

use super::client::{create_http_client, HttpClient};
use super::cors::CorsHeaders;
use super::rewrite::RoutePrefix;
use crate::config::ProxyConfig;
use crate::error::ServerError;

/// Read-only state shared by every request handler.
pub struct ProxyContext {
    pub http_client: HttpClient,
    pub cors: CorsHeaders,
    pub route: RoutePrefix,
    pub target_base_url: String,
    pub upstream_timeout: Option<Duration>,
}

impl ProxyContext {
    /// `config` must already be validated.
    pub fn new(config: &ProxyConfig) -> Result<Self, ServerError> {
        Ok(Self {
            http_client: create_http_client()?,
            cors: CorsHeaders::from_config(&config.cors)?,
            route: RoutePrefix::new(&config.path_prefix),
            target_base_url: config.target_base_url.clone(),
            upstream_timeout: config.upstream_timeout_ms.map(Duration::from_millis),
        })
    }
}
