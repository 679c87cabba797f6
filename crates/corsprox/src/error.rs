//! Error types shared by the configuration resolver and the proxy server.

use std::net::SocketAddr;

/// Rejected configuration. Raised before the server binds.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    ParseFile {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Missing target URL (use --target or 'target_base_url' in the config file)")]
    MissingTarget,
    #[error("Invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },
    #[error("Path prefix must not be empty")]
    EmptyPath,
    #[error("Invalid path prefix '{0}': must not contain '?', '#' or whitespace")]
    InvalidPath(String),
    #[error("Invalid value for {name}: '{value}' is not a valid header value")]
    InvalidHeaderValue { name: &'static str, value: String },
}

/// Fatal server errors. Request-level failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to build TLS client configuration: {0}")]
    Tls(#[from] rustls::Error),
}
