//! Configuration types for corsprox.
//!
//! A [`ProxyConfig`] is resolved once at startup (file, then CLI/env
//! overrides, then validation) and is read-only for the lifetime of the
//! server.

mod cors;

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use hyper::header::HeaderValue;
use hyper::Uri;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use cors::CorsConfig;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interface to listen on
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// First path segment(s) identifying proxied traffic, stored without slashes
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Absolute upstream base URL, stored without a trailing slash
    #[serde(default)]
    pub target_base_url: String,

    #[serde(default)]
    pub cors: CorsConfig,

    /// Upper bound on a single upstream call. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_timeout_ms: Option<u64>,
}

fn default_port() -> u16 {
    3001
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_path_prefix() -> String {
    "proxy".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            path_prefix: default_path_prefix(),
            target_base_url: String::new(),
            cors: CorsConfig::default(),
            upstream_timeout_ms: None,
        }
    }
}

impl ProxyConfig {
    /// Build a config from the six core values, validating it.
    pub fn new(
        port: u16,
        path_prefix: impl Into<String>,
        target_base_url: impl Into<String>,
        allow_origin: impl Into<String>,
        allow_methods: impl Into<String>,
        allow_headers: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self {
            port,
            path_prefix: path_prefix.into(),
            target_base_url: target_base_url.into(),
            cors: CorsConfig {
                allow_origin: allow_origin.into(),
                allow_methods: allow_methods.into(),
                allow_headers: allow_headers.into(),
            },
            ..Default::default()
        }
        .validated()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::ParseFile {
            path: path.display().to_string(),
            source,
        })
    }

    /// Normalize and validate. Idempotent.
    ///
    /// Slashes are trimmed from the path prefix and trailing slashes from the
    /// target; the target must be an absolute http(s) URL and every CORS value
    /// must be usable as a header value.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        let prefix = self.path_prefix.trim_matches('/');
        if prefix.is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        if prefix.contains(['?', '#']) || prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidPath(prefix.to_string()));
        }
        self.path_prefix = prefix.to_string();

        let target = self.target_base_url.trim();
        if target.is_empty() {
            return Err(ConfigError::MissingTarget);
        }
        let target = target.trim_end_matches('/').to_string();
        validate_target(&target)?;
        self.target_base_url = target;

        header_value("allow-origin", &self.cors.allow_origin)?;
        header_value("allow-methods", &self.cors.allow_methods)?;
        header_value("allow-headers", &self.cors.allow_headers)?;

        Ok(self)
    }

    /// Local URL clients should call, e.g. `http://localhost:3001/proxy/`.
    pub fn proxy_url(&self) -> String {
        format!("http://localhost:{}/{}/", self.port, self.path_prefix)
    }
}

fn validate_target(target: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTarget {
        url: target.to_string(),
        reason,
    };

    let uri: Uri = target.parse().map_err(|e| invalid(format!("{e}")))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => {
            return Err(invalid(format!(
                "unsupported scheme '{other}' (expected http or https)"
            )))
        }
        None => return Err(invalid("missing scheme (expected http:// or https://)".into())),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host".into()));
    }
    if uri.query().is_some() {
        return Err(invalid("base URL must not carry a query string".into()));
    }
    Ok(())
}

pub(crate) fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeaderValue {
        name,
        value: value.to_string(),
    })
}

/// Values supplied on the command line or through the environment.
///
/// Each `Some` wins over the config file, which wins over built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<IpAddr>,
    pub path_prefix: Option<String>,
    pub target_base_url: Option<String>,
    pub allow_origin: Option<String>,
    pub allow_methods: Option<String>,
    pub allow_headers: Option<String>,
    pub upstream_timeout_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Merge onto `file` (or the defaults) and validate the result.
    pub fn resolve(self, file: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
        let base = match file {
            Some(path) => ProxyConfig::from_file(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(base).validated()
    }

    fn apply(self, mut config: ProxyConfig) -> ProxyConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(addr) = self.bind_address {
            config.bind_address = addr;
        }
        if let Some(prefix) = self.path_prefix {
            config.path_prefix = prefix;
        }
        if let Some(target) = self.target_base_url {
            config.target_base_url = target;
        }
        if let Some(origin) = self.allow_origin {
            config.cors.allow_origin = origin;
        }
        if let Some(methods) = self.allow_methods {
            config.cors.allow_methods = methods;
        }
        if let Some(headers) = self.allow_headers {
            config.cors.allow_headers = headers;
        }
        if self.upstream_timeout_ms.is_some() {
            config.upstream_timeout_ms = self.upstream_timeout_ms;
        }
        config
    }
}
