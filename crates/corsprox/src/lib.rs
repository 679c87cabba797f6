//! corsprox: a reverse proxy that forwards `/{prefix}/*` to a single upstream
//! base URL and adds permissive CORS headers to every response.

pub mod config;
pub mod error;
pub mod proxy;

pub use config::{ConfigOverrides, CorsConfig, ProxyConfig};
pub use error::{ConfigError, ServerError};
pub use proxy::{start, BoundServer, ProxyServer};
