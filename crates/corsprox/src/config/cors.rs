//! Cross-origin settings advertised on every response.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
    /// Value of `Access-Control-Allow-Methods` (comma-separated method tokens)
    #[serde(default = "default_allow_methods")]
    pub allow_methods: String,
    /// Value of `Access-Control-Allow-Headers` (comma-separated header names)
    #[serde(default = "default_allow_headers")]
    pub allow_headers: String,
}

pub(crate) fn default_allow_origin() -> String {
    "*".to_string()
}

pub(crate) fn default_allow_methods() -> String {
    "GET, POST, PUT, DELETE, OPTIONS".to_string()
}

pub(crate) fn default_allow_headers() -> String {
    "Content-Type, Authorization".to_string()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_allow_origin(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
        }
    }
}
