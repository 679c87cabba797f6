//! CORS header injection and preflight answers.

use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::{Response, StatusCode};

use super::response::empty_response;
use super::Body;
use crate::config::{header_value, CorsConfig};
use crate::error::ConfigError;

/// Pre-parsed CORS header values, built once at startup.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsHeaders {
    pub fn from_config(config: &CorsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            allow_origin: header_value("allow-origin", &config.allow_origin)?,
            allow_methods: header_value("allow-methods", &config.allow_methods)?,
            allow_headers: header_value("allow-headers", &config.allow_headers)?,
        })
    }

    /// Overwrite the three `Access-Control-Allow-*` headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }

    /// `200` with an empty body and the CORS headers.
    pub fn preflight(&self) -> Response<Body> {
        let mut response = empty_response(StatusCode::OK);
        self.apply(response.headers_mut());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn cors() -> CorsHeaders {
        CorsHeaders::from_config(&CorsConfig {
            allow_origin: "https://app.example.com".into(),
            allow_methods: "GET, PATCH".into(),
            allow_headers: "X-Api-Key".into(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_preflight_is_empty_200() {
        let response = cors().preflight();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, PATCH"
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            "X-Api-Key"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn test_apply_overwrites_upstream_values() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.append(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://other.example.com"),
        );

        cors().apply(&mut headers);
        let origins: Vec<_> = headers.get_all(ACCESS_CONTROL_ALLOW_ORIGIN).iter().collect();
        assert_eq!(origins, ["https://app.example.com"]);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let config = CorsConfig {
            allow_headers: "X-One\r\nX-Two".into(),
            ..Default::default()
        };
        assert!(CorsHeaders::from_config(&config).is_err());
    }
}
