//! Response constructors for proxy-generated and relayed replies.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};

use super::Body;

static APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

pub fn empty_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// `body` must already be JSON.
pub fn json_response(status: StatusCode, body: Bytes) -> Response<Body> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, APPLICATION_JSON.clone());
    response
}

/// `{"error": message}` with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let body = serde_json::json!({ "error": message }).to_string();
    json_response(status, Bytes::from(body))
}

/// Relay an upstream body as JSON.
///
/// Valid JSON is passed through byte-for-byte; anything else is encoded as a
/// JSON string. An empty body stays empty.
pub fn relay_body(status: StatusCode, body: Bytes) -> Response<Body> {
    if body.is_empty() {
        return empty_response(status);
    }
    if serde_json::from_slice::<serde::de::IgnoredAny>(&body).is_ok() {
        return json_response(status, body);
    }
    let text = String::from_utf8_lossy(&body).into_owned();
    json_response(status, Bytes::from(serde_json::Value::String(text).to_string()))
}
