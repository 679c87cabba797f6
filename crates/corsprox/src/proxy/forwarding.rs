//! Request forwarding to the upstream and relay of its answer.
//!
//! The outbound call resolves to an [`UpstreamOutcome`]; [`relay`] turns any
//! outcome into exactly one client-facing response. Upstream redirects are
//! followed, up to [`MAX_REDIRECTS`] hops, so the client only ever sees the
//! final answer.
//!
//! Request and upstream bodies are buffered in full with no size limit; only
//! the optional timeout bounds a slow or endless upstream.

use std::error::Error as StdError;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE, LOCATION, PROXY_AUTHORIZATION,
};
use hyper::{Method, Request, Response, StatusCode, Uri};
use tracing::debug;
use url::Url;

use super::client::HttpClient;
use super::response::{error_response, relay_body};
use super::Body;

/// Redirect hops followed before the call is abandoned.
pub const MAX_REDIRECTS: usize = 10;

/// Everything needed to issue the outbound call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Status and body of the final upstream answer.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Debug)]
pub enum UpstreamOutcome {
    /// 1xx-3xx
    Success(UpstreamReply),
    /// 4xx/5xx answered by the upstream itself
    HttpError(UpstreamReply),
    /// No usable answer was received
    Transport(TransportError),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid upstream URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },
    #[error("upstream request failed: {}", error_chain(.0))]
    Request(#[source] hyper_util::client::legacy::Error),
    #[error("failed to read upstream response body: {0}")]
    Body(#[source] hyper::Error),
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
    #[error("upstream redirected to an unusable location '{location}'")]
    InvalidRedirect { location: String },
    #[error("upstream redirected more than {0} times")]
    TooManyRedirects(usize),
}

/// `err` followed by each of its sources, joined with `": "`.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Issue the outbound call, bounded by `timeout` when set. The timeout covers
/// every redirect hop.
pub async fn forward(
    http_client: &HttpClient,
    request: UpstreamRequest,
    timeout: Option<Duration>,
) -> UpstreamOutcome {
    let uri: Uri = match request.url.parse() {
        Ok(uri) => uri,
        Err(source) => {
            return UpstreamOutcome::Transport(TransportError::InvalidUrl {
                url: request.url,
                source,
            })
        }
    };

    let call = dispatch(http_client, uri, request.method, request.headers, request.body);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(TransportError::Timeout(limit))),
        None => call.await,
    };

    match result {
        Ok(reply) if reply.status.is_client_error() || reply.status.is_server_error() => {
            UpstreamOutcome::HttpError(reply)
        }
        Ok(reply) => UpstreamOutcome::Success(reply),
        Err(err) => UpstreamOutcome::Transport(err),
    }
}

async fn dispatch(
    http_client: &HttpClient,
    mut uri: Uri,
    mut method: Method,
    mut headers: HeaderMap,
    mut body: Bytes,
) -> Result<UpstreamReply, TransportError> {
    let mut redirects = 0;
    loop {
        let mut upstream_req = Request::new(Full::new(body.clone()));
        *upstream_req.method_mut() = method.clone();
        *upstream_req.uri_mut() = uri.clone();
        *upstream_req.headers_mut() = headers.clone();

        let upstream_response = http_client
            .request(upstream_req)
            .await
            .map_err(TransportError::Request)?;

        let status = upstream_response.status();
        let location = upstream_response.headers().get(LOCATION);
        if let Some(location) = location.filter(|_| is_followed(status)) {
            if redirects == MAX_REDIRECTS {
                return Err(TransportError::TooManyRedirects(MAX_REDIRECTS));
            }
            redirects += 1;

            let next = resolve_location(&uri, location)?;
            debug!("Following {} from {} to {}", status, uri, next);

            let next_method = method_after_redirect(status, &method);
            if next_method != method {
                body = Bytes::new();
                remove_matching(&mut headers, |name| name.as_str().starts_with("content-"));
            }
            if next.authority() != uri.authority() {
                for name in [AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION] {
                    headers.remove(name);
                }
            }
            method = next_method;
            uri = next;
            continue;
        }

        let body = upstream_response
            .into_body()
            .collect()
            .await
            .map_err(TransportError::Body)?
            .to_bytes();
        return Ok(UpstreamReply { status, body });
    }
}

/// Statuses whose `Location` is followed.
fn is_followed(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// 303 turns anything but HEAD into GET; 301 and 302 turn POST into GET.
/// 307 and 308 keep the method.
fn method_after_redirect(status: StatusCode, method: &Method) -> Method {
    match status {
        StatusCode::SEE_OTHER if *method != Method::HEAD => Method::GET,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND if *method == Method::POST => {
            Method::GET
        }
        _ => method.clone(),
    }
}

/// Resolve a `Location` value against the URL that produced it.
fn resolve_location(base: &Uri, location: &HeaderValue) -> Result<Uri, TransportError> {
    let invalid = || TransportError::InvalidRedirect {
        location: String::from_utf8_lossy(location.as_bytes()).into_owned(),
    };

    let location = location.to_str().map_err(|_| invalid())?;
    let next = Url::parse(&base.to_string())
        .and_then(|current| current.join(location))
        .map_err(|_| invalid())?;
    if !matches!(next.scheme(), "http" | "https") {
        return Err(invalid());
    }
    next.as_str().parse().map_err(|_| invalid())
}

fn remove_matching(headers: &mut HeaderMap, predicate: impl Fn(&HeaderName) -> bool) {
    let doomed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| predicate(*name))
        .cloned()
        .collect();
    for name in doomed {
        headers.remove(name);
    }
}

/// Client-facing response for an outcome.
///
/// Upstream answers keep their status and body; transport failures become
/// `500 {"error": <message>}`.
pub fn relay(outcome: UpstreamOutcome) -> Response<Body> {
    match outcome {
        UpstreamOutcome::Success(reply) | UpstreamOutcome::HttpError(reply) => {
            relay_body(reply.status, reply.body)
        }
        UpstreamOutcome::Transport(err) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}
