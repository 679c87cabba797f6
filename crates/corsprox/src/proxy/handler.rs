//! Per-request handling: CORS, preflight, routing, forwarding.
//!
//! The request body is collected in full before forwarding, without a size
//! cap.

use std::convert::Infallible;
use std::fmt::Display;

use http_body_util::BodyExt;
use hyper::{Method, Request, Response, StatusCode};
use tracing::{debug, error, info, warn};

use super::context::ProxyContext;
use super::forwarding::{forward, relay, UpstreamOutcome, UpstreamRequest};
use super::headers::outbound_headers;
use super::response::error_response;
use super::rewrite::{has_dot_segments, upstream_url};
use super::Body;

/// Handle one inbound request. Every response carries the CORS headers,
/// whether or not the path is under the proxied prefix.
pub async fn handle_request<B>(
    ctx: &ProxyContext,
    req: Request<B>,
) -> Result<Response<Body>, Infallible>
where
    B: hyper::body::Body,
    B::Error: Display,
{
    let mut response = route_request(ctx, req).await;
    ctx.cors.apply(response.headers_mut());
    Ok(response)
}

async fn route_request<B>(ctx: &ProxyContext, req: Request<B>) -> Response<Body>
where
    B: hyper::body::Body,
    B::Error: Display,
{
    if *req.method() == Method::OPTIONS {
        debug!("Preflight {}", req.uri());
        return ctx.cors.preflight();
    }

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let Some(remainder) = ctx.route.strip(path_and_query) else {
        debug!(
            "No route for {} {} (proxied prefix is {})",
            req.method(),
            req.uri().path(),
            ctx.route.as_str()
        );
        return error_response(
            StatusCode::NOT_FOUND,
            &format!("Cannot {} {}", req.method(), req.uri().path()),
        );
    };

    if has_dot_segments(remainder) {
        warn!(
            "Forwarding path with dot-segments unchanged: {} (upstream may resolve it outside {})",
            remainder, ctx.target_base_url
        );
    }

    let url = upstream_url(&ctx.target_base_url, remainder);
    info!("Proxied {} {} -> {}", req.method(), remainder, url);

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("failed to read request body: {e}"),
            );
        }
    };

    let upstream_req = UpstreamRequest {
        method: parts.method.clone(),
        url,
        headers: outbound_headers(&parts.headers),
        body,
    };
    let url = upstream_req.url.clone();

    let outcome = forward(&ctx.http_client, upstream_req, ctx.upstream_timeout).await;
    match &outcome {
        UpstreamOutcome::Success(reply) => {
            debug!("Upstream answered {} for {} {}", reply.status, parts.method, url)
        }
        UpstreamOutcome::HttpError(reply) => {
            warn!("Upstream answered {} for {} {}", reply.status, parts.method, url)
        }
        UpstreamOutcome::Transport(err) => {
            error!("Failed to forward {} {}: {}", parts.method, url, err)
        }
    }

    relay(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use bytes::Bytes;
    use http_body_util::Full;
    use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
    use tracing_test::traced_test;

    fn context(target: &str) -> ProxyContext {
        let config = ProxyConfig::new(
            0,
            "proxy",
            target,
            "https://app.example.com",
            "GET, POST",
            "Content-Type",
        )
        .unwrap();
        ProxyContext::new(&config).unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn closed_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_preflight_never_forwards() {
        // The target is unreachable, so any forwarding attempt would yield 500
        let port = closed_port().await;
        let ctx = context(&format!("http://127.0.0.1:{port}"));

        for uri in ["/proxy/users", "/elsewhere", "/"] {
            let response = handle_request(&ctx, request(Method::OPTIONS, uri))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "uri {uri}");
            assert_eq!(
                response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
                "https://app.example.com"
            );
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert!(body.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unmatched_path_is_404_with_cors() {
        let ctx = context("http://127.0.0.1:9");
        let response = handle_request(&ctx, request(Method::GET, "/other/users"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_prefix_without_trailing_slash_is_404() {
        let ctx = context("http://127.0.0.1:9");
        let response = handle_request(&ctx, request(Method::GET, "/proxy"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unreachable_upstream_is_500_and_logged() {
        let port = closed_port().await;
        let ctx = context(&format!("http://127.0.0.1:{port}/api"));

        let response = handle_request(&ctx, request(Method::GET, "/proxy/users?id=5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(!body["error"].as_str().unwrap().is_empty());

        assert!(logs_contain(&format!(
            "Proxied GET users?id=5 -> http://127.0.0.1:{port}/api/users?id=5"
        )));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_dot_segments_are_flagged() {
        let port = closed_port().await;
        let ctx = context(&format!("http://127.0.0.1:{port}/api"));

        let _ = handle_request(&ctx, request(Method::GET, "/proxy/../admin"))
            .await
            .unwrap();
        assert!(logs_contain("dot-segments"));
    }
}
