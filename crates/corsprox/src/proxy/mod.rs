//! Forwarding server.
//!
//! # Module Structure
//!
//! - `server` - ProxyServer struct, binding, and main run loop
//! - `handler` - Per-request CORS, preflight, routing, and forwarding
//! - `forwarding` - Outbound call and relay of its outcome
//! - `rewrite` - Route prefix matching and upstream URL construction
//! - `headers` - Outbound header denylist
//! - `cors` - CORS header values and preflight answers
//! - `response` - Response constructors
//! - `client` - Upstream HTTP client creation
//! - `context` - Read-only state shared by handlers

mod client;
mod context;
mod cors;
mod forwarding;
mod handler;
mod headers;
mod response;
mod rewrite;
mod server;

use bytes::Bytes;
use http_body_util::Full;

/// Body type of every response the proxy produces.
pub type Body = Full<Bytes>;

pub use forwarding::{TransportError, UpstreamOutcome, UpstreamReply};
pub use server::{start, BoundServer, ProxyServer};
