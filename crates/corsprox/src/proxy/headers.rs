//! Outbound header sanitization.
//!
//! Inbound headers are copied to the upstream request through an explicit
//! denylist filter. `Host` is dropped so the client recomputes it from the
//! upstream URL; hop-by-hop headers only describe the client connection; and
//! `Accept-Encoding` is dropped so upstream bodies arrive uncompressed and can
//! be relayed as JSON. Any header named in `Connection` is hop-by-hop as well.

use hyper::header::{
    HeaderMap, HeaderName, ACCEPT_ENCODING, CONNECTION, HOST, TE, TRAILER, TRANSFER_ENCODING,
    UPGRADE,
};

pub static KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
pub static PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

/// Headers never forwarded upstream.
pub fn is_stripped(name: &HeaderName) -> bool {
    name == HOST
        || name == CONNECTION
        || name == KEEP_ALIVE
        || name == PROXY_CONNECTION
        || name == TE
        || name == TRAILER
        || name == TRANSFER_ENCODING
        || name == UPGRADE
        || name == ACCEPT_ENCODING
}

/// Header names listed in `Connection`, e.g. `x-hop` in `Connection: close, X-Hop`.
fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

/// Copy `inbound` minus the denylist and anything `Connection` names.
/// Repeated headers keep every value.
pub fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let listed = connection_listed(inbound);
    inbound
        .iter()
        .filter(|(name, _)| !is_stripped(name) && !listed.contains(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
