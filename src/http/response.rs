//! Response handling and transformation.
//!
//! # Responsibilities
//! - Build the downstream head of a stream relay
//! - Strip hop-by-hop headers from forwarded one-shot responses
//!
//! # Design Decisions
//! - Stream responses project only the upstream status and content type;
//!   length and connection headers are set for an unbounded body
//! - One-shot responses keep every end-to-end upstream header

use axum::body::Body;
use axum::http::{header, response::Parts, HeaderMap, HeaderName, HeaderValue, Response};

use crate::config::MULTIPART_STREAM_TYPE;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Downstream response for a stream relay.
///
/// The body has no known length, so the server sends it chunked.
pub fn stream_response(upstream: &Parts, body: Body) -> Response<Body> {
    let content_type = upstream
        .headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(MULTIPART_STREAM_TYPE));

    let mut response = Response::new(body);
    *response.status_mut() = upstream.status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
