//! Header selection for forwarded requests.
//!
//! `Host` and `Content-Length` describe the inbound connection and body, not
//! the outbound one, so they are never copied. The client sets its own values.

use hyper::header::{HeaderName, CONTENT_LENGTH, HOST};
use hyper::HeaderMap;

/// Headers that are never copied onto a forwarded request.
pub static EXCLUDED_HEADERS: [HeaderName; 2] = [HOST, CONTENT_LENGTH];

pub fn is_excluded(name: &HeaderName) -> bool {
    EXCLUDED_HEADERS.contains(name)
}

/// The headers to send with a forwarded request. Empty when header forwarding
/// is disabled; otherwise every inbound header (all values, in order) except
/// [`EXCLUDED_HEADERS`].
pub fn forwardable_headers(inbound: &HeaderMap, forward_headers: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if !forward_headers {
        return headers;
    }
    for (name, value) in inbound {
        if !is_excluded(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}
