//! Header handling at the proxy boundary.
//!
//! Hop-by-hop headers describe a single connection and are never relayed in
//! either direction.

use hyper::header::{HeaderName, HeaderValue, HOST};
use hyper::HeaderMap;

pub static KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
pub static PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

/// Connection-scoped headers (RFC 9110 section 7.6.1).
fn hop_by_hop() -> [&'static HeaderName; 9] {
    [
        &hyper::header::CONNECTION,
        &KEEP_ALIVE,
        &PROXY_CONNECTION,
        &hyper::header::PROXY_AUTHENTICATE,
        &hyper::header::PROXY_AUTHORIZATION,
        &hyper::header::TE,
        &hyper::header::TRAILER,
        &hyper::header::TRANSFER_ENCODING,
        &hyper::header::UPGRADE,
    ]
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(hyper::header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in hop_by_hop() {
        headers.remove(name);
    }
}

/// Point `Host` at the upstream authority.
pub fn rewrite_host(headers: &mut HeaderMap, authority: &str) {
    match HeaderValue::from_str(authority) {
        Ok(value) => {
            headers.insert(HOST, value);
        }
        Err(_) => {
            headers.remove(HOST);
        }
    }
}
