//! Proxy collaborator.
//!
//! Routes whose target is a URL are forwarded to that origin with `Host`
//! rewritten. Two fixups apply at this boundary:
//! - a request body already decoded by the server is re-encoded according
//!   to its `Content-Type` (see [`fix_request_body`]);
//! - `Secure` is stripped from upstream `Set-Cookie` headers (see
//!   [`remove_secure_from_set_cookie`]).
//!
//! Transport failures surface once as `UpstreamTransportFailure`; nothing is
//! retried.

mod body;
mod client;
mod cookies;
mod forwarding;
mod headers;

pub use body::{encode_form, fix_request_body};
pub use client::{create_http_client, HttpClient};
pub use cookies::remove_secure_from_set_cookie;
pub use forwarding::{build_upstream_uri, Forwarder, HttpForwarder};
pub use headers::{rewrite_host, strip_hop_by_hop};
