//! Request forwarding to proxy targets.

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_LENGTH;
use hyper::{Request, Response, Uri};
use std::error::Error as StdError;
use tracing::debug;

use super::body::fix_request_body;
use super::client::{create_http_client, HttpClient};
use super::cookies::remove_secure_from_set_cookie;
use super::headers::{rewrite_host, strip_hop_by_hop};
use crate::error::StubError;
use crate::stub::StubRequest;

/// Forwards a request to a target origin and relays the upstream response.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        target: &str,
        request: &StubRequest,
    ) -> Result<Response<Full<Bytes>>, StubError>;
}

/// Forwarder backed by the shared pooled HTTP client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: HttpClient,
}

impl HttpForwarder {
    pub fn new() -> Self {
        Self {
            client: create_http_client(),
        }
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }
}

impl Default for HttpForwarder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        target: &str,
        request: &StubRequest,
    ) -> Result<Response<Full<Bytes>>, StubError> {
        let upstream_uri = build_upstream_uri(target, request.url())?;
        let authority = upstream_uri
            .authority()
            .map(|a| a.as_str().to_string())
            .unwrap_or_default();

        debug!("Forwarding {} {} to {}", request.method, request.url(), upstream_uri);

        let mut headers = request.headers.clone();
        strip_hop_by_hop(&mut headers);
        rewrite_host(&mut headers, &authority);

        let body = match fix_request_body(request) {
            Some(fixed) => {
                headers.insert(CONTENT_LENGTH, fixed.len().into());
                fixed
            }
            None => request.body.clone(),
        };

        let mut upstream_req = Request::builder()
            .method(request.method.clone())
            .uri(upstream_uri)
            .body(Full::new(body))
            .map_err(|e| transport_failure(target, &e))?;
        *upstream_req.headers_mut() = headers;

        let upstream_response = self
            .client
            .request(upstream_req)
            .await
            .map_err(|e| transport_failure(target, &e))?;

        let (mut parts, body) = upstream_response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| transport_failure(target, &e))?
            .to_bytes();

        strip_hop_by_hop(&mut parts.headers);
        remove_secure_from_set_cookie(&mut parts.headers);

        Ok(Response::from_parts(parts, Full::new(body_bytes)))
    }
}

/// Target origin + target path (trailing `/` trimmed) + request path and query.
pub fn build_upstream_uri(target: &str, request_url: &str) -> Result<Uri, StubError> {
    let target_uri: Uri = target
        .parse()
        .map_err(|e| transport_failure(target, &e))?;

    let (Some(scheme), Some(authority)) = (target_uri.scheme_str(), target_uri.authority()) else {
        return Err(StubError::UpstreamTransportFailure {
            target: target.to_string(),
            reason: "proxy target must be an absolute http(s) URL".to_string(),
        });
    };

    let prefix = target_uri.path().trim_end_matches('/');
    let full = format!("{scheme}://{authority}{prefix}{request_url}");
    full.parse().map_err(|e| transport_failure(target, &e))
}

/// Flatten an error and its sources into one message.
fn transport_failure(target: &str, err: &(dyn StdError + 'static)) -> StubError {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    StubError::UpstreamTransportFailure {
        target: target.to_string(),
        reason,
    }
}
