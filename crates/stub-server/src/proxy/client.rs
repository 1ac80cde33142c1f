//! HTTP client creation and configuration.
//!
//! One pooled client is shared by every proxied route; it speaks HTTP/1.1 to
//! both `http://` and `https://` targets.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracing::{debug, warn};

/// Type alias for the HTTP client used by the proxy.
pub type HttpClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const KEEPALIVE: Duration = Duration::from_secs(60);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE_PER_HOST: usize = 16;

/// Create the shared HTTP client with connection pooling and native roots.
pub fn create_http_client() -> HttpClient {
    // Both ring and aws-lc-rs are compiled in; pick one before building configs.
    // Err only means a provider was already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut http_connector = HttpConnector::new();
    http_connector.set_keepalive(Some(KEEPALIVE));
    http_connector.set_connect_timeout(Some(CONNECT_TIMEOUT));
    http_connector.enforce_http(false);

    let builder = match hyper_rustls::HttpsConnectorBuilder::new().with_native_roots() {
        Ok(builder) => builder,
        Err(e) => {
            warn!("No native root certificates ({}); https targets will fail verification", e);
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(
                rustls::ClientConfig::builder()
                    .with_root_certificates(rustls::RootCertStore::empty())
                    .with_no_client_auth(),
            )
        }
    };
    let https_connector = builder.https_or_http().enable_http1().wrap_connector(http_connector);

    let http_client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build(https_connector);

    debug!(
        "Proxy client configured (HTTP/1.1): max_idle={}, idle_timeout={}s",
        POOL_MAX_IDLE_PER_HOST,
        POOL_IDLE_TIMEOUT.as_secs()
    );

    http_client
}
