//! Server bootstrap: route registration and the accept loop.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::handler::StubService;
use super::router::StubRouter;
use crate::config::{ConfigLoader, RouteTableSource};
use crate::error::StubError;
use crate::proxy::{Forwarder, HttpForwarder};
use crate::stub::{DelaySimulator, Dispatcher, RouteResolver};

pub const DEFAULT_PORT: u16 = 12345;

/// Pause after a failed accept, e.g. when the process is out of descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    pub host: IpAddr,
    pub port: u16,
    /// `false` forces every delay to 0 ms.
    pub delay_enabled: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            delay_enabled: true,
        }
    }
}

/// Read the route table once and register every declared `(path, verb)`.
///
/// Unknown verbs and patterns the router rejects fail here, before any
/// traffic is accepted.
pub async fn register(source: &dyn RouteTableSource) -> Result<StubRouter, StubError> {
    let snapshot = source.load().await?;
    let mut router = StubRouter::new();
    for (path, verb) in snapshot.declared_pairs()? {
        router.register(verb, path)?;
    }
    debug!("Registered {} route patterns", router.len());
    Ok(router)
}

/// Bound stub server, ready to [`run`](StubServer::run).
pub struct StubServer {
    listener: TcpListener,
    service: Arc<StubService>,
}

impl StubServer {
    /// Load `config` from disk and proxy URL targets over the network.
    pub async fn bind(config: impl Into<PathBuf>, options: ServerOptions) -> Result<Self, StubError> {
        let source: Arc<dyn RouteTableSource> = Arc::new(ConfigLoader::new(config));
        let forwarder: Arc<dyn Forwarder> = Arc::new(HttpForwarder::new());
        Self::bind_with(source, forwarder, options).await
    }

    pub async fn bind_with(
        source: Arc<dyn RouteTableSource>,
        forwarder: Arc<dyn Forwarder>,
        options: ServerOptions,
    ) -> Result<Self, StubError> {
        let router = register(source.as_ref()).await?;
        let dispatcher = Dispatcher::new(source.base_dir(), forwarder);
        let service = StubService::new(
            router,
            RouteResolver::new(source),
            DelaySimulator::new(options.delay_enabled),
            dispatcher,
        );

        let listener = TcpListener::bind(SocketAddr::new(options.host, options.port)).await?;
        Ok(Self {
            listener,
            service: Arc::new(service),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, StubError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped. Failed accepts are
    /// logged and retried; only the initial address lookup can return `Err`.
    pub async fn run(self) -> Result<(), StubError> {
        info!("Stub server listening on http://{}", self.local_addr()?);

        loop {
            let Some(stream) = accepted(self.listener.accept().await) else {
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            };
            let io = TokioIo::new(stream);
            let service = Arc::clone(&self.service);

            tokio::spawn(async move {
                let service = service_fn(move |req| Arc::clone(&service).handle(req));

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Connection error: {}", e);
                }
            });
        }
    }
}

fn accepted(result: std::io::Result<(TcpStream, SocketAddr)>) -> Option<TcpStream> {
    match result {
        Ok((stream, _)) => Some(stream),
        Err(e) => {
            warn!("Failed to accept connection: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StubServerConfig;
    use async_trait::async_trait;
    use std::path::Path;

    struct StaticTable(&'static str);

    #[async_trait]
    impl RouteTableSource for StaticTable {
        async fn load(&self) -> Result<StubServerConfig, StubError> {
            StubServerConfig::parse(Path::new("config.yaml"), self.0)
        }

        fn base_dir(&self) -> &Path {
            Path::new(".")
        }
    }

    #[tokio::test]
    async fn test_register_all_pairs() {
        let table = StaticTable(
            "routes:\n  /a:\n    GET: a.json\n    post: b.json\n  /b/:id?:\n    DELETE: c.json\n",
        );
        let router = register(&table).await.unwrap();
        assert_eq!(router.len(), 2);
        assert_eq!(router.lookup("/a").unwrap().methods.len(), 2);
        assert!(router.lookup("/b").is_some());
        assert!(router.lookup("/b/1").is_some());
    }

    #[tokio::test]
    async fn test_unknown_verb_is_fatal() {
        let table = StaticTable("routes:\n  /a:\n    FOOBAR: a.json\n");
        match register(&table).await {
            Err(StubError::InvalidMethodDeclaration { method, path }) => {
                assert_eq!(method, "FOOBAR");
                assert_eq!(path, "/a");
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn test_accept_error_is_skipped() {
        let aborted = std::io::Error::from(std::io::ErrorKind::ConnectionAborted);
        assert!(accepted(Err(aborted)).is_none());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, result) = tokio::join!(TcpStream::connect(addr), listener.accept());
        client.unwrap();
        assert!(accepted(result).is_some());
    }

    #[test]
    fn test_default_options() {
        let options = ServerOptions::default();
        assert_eq!(options.port, 12345);
        assert!(options.delay_enabled);
        assert!(options.host.is_unspecified());
    }
}
