//! Per-request pipeline and error boundary.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::ALLOW;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::router::StubRouter;
use crate::error::StubError;
use crate::response::{error_page, not_found_page, with_cors, ResponseBuilder};
use crate::stub::{DelaySimulator, Dispatcher, RouteResolver, StubRequest};

/// Serves every request routed to a declared pattern.
pub struct StubService {
    router: StubRouter,
    resolver: RouteResolver,
    delay: DelaySimulator,
    dispatcher: Dispatcher,
}

impl StubService {
    pub fn new(
        router: StubRouter,
        resolver: RouteResolver,
        delay: DelaySimulator,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            router,
            resolver,
            delay,
            dispatcher,
        }
    }

    pub fn router(&self) -> &StubRouter {
        &self.router
    }

    /// Never fails: pipeline errors become error pages.
    pub async fn handle<B>(self: Arc<Self>, req: Request<B>) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        Ok(with_cors(self.route(req).await))
    }

    async fn route<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        let (parts, body) = req.into_parts();

        let Some(matched) = self.router.lookup(parts.uri.path()) else {
            debug!("No route for {} {}", parts.method, parts.uri.path());
            return not_found_page(&parts.method, parts.uri.path());
        };

        if parts.method == Method::OPTIONS {
            let allow = matched
                .methods
                .iter()
                .map(|verb| verb.as_str())
                .collect::<Vec<_>>()
                .join(",");
            return ResponseBuilder::new(StatusCode::OK)
                .header(ALLOW.as_str(), &allow)
                .content_type("text/plain; charset=utf-8")
                .body(allow.clone())
                .build();
        }

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!("Failed to read request body: {}", e);
                return ResponseBuilder::new(StatusCode::BAD_REQUEST)
                    .body("Failed to read request body")
                    .build();
            }
        };

        let api_path = matched.api_path.to_string();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let request = StubRequest::new(parts.method, parts.uri, parts.headers, body)
            .with_params(matched.params);

        match self.process(&api_path, request).await {
            Ok(response) => response,
            Err(StubError::RouteNotFound(declared)) => {
                debug!("Route '{}' is no longer declared", declared);
                not_found_page(&method, &path)
            }
            Err(e) => {
                error!("{}", e);
                error_page(&e)
            }
        }
    }

    /// Resolve, wait, log, dispatch.
    async fn process(
        &self,
        api_path: &str,
        mut request: StubRequest,
    ) -> Result<Response<Full<Bytes>>, StubError> {
        let resolution = self.resolver.resolve(api_path, &mut request).await?;
        let ms = self.delay.delay(resolution.delay).await;
        info!(
            "{} {} => {}, delay: {} ms",
            request.method,
            request.url(),
            resolution.target,
            ms
        );
        self.dispatcher.dispatch(&resolution.target, &request).await
    }
}
