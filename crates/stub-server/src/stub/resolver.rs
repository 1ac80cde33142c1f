//! Request -> target resolution against a freshly loaded route table.

use std::sync::Arc;

use tracing::debug;

use crate::config::{DelayRange, HeaderOverrides, RouteTableSource, Stub};
use crate::error::StubError;
use crate::scripting::RhaiEngine;
use crate::stub::StubRequest;

/// Outcome of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// File/module path or proxy URL.
    pub target: String,
    /// Effective delay range, most specific scope first.
    pub delay: DelayRange,
}

/// Resolves requests against the route table, reloading it on every call.
#[derive(Clone)]
pub struct RouteResolver {
    source: Arc<dyn RouteTableSource>,
}

impl RouteResolver {
    pub fn new(source: Arc<dyn RouteTableSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn RouteTableSource> {
        &self.source
    }

    /// Resolve `request` declared under `api_path`.
    ///
    /// Header overrides (global, then route, then method scope) are applied
    /// to `request` before a dynamic stub runs, so scripts see them.
    pub async fn resolve(
        &self,
        api_path: &str,
        request: &mut StubRequest,
    ) -> Result<Resolution, StubError> {
        let table = self.source.load().await?;

        let route = table
            .routes
            .get(api_path)
            .ok_or_else(|| StubError::RouteNotFound(api_path.to_string()))?;

        let method = request.method.as_str().to_string();
        let entry = route
            .method_entry(&method)
            .ok_or_else(|| StubError::MethodNotSupported(method.clone()))?;

        let merged = merge_headers([
            table.headers.as_ref(),
            route.headers.as_ref(),
            entry.headers(),
        ]);
        request.apply_header_overrides(&merged)?;

        let target = match entry.stub() {
            Stub::Literal(target) => target.clone(),
            Stub::Dynamic(dynamic) => RhaiEngine::eval_stub(&dynamic.script, request)?,
        };

        let delay = entry
            .delay()
            .or(route.delay)
            .or(table.delay)
            .unwrap_or(DelayRange::NONE)
            .validated()?;

        debug!("Resolved {} {} to {}", method, api_path, target);
        Ok(Resolution { target, delay })
    }
}

/// Merge scopes in order; later scopes win. Names compare case-insensitively.
fn merge_headers<'a>(scopes: impl IntoIterator<Item = Option<&'a HeaderOverrides>>) -> HeaderOverrides {
    let mut merged = HeaderOverrides::new();
    for scope in scopes.into_iter().flatten() {
        for (name, value) in scope {
            merged.insert(name.to_ascii_lowercase(), value.clone());
        }
    }
    merged
}
