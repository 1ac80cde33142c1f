//! Turning a resolved target into a response.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::resource::{load_resource, Payload, Resource};
use super::status::infer_status;
use crate::error::StubError;
use crate::proxy::Forwarder;
use crate::response::ResponseBuilder;
use crate::scripting::HandlerScript;
use crate::stub::StubRequest;

/// Targets starting with `http` are proxy URLs.
pub fn is_url(target: &str) -> bool {
    target.starts_with("http")
}

/// Sends local resources and hands URLs to the proxy.
#[derive(Clone)]
pub struct Dispatcher {
    base_dir: PathBuf,
    forwarder: Arc<dyn Forwarder>,
}

impl Dispatcher {
    pub fn new(base_dir: impl Into<PathBuf>, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            base_dir: base_dir.into(),
            forwarder,
        }
    }

    /// Local path for a resource target; relative names resolve against the
    /// configuration directory.
    pub fn target_path(&self, target: &str) -> PathBuf {
        let path = Path::new(target);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub async fn dispatch(
        &self,
        target: &str,
        request: &StubRequest,
    ) -> Result<Response<Full<Bytes>>, StubError> {
        if is_url(target) {
            return self.forwarder.forward(target, request).await;
        }

        let status = infer_status(target)?;
        if status == StatusCode::NO_CONTENT {
            debug!("204 for {}, resource not loaded", target);
            return Ok(ResponseBuilder::new(status).build());
        }

        match load_resource(&self.target_path(target)).await? {
            Resource::Handler(handler) => run_handler(&handler, request),
            Resource::Data(Payload::Json(value)) => {
                Ok(ResponseBuilder::new(status).json_body(&value).build())
            }
            Resource::Data(Payload::Bytes {
                bytes,
                content_type,
            }) => Ok(ResponseBuilder::new(status)
                .content_type(&content_type)
                .body(bytes)
                .build()),
        }
    }
}

/// The handler owns the response; the name-derived status does not apply.
fn run_handler(
    handler: &HandlerScript,
    request: &StubRequest,
) -> Result<Response<Full<Bytes>>, StubError> {
    let output = handler.call(request)?;
    let mut builder = ResponseBuilder::new(output.status);
    if let Some(body) = &output.body {
        builder = builder.json_body(body);
    }
    Ok(builder
        .merge_headers(
            output
                .headers
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str())),
        )
        .build())
}
