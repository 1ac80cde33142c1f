//! Rhai scripting for dynamic stubs and handler resources.
//!
//! Scripts receive a `request` map with `method`, `path`, `url`, `params`,
//! `query`, `headers` and `body`.
//!
//! - A dynamic stub is a script whose value is the target string.
//! - A `.rhai` resource that defines `fn handle(request)` is a request
//!   handler and owns the whole response. A handler may return a map whose
//!   keys are only `status` (an integer), `headers` and `body`; unit (empty
//!   `200`); or any other value, including other maps, sent as the body
//!   with `200`.
//! - A `.rhai` resource without `handle` is evaluated and its value is served
//!   as data.

mod rhai_engine;

use hyper::StatusCode;
use serde_json::Value;

pub use rhai_engine::{HandlerScript, RhaiEngine, HANDLER_FN};

/// Result of loading a script resource, decided once at load time.
#[derive(Debug, Clone)]
pub enum ScriptModule {
    Handler(HandlerScript),
    Data(Value),
}

/// Response produced by a handler script.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: None,
        }
    }
}
