//! Configuration types for the stub server.
//!
//! The route table is a YAML or JSON document. It is read again on every
//! request by [`ConfigLoader`], so edits take effect without a restart.

mod loader;
mod routes;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StubError;

pub use loader::{ConfigLoader, RouteTableSource, CONFIG_EXTENSIONS};
pub use routes::{
    DelayRange, DynamicStub, HeaderOverrides, HttpVerb, MethodEntry, Route, Stub, StubOptions,
};

/// Root of a route table document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StubServerConfig {
    /// Global delay, used when neither the route nor the method declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayRange>,
    /// Global header overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderOverrides>,
    pub routes: BTreeMap<String, Route>,
}

impl StubServerConfig {
    /// Parse a document; `.json` files go through serde_json, everything else
    /// through serde_yaml.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, StubError> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(contents).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(contents).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| StubError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Check every verb key against the verbs the router can register.
    pub fn validate_methods(&self) -> Result<(), StubError> {
        for (path, route) in &self.routes {
            for method in route.methods.keys() {
                if HttpVerb::parse(method).is_none() {
                    return Err(StubError::InvalidMethodDeclaration {
                        method: method.clone(),
                        path: path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// `(path, verb)` pairs declared by this snapshot.
    pub fn declared_pairs(&self) -> Result<Vec<(&str, HttpVerb)>, StubError> {
        self.validate_methods()?;
        let mut pairs = Vec::new();
        for (path, route) in &self.routes {
            for method in route.methods.keys() {
                if let Some(verb) = HttpVerb::parse(method) {
                    pairs.push((path.as_str(), verb));
                }
            }
        }
        Ok(pairs)
    }
}
