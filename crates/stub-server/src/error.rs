//! Error types for the stub server.
//!
//! Every failure that can happen while loading the route table, resolving a
//! request or dispatching it is a [`StubError`]. Per-request errors are caught
//! at the handler boundary and rendered by the server; startup errors abort
//! before any traffic is accepted.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error("Cannot find module '{locator}' (tried: {})", display_paths(.attempted))]
    ConfigNotFound {
        locator: String,
        attempted: Vec<PathBuf>,
    },
    #[error("Invalid configuration in '{}': {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    #[error("No route for path '{0}'")]
    RouteNotFound(String),
    #[error("No route for '{0}' HTTP request method")]
    MethodNotSupported(String),
    #[error("Invalid delay range {{min: {min}, max: {max}}}: min must not exceed max")]
    InvalidDelayRange { min: u64, max: u64 },
    #[error("Invalid header override '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("Invalid HTTP status {status} inferred from '{target}'")]
    InvalidStatus { status: String, target: String },
    #[error("{0}")]
    ResourceLoadFailure(String),
    #[error("Script error in {origin}: {reason}")]
    Script { origin: String, reason: String },
    #[error("{reason} (target: {target})")]
    UpstreamTransportFailure { target: String, reason: String },
    #[error("Invalid HTTP request method: '{method}' for route '{path}'")]
    InvalidMethodDeclaration { method: String, path: String },
    #[error("Invalid route pattern '{path}': {reason}")]
    InvalidRoutePattern { path: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StubError {
    /// Taxonomy name, shown on the error page in front of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            StubError::ConfigNotFound { .. } => "ConfigNotFound",
            StubError::ConfigInvalid { .. } => "ConfigInvalid",
            StubError::RouteNotFound(_) => "RouteNotFound",
            StubError::MethodNotSupported(_) => "MethodNotSupported",
            StubError::InvalidDelayRange { .. } => "InvalidDelayRange",
            StubError::InvalidHeader { .. } => "InvalidHeader",
            StubError::InvalidStatus { .. } => "InvalidStatus",
            StubError::ResourceLoadFailure(_) => "ResourceLoadFailure",
            StubError::Script { .. } => "ScriptError",
            StubError::UpstreamTransportFailure { .. } => "UpstreamTransportFailure",
            StubError::InvalidMethodDeclaration { .. } => "InvalidMethodDeclaration",
            StubError::InvalidRoutePattern { .. } => "InvalidRoutePattern",
            StubError::Io(_) => "Error",
        }
    }

    pub(crate) fn script(origin: impl Into<String>, reason: impl ToString) -> Self {
        StubError::Script {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_lists_attempts() {
        let err = StubError::ConfigNotFound {
            locator: "stubs/config".to_string(),
            attempted: vec![
                PathBuf::from("stubs/config"),
                PathBuf::from("stubs/config.yaml"),
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("Cannot find module 'stubs/config'"));
        assert!(message.contains("stubs/config.yaml"));
        assert_eq!(err.kind(), "ConfigNotFound");
    }

    #[test]
    fn test_method_not_supported_message() {
        let err = StubError::MethodNotSupported("HEAD".to_string());
        assert_eq!(err.to_string(), "No route for 'HEAD' HTTP request method");
        assert_eq!(err.kind(), "MethodNotSupported");
    }
}
