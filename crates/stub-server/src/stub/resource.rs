//! Loading local stub resources.
//!
//! Nothing is cached: every call reads the file again, so editing a stub
//! changes the next response.

use bytes::Bytes;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::StubError;
use crate::scripting::{HandlerScript, RhaiEngine, ScriptModule};

/// Body data ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Bytes {
        bytes: Bytes,
        content_type: String,
    },
}

/// A loaded local resource.
#[derive(Debug, Clone)]
pub enum Resource {
    Data(Payload),
    Handler(HandlerScript),
}

/// Resources parsed into structured data or scripts; anything else is raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Structured {
    Json,
    Yaml,
    Script,
}

impl Structured {
    fn of(path: &Path) -> Option<Self> {
        match extension(path).as_deref() {
            Some("json") => Some(Structured::Json),
            Some("yaml") | Some("yml") => Some(Structured::Yaml),
            Some("rhai") => Some(Structured::Script),
            _ => None,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Load `path` as structured data, a script module or raw bytes.
pub async fn load_resource(path: &Path) -> Result<Resource, StubError> {
    let Some(kind) = Structured::of(path) else {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            StubError::ResourceLoadFailure(format!("{e}, open '{}'", path.display()))
        })?;
        return Ok(Resource::Data(Payload::Bytes {
            bytes: Bytes::from(bytes),
            content_type: content_type_for(path),
        }));
    };

    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => StubError::ResourceLoadFailure(format!(
                "Cannot find module '{}'",
                path.display()
            )),
            _ => StubError::ResourceLoadFailure(format!("{e}, open '{}'", path.display())),
        })?;

    match kind {
        Structured::Json => serde_json::from_str(&source)
            .map(|value| Resource::Data(Payload::Json(value)))
            .map_err(|e| syntax_error(path, e)),
        Structured::Yaml => serde_yaml::from_str(&source)
            .map(|value| Resource::Data(Payload::Json(value)))
            .map_err(|e| syntax_error(path, e)),
        Structured::Script => {
            match RhaiEngine::load_module(&source, &path.display().to_string())? {
                ScriptModule::Handler(handler) => Ok(Resource::Handler(handler)),
                ScriptModule::Data(value) => Ok(Resource::Data(Payload::Json(value))),
            }
        }
    }
}

fn syntax_error(path: &Path, err: impl std::fmt::Display) -> StubError {
    StubError::ResourceLoadFailure(format!("SyntaxError: {err} in '{}'", path.display()))
}

/// Content type for raw files, guessed from the extension. Text types are
/// sent as UTF-8.
pub fn content_type_for(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    }
}
