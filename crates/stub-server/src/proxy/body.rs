//! Re-serialization of request bodies consumed by the body-parsing step.

use bytes::Bytes;

use crate::stub::{ParsedBody, StubRequest};

/// Body to send upstream.
///
/// A non-empty parsed body is re-encoded according to the request
/// `Content-Type` (JSON for `application/json`, form encoding for
/// `application/x-www-form-urlencoded`). `None` means the raw body is sent
/// unchanged.
pub fn fix_request_body(request: &StubRequest) -> Option<Bytes> {
    let parsed = request.parsed_body.as_ref().filter(|body| !body.is_empty())?;
    let content_type = request.content_type()?;

    match parsed {
        ParsedBody::Json(value) if content_type.contains("application/json") => {
            serde_json::to_vec(value).ok().map(Bytes::from)
        }
        ParsedBody::Form(pairs) if content_type == "application/x-www-form-urlencoded" => {
            Some(Bytes::from(encode_form(pairs)))
        }
        _ => None,
    }
}

/// Encode pairs the way HTML forms do (`+` for spaces).
pub fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(raw: &str) -> String {
    urlencoding::encode(raw).replace("%20", "+")
}
