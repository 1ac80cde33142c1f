//! Incoming request as seen by the resolver, handlers and the proxy.

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Method, Uri};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::HeaderOverrides;
use crate::error::StubError;

/// Body decoded by the server's body-parsing step.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

impl ParsedBody {
    pub fn is_empty(&self) -> bool {
        match self {
            ParsedBody::Json(Value::Object(map)) => map.is_empty(),
            ParsedBody::Json(Value::Array(items)) => items.is_empty(),
            ParsedBody::Json(Value::Null) => true,
            ParsedBody::Json(_) => false,
            ParsedBody::Form(pairs) => pairs.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StubRequest {
    pub method: Method,
    pub uri: Uri,
    /// Route parameters captured by the router.
    pub params: BTreeMap<String, String>,
    pub headers: HeaderMap,
    /// Raw body bytes as received.
    pub body: Bytes,
    pub parsed_body: Option<ParsedBody>,
}

impl StubRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let parsed_body = parse_body(&headers, &body);
        Self {
            method,
            uri,
            params: BTreeMap::new(),
            headers,
            body,
            parsed_body,
        }
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Path and query, as the client sent them.
    pub fn url(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn query(&self) -> BTreeMap<String, String> {
        self.uri
            .query()
            .map(|q| parse_form(q).into_iter().collect())
            .unwrap_or_default()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Insert or overwrite request headers with `overrides`.
    pub fn apply_header_overrides(&mut self, overrides: &HeaderOverrides) -> Result<(), StubError> {
        for (name, value) in overrides {
            self.set_header(name, value)?;
        }
        Ok(())
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), StubError> {
        let header_name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()).map_err(
            |e| StubError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            },
        )?;
        let header_value = HeaderValue::from_str(value).map_err(|e| StubError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    /// Headers with lower-case names; non UTF-8 values are skipped.
    pub fn header_pairs(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }
}

/// Decode JSON and url-encoded bodies; anything else stays raw.
fn parse_body(headers: &HeaderMap, body: &Bytes) -> Option<ParsedBody> {
    if body.is_empty() {
        return None;
    }
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;

    if content_type.contains("application/json") {
        serde_json::from_slice(body).ok().map(ParsedBody::Json)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        std::str::from_utf8(body)
            .ok()
            .map(|s| ParsedBody::Form(parse_form(s)))
    } else {
        None
    }
}

/// Parse `a=1&b=two+words` into decoded pairs.
pub fn parse_form(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, content_type: Option<&str>, body: &str) -> StubRequest {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        StubRequest::new(
            Method::POST,
            uri.parse().unwrap(),
            headers,
            Bytes::from(body.to_string()),
        )
    }

    #[test]
    fn test_json_body_is_parsed() {
        let req = request("/post", Some("application/json; charset=utf-8"), r#"{"a": 1}"#);
        assert_eq!(
            req.parsed_body,
            Some(ParsedBody::Json(serde_json::json!({"a": 1})))
        );
    }

    #[test]
    fn test_form_body_is_parsed() {
        let req = request(
            "/post",
            Some("application/x-www-form-urlencoded"),
            "name=John+Doe&city=New%20York",
        );
        assert_eq!(
            req.parsed_body,
            Some(ParsedBody::Form(vec![
                ("name".to_string(), "John Doe".to_string()),
                ("city".to_string(), "New York".to_string()),
            ]))
        );
    }

    #[test]
    fn test_unparsable_or_unknown_bodies_stay_raw() {
        assert!(request("/p", Some("application/json"), "{oops").parsed_body.is_none());
        assert!(request("/p", Some("text/plain"), "hello").parsed_body.is_none());
        assert!(request("/p", None, "hello").parsed_body.is_none());
        assert!(request("/p", Some("application/json"), "").parsed_body.is_none());
    }

    #[test]
    fn test_url_and_query() {
        let req = request("/search?q=rust%20lang&page=2", None, "");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.url(), "/search?q=rust%20lang&page=2");
        let query = req.query();
        assert_eq!(query.get("q").map(String::as_str), Some("rust lang"));
        assert_eq!(query.get("page").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_header_overrides_overwrite_existing() {
        let mut req = request("/", None, "");
        req.set_header("Origin", "http://client.com").unwrap();

        let mut overrides = HeaderOverrides::new();
        overrides.insert("Origin".to_string(), "http://override.com".to_string());
        overrides.insert("x-extra".to_string(), "1".to_string());
        req.apply_header_overrides(&overrides).unwrap();

        assert_eq!(req.headers.get("origin").unwrap(), "http://override.com");
        assert_eq!(req.headers.get("x-extra").unwrap(), "1");
    }

    #[test]
    fn test_invalid_header_override() {
        let mut req = request("/", None, "");
        let err = req.set_header("bad header", "x").unwrap_err();
        assert!(matches!(err, StubError::InvalidHeader { .. }));
    }
}
