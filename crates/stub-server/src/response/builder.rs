use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use serde_json::Value;
use std::str::FromStr;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

pub struct ResponseBuilder {
    status: StatusCode,
    body: Option<Bytes>,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn new(status_code: StatusCode) -> Self {
        ResponseBuilder {
            status: status_code,
            body: None,
            headers: Default::default(),
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON strings are sent as HTML text; everything else as JSON.
    pub fn json_body(self, value: &Value) -> Self {
        match value {
            Value::String(text) => self
                .content_type(HTML_CONTENT_TYPE)
                .body(Bytes::from(text.clone())),
            other => {
                let encoded = serde_json::to_vec(other).unwrap_or_default();
                self.content_type(JSON_CONTENT_TYPE).body(encoded)
            }
        }
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        self
    }

    /// Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
                self
            }
            _ => self,
        }
    }

    pub fn merge_headers<H, K, V>(mut self, headers: H) -> Self
    where
        H: IntoIterator<Item = (K, V)>,
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        for (key, value) in headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(key), HeaderValue::try_from(value))
            {
                self.headers.insert(name, value);
            }
        }
        self
    }

    pub fn build(self) -> Response<Full<Bytes>> {
        let payload = self.body.unwrap_or_default();
        let mut response = Response::new(Full::new(payload));
        *response.status_mut() = self.status;
        response.headers_mut().extend(self.headers);
        response
    }
}
