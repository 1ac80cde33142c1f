//! Response construction shared by the dispatcher and the server.

mod builder;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN};
use hyper::{Method, Response, StatusCode};

pub use builder::{ResponseBuilder, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE};

use crate::error::StubError;

/// Default error page: status 500, `<kind>: <message>`.
pub fn error_page(err: &StubError) -> Response<Full<Bytes>> {
    let html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Error</title>\n</head>\n<body>\n<pre>{}: {}</pre>\n</body>\n</html>\n",
        err.kind(),
        html_escape::encode_text(&err.to_string())
    );
    ResponseBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
        .content_type(HTML_CONTENT_TYPE)
        .body(html)
        .build()
}

/// Router's standard 404 page.
pub fn not_found_page(method: &Method, path: &str) -> Response<Full<Bytes>> {
    let html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Error</title>\n</head>\n<body>\n<pre>Cannot {} {}</pre>\n</body>\n</html>\n",
        method,
        html_escape::encode_text(path)
    );
    ResponseBuilder::new(StatusCode::NOT_FOUND)
        .content_type(HTML_CONTENT_TYPE)
        .body(html)
        .build()
}

/// Allow any origin and any request header.
pub fn with_cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_page() {
        let response = error_page(&StubError::MethodNotSupported("GET".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<title>Error</title>"));
        assert!(html.contains(
            "<pre>MethodNotSupported: No route for 'GET' HTTP request method</pre>"
        ));
    }

    #[tokio::test]
    async fn test_not_found_page() {
        let response = not_found_page(&Method::GET, "/unknown");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("Cannot GET /unknown"));
    }

    #[tokio::test]
    async fn test_error_page_escapes_markup() {
        let response = error_page(&StubError::ResourceLoadFailure(
            "Cannot find module '<stubs>/a&b.json'".to_string(),
        ));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("&lt;stubs&gt;/a&amp;b.json"));
        assert!(!html.contains("<stubs>"));
    }

    #[test]
    fn test_cors_headers() {
        let response = with_cors(ResponseBuilder::new(StatusCode::OK).build());
        assert_eq!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(response.headers().get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "*");
    }
}
