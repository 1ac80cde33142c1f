//! `Set-Cookie` rewriting for plain-HTTP local development.

use hyper::header::{HeaderValue, SET_COOKIE};
use hyper::HeaderMap;
use regex::Regex;
use std::sync::LazyLock;

static SECURE_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i); secure").expect("secure attribute pattern is valid"));

/// Drop the `Secure` attribute from every upstream `Set-Cookie` header so the
/// client keeps the cookie over `http://`.
pub fn remove_secure_from_set_cookie(headers: &mut HeaderMap) {
    let cookies: Vec<HeaderValue> = headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|value| match value.to_str() {
            Ok(cookie) => HeaderValue::from_str(&SECURE_ATTRIBUTE.replace_all(cookie, ""))
                .unwrap_or_else(|_| value.clone()),
            Err(_) => value.clone(),
        })
        .collect();

    if cookies.is_empty() {
        return;
    }
    headers.remove(SET_COOKIE);
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
}
