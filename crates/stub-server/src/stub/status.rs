//! HTTP status inference from stub resource names.
//!
//! A resource name carrying `_<digits>_<Label>` (for example
//! `GET_400_BadRequest.json`) is served with that status. This naming
//! convention is the only way to declare a non-200 status for a file stub.

use hyper::StatusCode;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::StubError;

static STATUS_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(\d+)_[a-zA-Z]+").expect("status marker pattern is valid")
});

/// Status declared by the first `_<digits>_<Label>` marker in `target`,
/// `200 OK` when there is none.
pub fn infer_status(target: &str) -> Result<StatusCode, StubError> {
    let Some(captures) = STATUS_MARKER.captures(target) else {
        return Ok(StatusCode::OK);
    };
    let digits = &captures[1];
    digits
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| StubError::InvalidStatus {
            status: digits.to_string(),
            target: target.to_string(),
        })
}
