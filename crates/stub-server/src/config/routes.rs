//! Route table data model.
//!
//! A route maps HTTP verbs to [`MethodEntry`] values. Method keys are
//! normalized to upper case when the table is deserialized, so `get` and `GET`
//! name the same entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::StubError;

/// Header name -> value overrides declared at global, route or method scope.
pub type HeaderOverrides = BTreeMap<String, String>;

/// Simulated latency range in milliseconds, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl DelayRange {
    pub const NONE: DelayRange = DelayRange { min: 0, max: 0 };

    pub fn new(min: u64, max: u64) -> Result<Self, StubError> {
        DelayRange { min, max }.validated()
    }

    pub fn validated(self) -> Result<Self, StubError> {
        if self.min > self.max {
            return Err(StubError::InvalidDelayRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(self)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::NONE
    }
}

/// HTTP verbs a route may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 5] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Patch,
        HttpVerb::Delete,
    ];

    /// Case-insensitive parse; `None` for anything the router cannot register.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared response source, before it is reduced to a target string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Stub {
    /// File/module path or proxy URL, used verbatim.
    Literal(String),
    /// Rhai script evaluated per request; must produce the target string.
    Dynamic(DynamicStub),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicStub {
    pub script: String,
}

/// Per-verb entry of a route.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MethodEntry {
    Direct(Stub),
    WithOptions(StubOptions),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StubOptions {
    pub response: Stub,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderOverrides>,
}

impl MethodEntry {
    pub fn stub(&self) -> &Stub {
        match self {
            MethodEntry::Direct(stub) => stub,
            MethodEntry::WithOptions(options) => &options.response,
        }
    }

    pub fn delay(&self) -> Option<DelayRange> {
        match self {
            MethodEntry::Direct(_) => None,
            MethodEntry::WithOptions(options) => options.delay,
        }
    }

    pub fn headers(&self) -> Option<&HeaderOverrides> {
        match self {
            MethodEntry::Direct(_) => None,
            MethodEntry::WithOptions(options) => options.headers.as_ref(),
        }
    }
}

/// An API path pattern's declarations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawRoute")]
pub struct Route {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderOverrides>,
    /// Upper-cased method name -> entry.
    #[serde(flatten)]
    pub methods: BTreeMap<String, MethodEntry>,
}

impl Route {
    /// Case-insensitive lookup of a method entry.
    pub fn method_entry(&self, method: &str) -> Option<&MethodEntry> {
        self.methods.get(&method.to_ascii_uppercase())
    }
}

#[derive(Deserialize)]
struct RawRoute {
    #[serde(default)]
    delay: Option<DelayRange>,
    #[serde(default)]
    headers: Option<HeaderOverrides>,
    #[serde(flatten)]
    methods: BTreeMap<String, MethodEntry>,
}

impl TryFrom<RawRoute> for Route {
    type Error = String;

    fn try_from(raw: RawRoute) -> Result<Self, Self::Error> {
        let mut methods = BTreeMap::new();
        for (name, entry) in raw.methods {
            let key = name.to_ascii_uppercase();
            if methods.insert(key.clone(), entry).is_some() {
                return Err(format!("method '{key}' is declared more than once"));
            }
        }
        Ok(Route {
            delay: raw.delay,
            headers: raw.headers,
            methods,
        })
    }
}
