//! Path routing for declared API patterns.
//!
//! Patterns use the `:name` / `:name?` syntax of route tables and are
//! translated to `matchit` routes. An optional segment registers both the
//! pattern with and without it.

use matchit::Router;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::config::HttpVerb;
use crate::error::StubError;

#[derive(Debug)]
struct RegisteredRoute {
    api_path: String,
    methods: BTreeSet<HttpVerb>,
}

/// A matched request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// Pattern as declared in the route table.
    pub api_path: &'a str,
    /// Verbs registered for the pattern at startup.
    pub methods: &'a BTreeSet<HttpVerb>,
    /// Decoded path parameters.
    pub params: BTreeMap<String, String>,
}

pub struct StubRouter {
    router: Router<usize>,
    routes: Vec<RegisteredRoute>,
    by_pattern: HashMap<String, usize>,
}

impl StubRouter {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            routes: Vec::new(),
            by_pattern: HashMap::new(),
        }
    }

    /// Register `verb` for `pattern`.
    pub fn register(&mut self, verb: HttpVerb, pattern: &str) -> Result<(), StubError> {
        if let Some(&index) = self.by_pattern.get(pattern) {
            self.routes[index].methods.insert(verb);
            return Ok(());
        }

        let index = self.routes.len();
        for route in to_matchit_routes(pattern) {
            debug!("Registering {} as {}", pattern, route);
            self.router
                .insert(route, index)
                .map_err(|e| StubError::InvalidRoutePattern {
                    path: pattern.to_string(),
                    reason: e.to_string(),
                })?;
        }

        self.routes.push(RegisteredRoute {
            api_path: pattern.to_string(),
            methods: BTreeSet::from([verb]),
        });
        self.by_pattern.insert(pattern.to_string(), index);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Match `path`. A single trailing slash on either the path or the
    /// declared pattern is ignored. Literal segments match case-sensitively.
    pub fn lookup(&self, path: &str) -> Option<RouteMatch<'_>> {
        let slashed = format!("{path}/");
        let matched = self
            .router
            .at(path)
            .ok()
            .or_else(|| {
                let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty())?;
                self.router.at(trimmed).ok()
            })
            .or_else(|| {
                if path.ends_with('/') {
                    return None;
                }
                self.router.at(&slashed).ok()
            })?;

        let route = &self.routes[*matched.value];
        let params = matched
            .params
            .iter()
            .map(|(name, value)| {
                let decoded = urlencoding::decode(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string());
                (name.to_string(), decoded)
            })
            .collect();

        Some(RouteMatch {
            api_path: &route.api_path,
            methods: &route.methods,
            params,
        })
    }
}

impl Default for StubRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate a `:name` pattern into every `matchit` route it stands for.
fn to_matchit_routes(pattern: &str) -> Vec<String> {
    let mut variants = vec![String::new()];

    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        match segment.strip_prefix(':') {
            Some(param) => match param.strip_suffix('?') {
                Some(name) => {
                    let with: Vec<String> = variants
                        .iter()
                        .map(|prefix| format!("{prefix}/{{{name}}}"))
                        .collect();
                    variants.extend(with);
                }
                None => {
                    for prefix in &mut variants {
                        prefix.push_str(&format!("/{{{param}}}"));
                    }
                }
            },
            None => {
                let literal = segment.replace('{', "{{").replace('}', "}}");
                for prefix in &mut variants {
                    prefix.push('/');
                    prefix.push_str(&literal);
                }
            }
        }
    }

    if pattern.ends_with('/') && pattern.len() > 1 {
        for variant in &mut variants {
            variant.push('/');
        }
    }
    for variant in &mut variants {
        if variant.is_empty() {
            variant.push('/');
        }
    }
    variants.sort();
    variants.dedup();
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_translation() {
        assert_eq!(to_matchit_routes("/get/json"), vec!["/get/json"]);
        assert_eq!(to_matchit_routes("/posts/:id"), vec!["/posts/{id}"]);
        assert_eq!(
            to_matchit_routes("/express/:param?"),
            vec!["/express", "/express/{param}"]
        );
        assert_eq!(to_matchit_routes("/"), vec!["/"]);
        assert_eq!(to_matchit_routes("/:opt?"), vec!["/", "/{opt}"]);
    }

    #[test]
    fn test_lookup_with_params() {
        let mut router = StubRouter::new();
        router.register(HttpVerb::Get, "/posts/:id").unwrap();
        router.register(HttpVerb::Post, "/posts/:id").unwrap();

        let matched = router.lookup("/posts/hello%20world").unwrap();
        assert_eq!(matched.api_path, "/posts/:id");
        assert_eq!(matched.params["id"], "hello world");
        assert_eq!(
            matched.methods.iter().copied().collect::<Vec<_>>(),
            vec![HttpVerb::Get, HttpVerb::Post]
        );
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_optional_param() {
        let mut router = StubRouter::new();
        router.register(HttpVerb::Get, "/express/:param?").unwrap();

        assert!(router.lookup("/express").unwrap().params.is_empty());
        assert_eq!(router.lookup("/express/send").unwrap().params["param"], "send");
    }

    #[test]
    fn test_trailing_slash_and_misses() {
        let mut router = StubRouter::new();
        router.register(HttpVerb::Get, "/get/json").unwrap();

        assert!(router.lookup("/get/json/").is_some());
        assert!(router.lookup("/get").is_none());
        assert!(router.lookup("/get/json/extra").is_none());
    }

    #[test]
    fn test_pattern_with_trailing_slash() {
        let mut router = StubRouter::new();
        router.register(HttpVerb::Get, "/api/").unwrap();
        router.register(HttpVerb::Get, "/users/:id/").unwrap();

        assert_eq!(router.lookup("/api").unwrap().api_path, "/api/");
        assert!(router.lookup("/api/").is_some());
        assert_eq!(router.lookup("/users/7").unwrap().params["id"], "7");
    }

    #[test]
    fn test_literal_segments_are_case_sensitive() {
        let mut router = StubRouter::new();
        router.register(HttpVerb::Get, "/get/json").unwrap();

        assert!(router.lookup("/GET/JSON").is_none());
    }

    #[test]
    fn test_conflicting_patterns() {
        let mut router = StubRouter::new();
        router.register(HttpVerb::Get, "/a/:id").unwrap();
        let err = router.register(HttpVerb::Get, "/a/:name").unwrap_err();
        assert_eq!(err.kind(), "InvalidRoutePattern");
    }
}
