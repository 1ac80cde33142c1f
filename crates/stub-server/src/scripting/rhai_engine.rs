use rhai::{Dynamic, Engine, Map, Scope, AST};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{HandlerResponse, ScriptModule};
use crate::error::StubError;
use crate::stub::{ParsedBody, StubRequest};

/// Name of the function that turns a script resource into a request handler.
pub const HANDLER_FN: &str = "handle";

/// Rhai engine wrapper for dynamic stubs and handler resources.
pub struct RhaiEngine;

impl RhaiEngine {
    pub fn create_engine() -> Engine {
        let mut engine = Engine::new();
        engine.set_max_expr_depths(64, 64);
        engine
    }

    /// Evaluate a dynamic stub script and return the target string.
    ///
    /// Changes the script makes to `request.headers` are written back onto
    /// `request`.
    pub fn eval_stub(script: &str, request: &mut StubRequest) -> Result<String, StubError> {
        let engine = Self::create_engine();
        let mut scope = Scope::new();
        scope.push("request", request_to_map(request));

        let result: Dynamic = engine
            .eval_with_scope(&mut scope, script)
            .map_err(|e| StubError::script("dynamic stub", e))?;

        if let Some(map) = scope.get_value::<Map>("request") {
            write_back_headers(&map, request)?;
        }

        let type_name = result.type_name();
        result.try_cast::<String>().ok_or_else(|| {
            StubError::script(
                "dynamic stub",
                format!("script must evaluate to a string, got {type_name}"),
            )
        })
    }

    /// Compile a script resource. Scripts defining `fn handle(request)` become
    /// handlers; any other script is evaluated once and its value is the data.
    pub fn load_module(source: &str, origin: &str) -> Result<ScriptModule, StubError> {
        let engine = Self::create_engine();
        let ast = engine
            .compile(source)
            .map_err(|e| StubError::script(origin, e))?;

        let is_handler = ast
            .iter_functions()
            .any(|f| f.name == HANDLER_FN && f.params.len() == 1);

        if is_handler {
            return Ok(ScriptModule::Handler(HandlerScript {
                ast: Arc::new(ast),
                origin: origin.to_string(),
            }));
        }

        let value: Dynamic = engine
            .eval_ast(&ast)
            .map_err(|e| StubError::script(origin, e))?;
        Ok(ScriptModule::Data(dynamic_to_json(value)))
    }
}

/// Compiled script resource exposing `fn handle(request)`.
#[derive(Clone)]
pub struct HandlerScript {
    ast: Arc<AST>,
    origin: String,
}

impl std::fmt::Debug for HandlerScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerScript")
            .field("origin", &self.origin)
            .finish()
    }
}

impl HandlerScript {
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn call(&self, request: &StubRequest) -> Result<HandlerResponse, StubError> {
        let engine = RhaiEngine::create_engine();
        let mut scope = Scope::new();
        let result: Dynamic = engine
            .call_fn(
                &mut scope,
                self.ast.as_ref(),
                HANDLER_FN,
                (request_to_map(request),),
            )
            .map_err(|e| StubError::script(&self.origin, e))?;

        parse_handler_response(result, &self.origin)
    }
}

fn parse_handler_response(result: Dynamic, origin: &str) -> Result<HandlerResponse, StubError> {
    if result.is_unit() {
        return Ok(HandlerResponse::default());
    }

    let Some(map) = result.clone().try_cast::<Map>().filter(is_response_descriptor) else {
        return Ok(HandlerResponse {
            body: Some(dynamic_to_json(result)),
            ..Default::default()
        });
    };

    let mut response = HandlerResponse::default();

    if let Some(status) = map.get("status") {
        let code = status
            .as_int()
            .ok()
            .and_then(|code| u16::try_from(code).ok())
            .and_then(|code| hyper::StatusCode::from_u16(code).ok())
            .ok_or_else(|| {
                StubError::script(origin, format!("handler returned invalid status {status}"))
            })?;
        response.status = code;
    }

    if let Some(headers) = map.get("headers").and_then(|h| h.clone().try_cast::<Map>()) {
        for (name, value) in headers {
            let value = match value.clone().try_cast::<String>() {
                Some(s) => s,
                None => value.to_string(),
            };
            response.headers.push((name.to_string(), value));
        }
    }

    response.body = map
        .get("body")
        .filter(|body| !body.is_unit())
        .map(|body| dynamic_to_json(body.clone()));

    Ok(response)
}

/// A map describes a response only when every key is one of `status`,
/// `headers` or `body` and `status`, if present, is an integer. Any other map
/// is data and becomes the JSON body.
fn is_response_descriptor(map: &Map) -> bool {
    !map.is_empty()
        && map
            .keys()
            .all(|key| matches!(key.as_str(), "status" | "headers" | "body"))
        && map.get("status").map_or(true, |status| status.is_int())
}

/// Build the `request` object scripts see.
pub(crate) fn request_to_map(request: &StubRequest) -> Map {
    let mut map = Map::new();
    map.insert("method".into(), Dynamic::from(request.method.to_string()));
    map.insert("path".into(), Dynamic::from(request.path().to_string()));
    map.insert("url".into(), Dynamic::from(request.url().to_string()));
    map.insert("params".into(), Dynamic::from(string_map(&request.params)));
    map.insert("query".into(), Dynamic::from(string_map(&request.query())));
    map.insert(
        "headers".into(),
        Dynamic::from(string_map(&request.header_pairs())),
    );

    let body = match &request.parsed_body {
        Some(ParsedBody::Json(value)) => json_to_dynamic(value.clone()),
        Some(ParsedBody::Form(pairs)) => {
            Dynamic::from(string_map(&pairs.iter().cloned().collect()))
        }
        None if request.body.is_empty() => Dynamic::UNIT,
        None => Dynamic::from(String::from_utf8_lossy(&request.body).into_owned()),
    };
    map.insert("body".into(), body);
    map
}

fn string_map(values: &BTreeMap<String, String>) -> Map {
    values
        .iter()
        .map(|(k, v)| (k.as_str().into(), Dynamic::from(v.clone())))
        .collect()
}

fn write_back_headers(map: &Map, request: &mut StubRequest) -> Result<(), StubError> {
    let Some(headers) = map.get("headers").and_then(|h| h.clone().try_cast::<Map>()) else {
        return Ok(());
    };

    let before = request.header_pairs();
    let mut after = BTreeMap::new();
    for (name, value) in headers {
        let value = match value.clone().try_cast::<String>() {
            Some(s) => s,
            None => value.to_string(),
        };
        after.insert(name.to_ascii_lowercase(), value);
    }
    if before == after {
        return Ok(());
    }

    for name in before.keys().filter(|name| !after.contains_key(*name)) {
        request.headers.remove(name.as_str());
    }
    for (name, value) in &after {
        if before.get(name) != Some(value) {
            request.set_header(name, value)?;
        }
    }
    Ok(())
}

pub(crate) fn json_to_dynamic(value: Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        Value::String(s) => Dynamic::from(s),
        Value::Array(arr) => {
            let vec: Vec<Dynamic> = arr.into_iter().map(json_to_dynamic).collect();
            Dynamic::from(vec)
        }
        Value::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.into(), json_to_dynamic(v));
            }
            Dynamic::from(map)
        }
    }
}

pub(crate) fn dynamic_to_json(value: Dynamic) -> Value {
    if value.is_unit() {
        Value::Null
    } else if let Ok(b) = value.as_bool() {
        Value::Bool(b)
    } else if let Ok(i) = value.as_int() {
        Value::Number(i.into())
    } else if let Ok(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else if let Some(s) = value.clone().try_cast::<String>() {
        Value::String(s)
    } else if let Some(arr) = value.clone().try_cast::<Vec<Dynamic>>() {
        Value::Array(arr.into_iter().map(dynamic_to_json).collect())
    } else if let Some(map) = value.clone().try_cast::<Map>() {
        let mut obj = serde_json::Map::new();
        for (k, v) in map {
            obj.insert(k.to_string(), dynamic_to_json(v));
        }
        Value::Object(obj)
    } else {
        Value::String(format!("{value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hyper::header::{HeaderValue, CONTENT_TYPE};
    use hyper::{HeaderMap, Method};
    use serde_json::json;

    fn request(uri: &str) -> StubRequest {
        let mut params = BTreeMap::new();
        params.insert("param".to_string(), "send".to_string());
        StubRequest::new(Method::GET, uri.parse().unwrap(), HeaderMap::new(), Bytes::new())
            .with_params(params)
    }

    #[test]
    fn test_eval_stub_uses_params() {
        let mut req = request("/function/send");
        let target = RhaiEngine::eval_stub(
            r#""GET_function_200_OK-" + request.params.param + ".json""#,
            &mut req,
        )
        .unwrap();
        assert_eq!(target, "GET_function_200_OK-send.json");
    }

    #[test]
    fn test_eval_stub_writes_headers_back() {
        let mut req = request("/multiple/methods/headers");
        let target = RhaiEngine::eval_stub(
            r#"
            request.headers.origin = "http://GET.com";
            "readHttpHeaders.rhai"
            "#,
            &mut req,
        )
        .unwrap();
        assert_eq!(target, "readHttpHeaders.rhai");
        assert_eq!(req.headers.get("origin").unwrap(), "http://GET.com");
    }

    #[test]
    fn test_eval_stub_must_return_string() {
        let mut req = request("/x");
        let err = RhaiEngine::eval_stub("42", &mut req).unwrap_err();
        assert!(err.to_string().contains("must evaluate to a string"));
    }

    #[test]
    fn test_eval_stub_syntax_error() {
        let mut req = request("/x");
        let err = RhaiEngine::eval_stub("let = ;", &mut req).unwrap_err();
        assert_eq!(err.kind(), "ScriptError");
    }

    #[test]
    fn test_load_data_module() {
        let module = RhaiEngine::load_module(r#"#{ stub: "GET_200_OK.rhai" }"#, "t.rhai").unwrap();
        match module {
            ScriptModule::Data(value) => assert_eq!(value, json!({"stub": "GET_200_OK.rhai"})),
            ScriptModule::Handler(_) => panic!("expected data module"),
        }
    }

    #[test]
    fn test_load_handler_module() {
        let source = r#"
            fn handle(request) {
                #{ status: 201, headers: #{ "x-param": request.params.param }, body: #{ param: request.params.param } }
            }
        "#;
        let ScriptModule::Handler(handler) = RhaiEngine::load_module(source, "h.rhai").unwrap()
        else {
            panic!("expected handler module");
        };

        let response = handler.call(&request("/get/express-handler/send")).unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(
            response.headers,
            vec![("x-param".to_string(), "send".to_string())]
        );
        assert_eq!(response.body, Some(json!({"param": "send"})));
    }

    #[test]
    fn test_handler_returning_unit_is_empty_ok() {
        let ScriptModule::Handler(handler) =
            RhaiEngine::load_module("fn handle(request) { }", "h.rhai").unwrap()
        else {
            panic!("expected handler module");
        };
        let response = handler.call(&request("/")).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_none());
    }

    fn handler(source: &str) -> HandlerScript {
        match RhaiEngine::load_module(source, "h.rhai").unwrap() {
            ScriptModule::Handler(handler) => handler,
            ScriptModule::Data(_) => panic!("expected handler module"),
        }
    }

    #[test]
    fn test_handler_data_map_is_body() {
        let response = handler(r#"fn handle(request) { #{ stub: "OK", id: 1 } }"#)
            .call(&request("/"))
            .unwrap();
        assert_eq!(response.status, 200);
        assert!(response.headers.is_empty());
        assert_eq!(response.body, Some(json!({"stub": "OK", "id": 1})));
    }

    #[test]
    fn test_handler_data_map_with_status_field_is_body() {
        let response = handler(r#"fn handle(request) { #{ status: "active", body: "x" } }"#)
            .call(&request("/"))
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Some(json!({"status": "active", "body": "x"})));
    }

    #[test]
    fn test_handler_empty_map_is_body() {
        let response = handler("fn handle(request) { #{} }")
            .call(&request("/"))
            .unwrap();
        assert_eq!(response.body, Some(json!({})));
    }

    #[test]
    fn test_handler_invalid_status() {
        let ScriptModule::Handler(handler) =
            RhaiEngine::load_module("fn handle(request) { #{ status: 7 } }", "h.rhai").unwrap()
        else {
            panic!("expected handler module");
        };
        assert!(handler.call(&request("/")).is_err());
    }

    #[test]
    fn test_request_map_body() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let req = StubRequest::new(
            Method::POST,
            "/post?x=1".parse().unwrap(),
            headers,
            Bytes::from_static(br#"{"name": "stub"}"#),
        );
        let map = request_to_map(&req);
        let body = dynamic_to_json(map.get("body").unwrap().clone());
        assert_eq!(body, json!({"name": "stub"}));
        let query = dynamic_to_json(map.get("query").unwrap().clone());
        assert_eq!(query, json!({"x": "1"}));
        assert_eq!(
            map.get("url").unwrap().clone().try_cast::<String>().unwrap(),
            "/post?x=1"
        );
    }
}
