//! End-to-end dispatch without a socket: `IncomingRequest` in, `HttpReply`
//! out.

use restroute::dispatcher::{Dispatcher, HandlerRequest, HandlerResult, Reply};
use restroute::error::ServiceError;
use restroute::methods::{GET, POST};
use restroute::router::RouteTable;
use restroute::server::request::canonicalize_json;
use restroute::server::{ContentType, HttpReply, IncomingRequest, NormalizeConfig};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Echo every normalized input back as JSON.
fn echo(req: HandlerRequest) -> HandlerResult {
    Ok(Reply::json(json!({
        "method": req.method.as_str(),
        "route": req.route,
        "path": req.path,
        "path_params": req.path_params_map(),
        "query_params": req.query_params_map(),
        "form_params": req.form_params_map(),
        "body": String::from_utf8_lossy(&req.body),
        "content_type": req.get_header("content-type"),
        "has_session": req.session.is_some(),
    })))
}

fn tracking_handler(called: Arc<AtomicBool>) -> impl Fn(HandlerRequest) -> HandlerResult {
    move |_req: HandlerRequest| -> HandlerResult {
        called.store(true, Ordering::SeqCst);
        Ok(Reply::json("reached"))
    }
}

fn dispatcher_with(config: NormalizeConfig) -> Dispatcher {
    let mut routes = RouteTable::new();
    routes.register(GET, "/echo", echo).unwrap();
    routes.register(POST, "/echo", echo).unwrap();
    routes.register(GET, "/echo/{a}/{b}", echo).unwrap();
    Dispatcher::with_config(routes, config)
}

fn dispatcher() -> Dispatcher {
    dispatcher_with(NormalizeConfig::default())
}

fn json_body(reply: &HttpReply) -> Value {
    assert_eq!(reply.content_type, Some(ContentType::Json), "{}", reply.body_str());
    serde_json::from_slice(&reply.body).unwrap()
}

fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for (name, file_name, data) in parts {
        body.push_str(&format!("--{boundary}\r\n"));
        match file_name {
            Some(file) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n\
                 Content-Type: application/octet-stream\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n"
            )),
        }
        body.push_str(&format!("\r\n{data}\r\n"));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body.into_bytes()
}

#[test]
fn test_plain_request_has_empty_maps() {
    let reply = dispatcher().dispatch(&IncomingRequest::new("GET", "/echo"));
    assert_eq!(reply.status, 200);
    let body = json_body(&reply);
    assert_eq!(body["path_params"], json!({}));
    assert_eq!(body["query_params"], json!({}));
    assert_eq!(body["form_params"], json!({}));
    assert_eq!(body["body"], "");
    assert_eq!(body["has_session"], false);
}

#[test]
fn test_path_and_query_params() {
    let reply = dispatcher().dispatch(&IncomingRequest::new(
        "GET",
        "/echo/left/right?x=1&y=two%20words&x=2",
    ));
    let body = json_body(&reply);
    assert_eq!(body["route"], "/echo/{a}/{b}");
    assert_eq!(body["path"], "/echo/left/right");
    assert_eq!(body["path_params"], json!({ "a": "left", "b": "right" }));
    assert_eq!(body["query_params"], json!({ "x": "1", "y": "two words" }));
}

#[test]
fn test_json_body_is_canonicalized() {
    let req = IncomingRequest::new("POST", "/echo")
        .with_header("Content-Type", "application/json")
        .with_body("{ \"a\" : [1,  2],\n  \"b\" : { \"c\": null } }");
    let body = json_body(&dispatcher().dispatch(&req));
    assert_eq!(body["body"], r#"{"a":[1,2],"b":{"c":null}}"#);
}

#[test]
fn test_json_canonicalization_preserves_value() {
    let bodies = [
        r#"{"pi": 3.141592653589793, "small": 1.5e-10, "neg": -0.25, "big": 6.02e23}"#,
        r#"{"text": "caf\u00e9 \ud83d\ude00", "tab": "a\tb", "quote": "\"q\""}"#,
        r#"{"max": 18446744073709551615, "min": -9223372036854775808, "huge": 1e300}"#,
        r#"[[1, [2, [3, [4, []]]]], {"a": [{"b": [null, true, false]}]}]"#,
        r#"{"dup": 1, "other": "x", "dup": 2}"#,
        "  \"just a string\"  ",
        "0",
    ];
    let d = dispatcher();

    for raw in bodies {
        let original: Value = serde_json::from_str(raw).unwrap();
        let req = IncomingRequest::new("POST", "/echo")
            .with_header("Content-Type", "application/json")
            .with_body(raw);
        let reply = d.dispatch(&req);
        assert_eq!(reply.status, 200, "{raw}: {}", reply.body_str());

        let canonical = json_body(&reply)["body"].as_str().unwrap().to_string();
        let reparsed: Value = serde_json::from_str(&canonical).unwrap();
        assert_eq!(reparsed, original, "{raw}");
        assert_eq!(
            canonicalize_json(canonical.as_bytes()).unwrap(),
            canonical.as_bytes(),
            "canonical form of {raw} is not stable"
        );
    }
}

#[test]
fn test_json_nesting_beyond_parser_depth_is_400() {
    let shallow = format!("{}{}", "[".repeat(100), "]".repeat(100));
    let deep = format!("{}{}", "[".repeat(200), "]".repeat(200));
    let d = dispatcher();
    let post = |body: &str| {
        IncomingRequest::new("POST", "/echo")
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    };

    assert_eq!(d.dispatch(&post(&shallow)).status, 200);

    let reply = d.dispatch(&post(&deep));
    assert_eq!(reply.status, 400);
    assert!(reply.body_str().contains("recursion limit"), "{}", reply.body_str());
}

#[test]
fn test_repeated_path_variable_reads_last_segment() {
    let mut routes = RouteTable::new();
    routes
        .register(GET, "/a/{id}/b/{id}", |req: HandlerRequest| -> HandlerResult {
            Ok(Reply::json(json!({
                "accessor": req.get_path_param("id"),
                "map": req.path_params_map().get("id"),
                "count": req.path_params.len(),
            })))
        })
        .unwrap();

    let reply =
        Dispatcher::new(routes).dispatch(&IncomingRequest::new("GET", "/a/first/b/second"));
    let body = json_body(&reply);
    assert_eq!(body["accessor"], "second");
    assert_eq!(body["map"], "second");
    assert_eq!(body["count"], 2);
}

#[test]
fn test_body_without_content_type_must_be_json() {
    let req = IncomingRequest::new("POST", "/echo").with_body("not json");
    let reply = dispatcher().dispatch(&req);
    assert_eq!(reply.status, 400);
    assert_eq!(reply.content_type, Some(ContentType::Text));
}

#[test]
fn test_urlencoded_form_first_value_wins() {
    let req = IncomingRequest::new("POST", "/echo")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("name=alice&name=bob&city=K%C3%B6ln");
    let body = json_body(&dispatcher().dispatch(&req));
    assert_eq!(body["form_params"], json!({ "name": "alice", "city": "Köln" }));
    assert_eq!(body["body"], "name=alice&name=bob&city=K%C3%B6ln");
}

#[test]
fn test_multipart_fields_parsed_and_files_skipped() {
    let boundary = "XyZ123";
    let req = IncomingRequest::new("POST", "/echo")
        .with_header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .with_body(multipart_body(
            boundary,
            &[
                ("userid", None, "u1"),
                ("upload", Some("a.bin"), "binary-ish"),
                ("userid", None, "u2"),
                ("ort", None, "Berlin"),
            ],
        ));
    let body = json_body(&dispatcher().dispatch(&req));
    assert_eq!(body["form_params"], json!({ "userid": "u1", "ort": "Berlin" }));
}

#[test]
fn test_multipart_memory_bound_exceeded_is_400() {
    let boundary = "b";
    let big = "x".repeat(64);
    let req = IncomingRequest::new("POST", "/echo")
        .with_header("Content-Type", "multipart/form-data; boundary=b")
        .with_body(multipart_body(boundary, &[("field", None, &big)]));
    let reply = dispatcher_with(NormalizeConfig {
        max_form_memory: 16,
    })
    .dispatch(&req);
    assert_eq!(reply.status, 400);
    assert!(reply.body_str().contains("multipart"), "{}", reply.body_str());
}

#[test]
fn test_malformed_multipart_is_400() {
    let req = IncomingRequest::new("POST", "/echo")
        .with_header("Content-Type", "multipart/form-data; boundary=b")
        .with_body("garbage without framing");
    assert_eq!(dispatcher().dispatch(&req).status, 400);
}

#[test]
fn test_headers_lowercased_for_handler() {
    let req = IncomingRequest::new("GET", "/echo").with_header("CONTENT-TYPE", "text/plain");
    let body = json_body(&dispatcher().dispatch(&req));
    assert_eq!(body["content_type"], "text/plain");
}

#[test]
fn test_routing_errors_are_plain_text() {
    let d = dispatcher();

    let reply = d.dispatch(&IncomingRequest::new("GET", "/missing"));
    assert_eq!(reply.status, 404);
    assert_eq!(reply.body_str(), "could not be found");

    let reply = d.dispatch(&IncomingRequest::new("DELETE", "/echo"));
    assert_eq!(reply.status, 405);
    assert_eq!(reply.body_str(), "method not allowed; allowed: GET, POST");
}

#[test]
fn test_handler_not_invoked_on_routing_failure() {
    let called = Arc::new(AtomicBool::new(false));
    let mut routes = RouteTable::new();
    routes
        .register(GET, "/items/{id}", tracking_handler(Arc::clone(&called)))
        .unwrap();
    let d = Dispatcher::new(routes);

    for method in ["POST", "PUT", "DELETE", "PROPFIND"] {
        let reply = d.dispatch(&IncomingRequest::new(method, "/items/7"));
        assert_eq!(reply.status, 405, "{method}");
        assert_eq!(reply.body_str(), "method not allowed; allowed: GET");
    }
    assert_eq!(d.dispatch(&IncomingRequest::new("GET", "/items/bad_id")).status, 404);
    assert!(!called.load(Ordering::SeqCst));

    assert_eq!(d.dispatch(&IncomingRequest::new("GET", "/items/7")).status, 200);
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn test_handler_service_error_passes_through() {
    let mut routes = RouteTable::new();
    routes
        .register(GET, "/teapot", |_req: HandlerRequest| -> HandlerResult {
            Err(ServiceError::new(418, "short and stout"))
        })
        .unwrap();
    let reply = Dispatcher::new(routes).dispatch(&IncomingRequest::new("GET", "/teapot"));
    assert_eq!(reply.status, 418);
    assert_eq!(reply.body_str(), "short and stout");
}

#[test]
fn test_handler_panic_is_500() {
    let mut routes = RouteTable::new();
    routes
        .register(GET, "/boom", |_req: HandlerRequest| -> HandlerResult {
            panic!("kaboom")
        })
        .unwrap();
    routes.register(GET, "/fine", echo).unwrap();
    let d = Dispatcher::new(routes);

    let reply = d.dispatch(&IncomingRequest::new("GET", "/boom"));
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body_str(), "handler panicked");

    // The dispatcher keeps serving after a panic.
    assert_eq!(d.dispatch(&IncomingRequest::new("GET", "/fine")).status, 200);
}

#[test]
fn test_unserializable_reply_is_500_with_serde_message() {
    let mut routes = RouteTable::new();
    routes
        .register(GET, "/bad", |_req: HandlerRequest| -> HandlerResult {
            let mut map = HashMap::new();
            map.insert((1, 2), "tuple keys are not JSON");
            Ok(Reply::json(map))
        })
        .unwrap();
    let reply = Dispatcher::new(routes).dispatch(&IncomingRequest::new("GET", "/bad"));
    assert_eq!(reply.status, 500);
    assert_eq!(reply.content_type, Some(ContentType::Text));
    assert!(reply.body_str().contains("key must be a string"), "{}", reply.body_str());
}

#[test]
fn test_body_json_helper() {
    #[derive(Deserialize)]
    struct Login {
        user: String,
    }

    let mut routes = RouteTable::new();
    routes
        .register(POST, "/login", |req: HandlerRequest| -> HandlerResult {
            let login: Login = req.body_json()?;
            Ok(Reply::json(login.user))
        })
        .unwrap();
    let d = Dispatcher::new(routes);

    let ok = d.dispatch(
        &IncomingRequest::new("POST", "/login")
            .with_header("content-type", "application/json")
            .with_body(r#"{"user":"alice"}"#),
    );
    assert_eq!(ok.body, br#""alice""#);

    let bad = d.dispatch(
        &IncomingRequest::new("POST", "/login")
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"alice"}"#),
    );
    assert_eq!(bad.status, 400);
}

#[test]
fn test_request_id_header_reaches_handler() {
    let id = restroute::RequestId::new();
    let mut routes = RouteTable::new();
    routes
        .register(GET, "/id", |req: HandlerRequest| -> HandlerResult {
            Ok(Reply::json(req.request_id.to_string()))
        })
        .unwrap();
    let reply = Dispatcher::new(routes)
        .dispatch(&IncomingRequest::new("GET", "/id").with_header("X-Request-Id", id.to_string()));
    assert_eq!(json_body(&reply), json!(id.to_string()));
}
