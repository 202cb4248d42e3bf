//! Integration tests for the vrpc HTTP transport.
//!
//! These tests drive the axum router in-process with `oneshot`, using the
//! `hello` demo service as the registered method set.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;

use vrpc_core::{
    CallContext, CallError, FieldInfo, Methods, Reflect, RpcRequest, Service, StructInfo, TypeInfo,
};
use vrpc_server::{build_router, CorsConfig, ServerConfig};

fn app_with(config: ServerConfig) -> Router {
    let registry = vrpc_hello::registry().expect("Failed to register demo services");
    build_router(&config, registry).expect("Failed to build router")
}

fn app() -> Router {
    app_with(ServerConfig::default())
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    let value = serde_json::from_slice(&body).expect("Expected a JSON body");
    (status, value)
}

fn valid_v1() -> Value {
    json!({
        "int_param": 150,
        "str_param": "hello",
        "arr_param": ["a", "b"],
        "struct_param": {"f1": 10}
    })
}

// ---------------------------------------------------------------------------
// JSON methods
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_v1_ok() {
    let (status, headers, body) = send(app(), post_json("/hello/v1", valid_v1())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/json; charset=utf-8"
    );
    assert!(headers.get(header::CONTENT_ENCODING).is_none());

    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        value,
        json!({"message": "Hello, world", "data": {"int": 150, "str": "hello"}})
    );
    assert_eq!(body.last(), Some(&b'\n'));
}

#[tokio::test]
async fn test_trailing_slash_is_tolerated() {
    let (status, _) = send_json(app(), post_json("/hello/v1/", valid_v1())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_json() {
    let request = Request::builder()
        .method("POST")
        .uri("/hello/v1")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, value) = send_json(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "INVALID_JSON");
}

#[tokio::test]
async fn test_wrong_field_type() {
    let (status, value) =
        send_json(app(), post_json("/hello/v2", json!({"int_param": "not a number"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "INVALID_JSON");
}

#[tokio::test]
async fn test_constraints() {
    let cases = [
        (99, Some("int_param=99 is less than required minimum 100")),
        (201, Some("int_param=201 is greater than required maximum 200")),
        (100, None),
        (200, None),
    ];

    for (int_param, expected) in cases {
        let mut body = valid_v1();
        body["int_param"] = json!(int_param);
        let (status, value) = send_json(app(), post_json("/hello/v1", body)).await;
        match expected {
            Some(message) => {
                assert_eq!(status, StatusCode::BAD_REQUEST, "int_param={}", int_param);
                assert_eq!(value, json!({"code": "INVALID_JSON", "message": message}));
            }
            None => assert_eq!(status, StatusCode::OK, "int_param={}", int_param),
        }
    }
}

#[tokio::test]
async fn test_pattern_constraint() {
    let mut body = valid_v1();
    body["str_param"] = json!("a");
    let (status, value) = send_json(app(), post_json("/hello/v1", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["message"], "str_param=a does not match the pattern .{2,}");
}

#[tokio::test]
async fn test_business_error() {
    let mut body = valid_v1();
    body["with_err"] = json!(true);
    let (status, value) = send_json(app(), post_json("/hello/v1", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value, json!({"code": "Error1", "message": "test"}));
}

#[tokio::test]
async fn test_scalar_response() {
    let (status, value) = send_json(app(), post_json("/hello/v2", json!({"int_param": 42}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!(42));
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unknown_path() {
    let (status, _, _) = send(app(), post_json("/hello/v9", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_method_not_allowed() {
    let request = Request::builder()
        .method("GET")
        .uri("/hello/v1")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, b"Method Not Allowed");
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "vrpc-test-boundary";

fn multipart_request(json_data: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"json_data\"\r\n\r\n");
    body.extend_from_slice(json_data.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"content\"; filename=\"data.bin\"\r\n\
          Content-Type: application/octet-stream\r\n\r\n",
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/hello/v3")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_multipart_in_memory() {
    let content = vec![b'x'; 1000];
    let (status, value) = send_json(app(), multipart_request(r#"{"int_param": 7}"#, &content)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({"int_param": 7, "content_length": 1000}));
}

#[tokio::test]
async fn test_multipart_spooled() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        max_memory: 64,
        spool_dir: Some(dir.path().to_path_buf()),
        ..ServerConfig::default()
    };
    let content = vec![b'y'; 10_000];
    let (status, value) =
        send_json(app_with(config), multipart_request(r#"{"int_param": 7}"#, &content)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({"int_param": 7, "content_length": 10_000}));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_multipart_bad_json_part() {
    let (status, value) = send_json(app(), multipart_request("{oops", b"abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "INVALID_JSON");
}

// ---------------------------------------------------------------------------
// Internal failures
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct FaultyReq {
    delay_ms: u64,
}

impl Reflect for FaultyReq {
    fn type_info() -> TypeInfo {
        StructInfo::new("vrpc_hello::faulty", "FaultyReq")
            .field(FieldInfo::new::<u64>("delay_ms"))
            .into()
    }
}

impl RpcRequest for FaultyReq {}

struct Faulty;

impl Faulty {
    async fn v1(self: Arc<Self>, _ctx: CallContext, _req: FaultyReq) -> Result<i64, CallError> {
        Err(CallError::internal("connection refused: password=hunter2"))
    }

    async fn v2(self: Arc<Self>, _ctx: CallContext, req: FaultyReq) -> Result<i64, CallError> {
        tokio::time::sleep(Duration::from_millis(req.delay_ms)).await;
        Ok(0)
    }
}

impl Service for Faulty {
    fn module_path(&self) -> &str {
        "vrpc_hello::faulty"
    }

    fn methods(&self, m: &mut Methods<Self>) {
        m.method("V1", Self::v1).method("V2", Self::v2);
    }
}

fn faulty_app(config: ServerConfig) -> Router {
    let mut registry = vrpc_hello::registry().expect("Failed to register demo services");
    registry.register(Faulty).expect("Failed to register faulty service");
    build_router(&config, registry).expect("Failed to build router")
}

#[tokio::test]
async fn test_internal_error_hides_details() {
    let (status, _, body) = send(
        faulty_app(ServerConfig::default()),
        post_json("/faulty/v1", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(String::from_utf8(body).unwrap(), "Internal Server Error");
}

#[tokio::test]
async fn test_request_timeout() {
    let config = ServerConfig {
        request_timeout: Some(Duration::from_millis(50)),
        ..ServerConfig::default()
    };

    let (status, _, body) = send(
        faulty_app(config.clone()),
        post_json("/faulty/v2", json!({"delay_ms": 5000})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Internal Server Error");

    let (status, value) =
        send_json(faulty_app(config), post_json("/faulty/v2", json!({"delay_ms": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!(0));
}

// ---------------------------------------------------------------------------
// Response encoding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_gzip_response() {
    let mut request = post_json("/hello/v2", json!({"int_param": 5}));
    request
        .headers_mut()
        .insert(header::ACCEPT_ENCODING, "deflate,gzip".parse().unwrap());

    let (status, headers, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_ENCODING], "gzip");

    let mut decoder = flate2::read::GzDecoder::new(&body[..]);
    let mut text = String::new();
    decoder.read_to_string(&mut text).unwrap();
    assert_eq!(text, "5\n");
    let filename = decoder.header().and_then(|h| h.filename()).unwrap();
    assert_eq!(filename.len(), 32);
}

#[tokio::test]
async fn test_gzip_token_must_match_whole_element() {
    let mut request = post_json("/hello/v2", json!({"int_param": 5}));
    request
        .headers_mut()
        .insert(header::ACCEPT_ENCODING, "testgzip".parse().unwrap());
    let (_, headers, body) = send(app(), request).await;
    assert!(headers.get(header::CONTENT_ENCODING).is_none());
    assert_eq!(body, b"5\n");
}

#[tokio::test]
async fn test_gzip_disabled() {
    let config = ServerConfig {
        gzip: false,
        ..ServerConfig::default()
    };
    let mut request = post_json("/hello/v2", json!({"int_param": 5}));
    request
        .headers_mut()
        .insert(header::ACCEPT_ENCODING, "gzip".parse().unwrap());
    let (_, headers, _) = send(app_with(config), request).await;
    assert!(headers.get(header::CONTENT_ENCODING).is_none());
}

#[tokio::test]
async fn test_cors_preflight() {
    let config = ServerConfig {
        cors: Some(CorsConfig::with_origins("https://app.example")),
        ..ServerConfig::default()
    };
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/hello/v1")
        .header(header::ORIGIN, "https://app.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(app_with(config), request).await;
    assert!(status.is_success());
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
}

// ---------------------------------------------------------------------------
// Documentation endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_endpoint() {
    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, doc) = send_json(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["openapi"], "3.0.3");

    let paths: Vec<_> = doc["paths"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(paths, vec!["/hello/v1", "/hello/v2", "/hello/v3"]);

    let v3 = &doc["paths"]["/hello/v3"]["post"]["requestBody"]["content"];
    assert!(v3.get("multipart/form-data").is_some());

    let req = &doc["components"]["schemas"]["hello_reqv1"]["properties"];
    assert_eq!(req["int_param"]["minimum"], 100);
    assert_eq!(req["int_param"]["maximum"], 200);
    assert_eq!(req["str_param"]["pattern"], ".{2,}");

    let upload = &doc["components"]["schemas"]["hello_reqv3"]["properties"];
    assert_eq!(upload["content"]["format"], "binary");
    assert!(upload["json_data"]["properties"].get("int_param").is_some());
}

#[tokio::test]
async fn test_typescript_endpoint() {
    let request = Request::builder()
        .uri("/api.ts")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);

    let code = String::from_utf8(body).unwrap();
    assert!(code.contains("export type HelloReqV1 = {"));
    assert!(code.contains("  struct_ptr_param?: HelloStructV1"));
    assert!(code.contains("public static HelloV3(request: HelloReqV3): Promise<HelloRespV3>"));
    assert!(code.contains("this.post('/hello/v3', request,'multipart/form-data')"));
}

#[test]
fn test_bad_endpoint_path_is_rejected() {
    let config = ServerConfig {
        openapi_path: Some("openapi.json".to_string()),
        ..ServerConfig::default()
    };
    let registry = vrpc_hello::registry().unwrap();
    assert!(build_router(&config, registry).is_err());
}
