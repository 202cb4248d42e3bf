//! Integration tests for the vrpc-cli commands.
//!
//! These exercise the same code paths as the binary against the bundled
//! hello service, without starting an HTTP server.

use vrpc_cli::commands;
use vrpc_cli::commands::call::FileArg;
use vrpc_cli::commands::openapi::Format;
use vrpc_core::schema::openapi::DocumentInfo;
use vrpc_core::INVALID_JSON;

const MAX_MEMORY: u64 = 1 << 20;

#[test]
fn test_paths_render() {
    let registry = commands::init_registry().unwrap();
    let lines = commands::paths::render(&registry);

    assert_eq!(
        lines,
        vec![
            "/hello/v1  [Error1, Error2, Error3]".to_string(),
            "/hello/v2".to_string(),
            "/hello/v3".to_string(),
        ]
    );
}

#[test]
fn test_openapi_json() {
    let registry = commands::init_registry().unwrap();
    let info = DocumentInfo {
        title: "Hello API".to_string(),
        ..DocumentInfo::default()
    };
    let out = commands::openapi::render(&registry, &info, Format::Json).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(doc["openapi"], "3.0.3");
    assert_eq!(doc["info"]["title"], "Hello API");
    assert!(doc["paths"]["/hello/v1"]["post"].is_object());
    assert!(doc["components"]["schemas"]["hello_reqv1"].is_object());
}

#[test]
fn test_openapi_yaml() {
    let registry = commands::init_registry().unwrap();
    let out = commands::openapi::render(&registry, &DocumentInfo::default(), Format::Yaml).unwrap();

    assert!(out.contains("openapi: 3.0.3"));
    assert!(out.contains("/hello/v2:"));
}

#[tokio::test]
async fn test_call_ok() {
    let registry = commands::init_registry().unwrap();
    let result = commands::call::invoke(
        &registry,
        "/hello/v1",
        r#"{"int_param": 100, "str_param": "ab", "struct_param": {"f1": 1}}"#,
        &[],
        MAX_MEMORY,
    )
    .await
    .unwrap();

    let value = result.unwrap();
    assert_eq!(value["message"], "Hello, world");
    assert_eq!(value["data"]["int"], 100);
}

#[tokio::test]
async fn test_call_constraint_error() {
    let registry = commands::init_registry().unwrap();
    let err = commands::call::invoke(
        &registry,
        "/hello/v1",
        r#"{"int_param": 99, "str_param": "ab", "struct_param": {"f1": 1}}"#,
        &[],
        MAX_MEMORY,
    )
    .await
    .unwrap()
    .unwrap_err();

    assert_eq!(err.code, INVALID_JSON);
    assert!(err.message.contains("int_param=99"));
}

#[tokio::test]
async fn test_call_unknown_path() {
    let registry = commands::init_registry().unwrap();
    let result = commands::call::invoke(&registry, "/nope/v1", "{}", &[], MAX_MEMORY).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_call_with_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.bin");
    std::fs::write(&path, vec![7u8; 1500]).unwrap();

    let registry = commands::init_registry().unwrap();
    let files = vec![FileArg {
        field: "content".to_string(),
        path,
    }];
    let value = commands::call::invoke(&registry, "/hello/v3", r#"{"int_param": 5}"#, &files, 512)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(value, serde_json::json!({"int_param": 5, "content_length": 1500}));
}

#[test]
fn test_typescript_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("api.ts");
    let path_str = path.to_str().unwrap();

    let registry = commands::init_registry().unwrap();
    commands::typescript::run(&registry, Some(path_str)).unwrap();

    let code = std::fs::read_to_string(&path).unwrap();
    assert!(code.contains("export type HelloReqV1 = {"));
    assert!(code.contains("public static HelloV1(request: HelloReqV1)"));
    assert!(code.contains("public static HelloV3("));
}
