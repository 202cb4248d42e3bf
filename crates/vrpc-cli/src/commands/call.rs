//! `vrpc call` — Invoke a method in-process, without HTTP.

use std::path::PathBuf;
use std::str::FromStr;

use vrpc_core::{body_from_bytes, CallContext, CallError, Registry, RpcError};

use super::print_json;

/// `--file <field>=<path>`: upload `path` as the file field `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    pub field: String,
    pub path: PathBuf,
}

impl FromStr for FileArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((field, path)) if !field.is_empty() && !path.is_empty() => Ok(Self {
                field: field.to_string(),
                path: PathBuf::from(path),
            }),
            _ => Err(format!("Expected <field>=<path>, got '{}'", s)),
        }
    }
}

/// Call `path` with `body` (JSON) and optional file uploads.
///
/// The outer error is a CLI failure; the inner one is the method's
/// structured error.
pub async fn invoke(
    registry: &Registry,
    path: &str,
    body: &str,
    files: &[FileArg],
    max_memory: u64,
) -> Result<Result<serde_json::Value, RpcError>, String> {
    let method = registry
        .get(path)
        .ok_or_else(|| format!("Unknown method path: {}", path))?;

    let (bytes, boundary) = if files.is_empty() {
        (body.as_bytes().to_vec(), None)
    } else {
        let boundary = vrpc_server::compression::random_filename();
        (multipart_body(&boundary, body, files).await?, Some(boundary))
    };

    let ctx = CallContext::new(method.path());
    match method
        .call(ctx, body_from_bytes(bytes), boundary.as_deref(), max_memory)
        .await
    {
        Ok(value) => Ok(Ok(value)),
        Err(CallError::Rpc(err)) => Ok(Err(err)),
        Err(err) => Err(format!("Call to {} failed: {}", method.path(), err)),
    }
}

async fn multipart_body(boundary: &str, json: &str, files: &[FileArg]) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();

    out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    out.extend_from_slice(b"Content-Disposition: form-data; name=\"json_data\"\r\n");
    out.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    out.extend_from_slice(json.as_bytes());
    out.extend_from_slice(b"\r\n");

    for file in files {
        let content = tokio::fs::read(&file.path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", file.path.display(), e))?;
        let file_name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                file.field, file_name
            )
            .as_bytes(),
        );
        out.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        out.extend_from_slice(&content);
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    Ok(out)
}

pub async fn run(
    registry: &Registry,
    path: &str,
    body: &str,
    files: &[FileArg],
    max_memory: u64,
) -> Result<(), String> {
    match invoke(registry, path, body, files, max_memory).await? {
        Ok(value) => {
            print_json(&value);
            Ok(())
        }
        Err(err) => {
            print_json(&serde_json::to_value(&err).unwrap_or_default());
            Err(err.to_string())
        }
    }
}
