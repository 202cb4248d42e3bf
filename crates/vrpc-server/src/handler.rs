//! POST dispatch for registered method paths.
//!
//! | outcome                      | status | body                       |
//! |------------------------------|--------|----------------------------|
//! | not a POST                   | 405    | `Method Not Allowed`       |
//! | unknown path                 | 404    | `404 page not found`       |
//! | structured error             | 400    | `{"code", "message"?, ...}`|
//! | any other failure            | 500    | `Internal Server Error`    |
//! | success                      | 200    | JSON response              |

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use vrpc_core::pipeline::BoxError;
use vrpc_core::{BodyStream, CallContext, CallError};

use crate::compression;
use crate::state::AppState;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

lazy_static! {
    static ref BOUNDARY: Regex = Regex::new(r";.*boundary=(.*)").unwrap();
}

/// Multipart boundary from a `Content-Type` value.
pub fn boundary(content_type: &str) -> Option<String> {
    BOUNDARY
        .captures(content_type)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    }

    let Some(descriptor) = state.registry.get(uri.path()) else {
        return (StatusCode::NOT_FOUND, "404 page not found").into_response();
    };

    let boundary = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(boundary);

    let body: BodyStream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(|e| Box::new(e) as BoxError))
        .boxed();

    let mut ctx = CallContext::new(descriptor.path());
    if let Some(timeout) = state.request_timeout {
        ctx = ctx.with_timeout(timeout);
    }
    if let Some(dir) = &state.spool_dir {
        ctx = ctx.with_spool_dir(dir);
    }

    match descriptor
        .call(ctx, body, boundary.as_deref(), state.max_memory)
        .await
    {
        Ok(value) => {
            let gzip = state.gzip
                && headers
                    .get(header::ACCEPT_ENCODING)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(compression::accepts_gzip);
            json_response(StatusCode::OK, &value, gzip)
        }
        Err(CallError::Rpc(err)) => json_response(StatusCode::BAD_REQUEST, &err, false),
        Err(err) => {
            tracing::error!(path = %descriptor.path(), error = %err, "Cannot call method");
            internal_error()
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: &T, gzip: bool) -> Response {
    let mut body = match serde_json::to_vec(value) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Cannot marshal response");
            return internal_error();
        }
    };
    body.push(b'\n');

    let mut response = if gzip {
        match compression::gzip(&body) {
            Ok(compressed) => {
                let mut response = (status, compressed).into_response();
                response
                    .headers_mut()
                    .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot compress response");
                return internal_error();
            }
        }
    } else {
        (status, body).into_response()
    };

    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
