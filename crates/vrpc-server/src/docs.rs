//! GET endpoints serving the generated documentation and client.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

const TYPESCRIPT_CONTENT_TYPE: &str = "application/typescript; charset=utf-8";

/// GET: OpenAPI document for every registered method.
pub async fn openapi(State(state): State<AppState>) -> Response {
    match state.registry.openapi(&state.document) {
        Ok(doc) => Json(doc).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Cannot build OpenAPI document");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// GET: TypeScript client for every registered method.
pub async fn typescript(State(state): State<AppState>) -> Response {
    match state.registry.typescript() {
        Ok(code) => ([(header::CONTENT_TYPE, TYPESCRIPT_CONTENT_TYPE)], code).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Cannot build TypeScript client");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
