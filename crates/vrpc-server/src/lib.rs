//! vrpc Server - HTTP transport for a vrpc method registry
//!
//! Serves every registered method as `POST <path>` via axum, plus optional:
//! - gzip response encoding with a randomized header filename
//! - a CORS policy (tower-http)
//! - GET endpoints for the OpenAPI document and the TypeScript client
//!
//! The core pipeline lives in `vrpc-core`; this crate only maps HTTP onto it.

pub mod compression;
pub mod cors;
pub mod docs;
pub mod handler;
pub mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use vrpc_core::schema::openapi::DocumentInfo;
use vrpc_core::Registry;

pub use cors::CorsConfig;
use self::state::{AppState, AppStateInner};

/// File parts above this size are spooled to disk.
pub const DEFAULT_MAX_MEMORY: u64 = 32 << 20;

/// Configuration for the vrpc HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_memory: u64,
    /// Directory for spooled uploads; the system temp directory when unset.
    pub spool_dir: Option<PathBuf>,
    /// Gzip successful responses for clients that accept it.
    pub gzip: bool,
    /// Deadline applied to every call.
    pub request_timeout: Option<Duration>,
    pub cors: Option<CorsConfig>,
    /// GET path for the OpenAPI document; `None` disables it.
    pub openapi_path: Option<String>,
    /// GET path for the TypeScript client; `None` disables it.
    pub typescript_path: Option<String>,
    pub document: DocumentInfo,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_memory: DEFAULT_MAX_MEMORY,
            spool_dir: None,
            gzip: true,
            request_timeout: None,
            cors: None,
            openapi_path: Some("/openapi.json".to_string()),
            typescript_path: Some("/api.ts".to_string()),
            document: DocumentInfo::default(),
        }
    }
}

/// Build the application router for `registry`.
pub fn build_router(config: &ServerConfig, registry: Registry) -> Result<Router, String> {
    let state: AppState = Arc::new(AppStateInner {
        registry,
        max_memory: config.max_memory,
        spool_dir: config.spool_dir.clone(),
        gzip: config.gzip,
        request_timeout: config.request_timeout,
        document: config.document.clone(),
    });

    let mut app: Router<AppState> = Router::new();

    let doc_paths = [&config.openapi_path, &config.typescript_path];
    for path in doc_paths.iter().filter_map(|p| p.as_deref()) {
        if !path.starts_with('/') {
            return Err(format!("Invalid endpoint path '{}': must start with '/'", path));
        }
        if state.registry.get(path).is_some() {
            return Err(format!("Endpoint path '{}' is a method path", path));
        }
    }
    if config.openapi_path.is_some() && config.openapi_path == config.typescript_path {
        return Err("OpenAPI and TypeScript endpoints must use different paths".to_string());
    }

    if let Some(path) = &config.openapi_path {
        app = app.route(path, get(docs::openapi));
    }
    if let Some(path) = &config.typescript_path {
        app = app.route(path, get(docs::typescript));
    }

    let mut app = app
        .fallback(handler::dispatch)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = &config.cors {
        app = app.layer(cors.layer()?);
    }

    Ok(app.with_state(state))
}

/// Start the HTTP server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig, registry: Registry) -> Result<SocketAddr, String> {
    tracing::info!(
        "Starting vrpc server on {}:{} ({} methods)",
        config.host,
        config.port,
        registry.len()
    );

    let app = build_router(&config, registry)?;

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("vrpc server listening on {}", local_addr);

    // Spawn the server in a background task
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}
