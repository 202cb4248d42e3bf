//! CORS policy for the RPC endpoints.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any.
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_headers: vec!["X-API-Key".to_string(), "Content-Type".to_string()],
            allowed_methods: vec!["POST".to_string(), "OPTIONS".to_string()],
            max_age: Duration::from_secs(86400),
        }
    }
}

impl CorsConfig {
    /// Default policy for a comma-separated origin list (`"https://a, https://b"`).
    pub fn with_origins(origins: &str) -> Self {
        Self {
            allowed_origins: split_list(origins),
            ..Default::default()
        }
    }

    pub fn layer(&self) -> Result<CorsLayer, String> {
        let origin = if self.allowed_origins.iter().any(|o| o == "*") {
            AllowOrigin::from(Any)
        } else {
            let origins = self
                .allowed_origins
                .iter()
                .map(|o| {
                    HeaderValue::from_str(o).map_err(|e| format!("Invalid CORS origin '{}': {}", o, e))
                })
                .collect::<Result<Vec<_>, _>>()?;
            AllowOrigin::list(origins)
        };

        let headers = self
            .allowed_headers
            .iter()
            .map(|h| {
                HeaderName::from_bytes(h.as_bytes())
                    .map_err(|e| format!("Invalid CORS header '{}': {}", h, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let methods = self
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.as_bytes())
                    .map_err(|e| format!("Invalid CORS method '{}': {}", m, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CorsLayer::new()
            .allow_origin(origin)
            .allow_headers(headers)
            .allow_methods(methods)
            .max_age(self.max_age))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
