//! Per-version error catalogs.
//!
//! A service keeps one plain struct of [`ErrorCode`]s per method version and
//! hands the registry an [`ErrorCatalog`] built from it:
//!
//! ```ignore
//! pub struct ErrorsV1 {
//!     pub not_found: ErrorCode,
//! }
//!
//! impl ErrorsV1 {
//!     pub fn new() -> Self {
//!         Self { not_found: ErrorCode::new("NotFound", "Entity does not exist") }
//!     }
//!
//!     pub fn catalog(&self) -> ErrorCatalog {
//!         ErrorCatalog::new().with(&self.not_found)
//!     }
//! }
//!
//! // in the handler
//! return Err(self.errors_v1.not_found.error("no such user").into());
//! ```

use serde::Serialize;

use crate::error::RpcError;

/// A declared error code bound to its description; constructs structured errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    code: &'static str,
    description: &'static str,
}

impl ErrorCode {
    pub const fn new(code: &'static str, description: &'static str) -> Self {
        Self { code, description }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Structured error carrying this code.
    pub fn error(&self, message: impl Into<String>) -> RpcError {
        RpcError::new(self.code, message)
    }

    /// Structured error carrying this code and a payload.
    ///
    /// A payload that cannot be serialized is dropped.
    pub fn error_with_data(&self, message: impl Into<String>, data: impl Serialize) -> RpcError {
        let mut err = self.error(message);
        err.data = serde_json::to_value(data).ok();
        err
    }
}

/// The set of codes one method version may return.
#[derive(Debug, Clone, Default)]
pub struct ErrorCatalog {
    codes: Vec<ErrorCode>,
}

impl ErrorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: &ErrorCode) -> Self {
        self.codes.push(code.clone());
        self
    }

    pub fn codes(&self) -> &[ErrorCode] {
        &self.codes
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
