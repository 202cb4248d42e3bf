//! Error taxonomy shared by the registry and the request pipeline.
//!
//! - [`RegistrationError`]: programmer errors found while registering a
//!   service. They must stop startup.
//! - [`RpcError`]: the structured, client-facing error (`code`, `message`,
//!   `data`). Produced for malformed/invalid bodies (`INVALID_JSON`) and by
//!   handlers through an error catalog.
//! - [`CallError`]: everything `MethodDescriptor::call` can return. Only the
//!   `Rpc` variant is ever shown to a caller verbatim.

use serde::{Deserialize, Serialize};

use crate::constraint::ConstraintError;
use crate::reflect::{FieldInfo, Reflect, StructInfo, TypeInfo};
use crate::schema::SchemaError;

/// Code shared by "unparsable body" and "body violates declared constraints".
pub const INVALID_JSON: &str = "INVALID_JSON";

/// Structured error returned to the caller with HTTP status 400.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct RpcError {
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Build an `INVALID_JSON` error.
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::new(INVALID_JSON, message)
    }

    /// Attach an arbitrary payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl Reflect for RpcError {
    fn type_info() -> TypeInfo {
        StructInfo::new("vrpc", "Error")
            .field(FieldInfo::new::<String>("code").desc("Error code"))
            .field(FieldInfo::new::<String>("message").desc("Human readable message"))
            .field(FieldInfo::new::<serde_json::Value>("data").desc("Additional error data"))
            .into()
    }
}

/// Failure of a single method call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Client-facing structured error; passed through untouched.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The caller-supplied deadline expired before the pipeline finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Anything else. Logged server-side, never shown to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CallError {
    pub fn internal(message: impl std::fmt::Display) -> Self {
        CallError::Internal(anyhow::anyhow!("{}", message))
    }

    /// The structured error, if this is one.
    pub fn as_rpc(&self) -> Option<&RpcError> {
        match self {
            CallError::Rpc(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CallError {
    fn from(err: std::io::Error) -> Self {
        CallError::Internal(err.into())
    }
}

/// Fatal problem found while registering a service.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("invalid trim prefix '{prefix}' for '{module}'")]
    TrimPrefix { prefix: String, module: String },

    #[error("invalid method {method} signature: {reason}")]
    Signature { method: String, reason: String },

    #[error("invalid errors declaration {accessor}: {reason}")]
    ErrorCatalog { accessor: String, reason: String },

    #[error("invalid constraint on {path}: {source}")]
    Constraint {
        path: String,
        #[source]
        source: ConstraintError,
    },

    #[error("cannot document {path}: {source}")]
    Schema {
        path: String,
        #[source]
        source: SchemaError,
    },
}
