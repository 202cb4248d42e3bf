//! vrpc Core — versioned RPC methods with typed, self-describing payloads.
//!
//! A service declares its `V<N>` methods together with explicit type
//! descriptors for their request and response payloads. From that single
//! declaration this crate derives:
//!
//! - request decoding (JSON or multipart with file parts) and validation,
//! - an OpenAPI 3.0.3 document,
//! - a TypeScript client.
//!
//! The crate has **no HTTP framework dependency**; `vrpc-server` adapts it to
//! axum.
//!
//! # Example
//!
//! ```ignore
//! use vrpc_core::Registry;
//!
//! let mut registry = Registry::new("my_app::services");
//! registry.register(HelloService::new())?;
//!
//! let method = registry.get("/hello/v1").unwrap();
//! let response = method
//!     .call(CallContext::new(method.path()), body, None, 32 << 20)
//!     .await?;
//! ```

pub mod catalog;
pub mod constraint;
pub mod error;
pub mod file;
pub mod pipeline;
pub mod reflect;
pub mod registry;
pub mod schema;

// Convenience re-exports
pub use catalog::{ErrorCatalog, ErrorCode};
pub use error::{CallError, RegistrationError, RpcError, INVALID_JSON};
pub use file::FileParam;
pub use pipeline::{body_from_bytes, BodyStream, CallContext};
pub use reflect::{FieldInfo, Reflect, RpcRequest, StructInfo, TypeInfo};
pub use registry::{MethodDescriptor, Methods, Registry, Service};
