//! Demo service used by the `vrpc` binary and the integration tests.
//!
//! Paths (trim prefix [`TRIM_PREFIX`]):
//!
//! - `/hello/v1`: constraints, nested structs, error catalog
//! - `/hello/v2`: scalar response
//! - `/hello/v3`: multipart upload

pub mod hello;

use vrpc_core::{RegistrationError, Registry};

pub const TRIM_PREFIX: &str = "vrpc_hello";

/// A registry holding every demo service.
pub fn registry() -> Result<Registry, RegistrationError> {
    let mut registry = Registry::new(TRIM_PREFIX);
    registry.register(hello::HelloService::new())?;
    Ok(registry)
}
