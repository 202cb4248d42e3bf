//! The `hello` service.

mod v1;
mod v2;
mod v3;

pub use v1::{DataV1, ErrorsV1, ReqV1, RespV1, StructV1};
pub use v2::ReqV2;
pub use v3::{ReqV3, RespV3};

use vrpc_core::{Methods, Service};

/// Module path every payload type of this service is described under.
pub(crate) const MODULE: &str = module_path!();

pub struct HelloService {
    errors_v1: ErrorsV1,
}

impl HelloService {
    pub fn new() -> Self {
        Self {
            errors_v1: ErrorsV1::new(),
        }
    }
}

impl Default for HelloService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service for HelloService {
    fn module_path(&self) -> &str {
        MODULE
    }

    fn caption(&self) -> String {
        "Test".to_string()
    }

    fn description(&self) -> String {
        "Test method".to_string()
    }

    fn methods(&self, m: &mut Methods<Self>) {
        m.method("V1", Self::v1)
            .errors("ErrorsV1", self.errors_v1.catalog())
            .method("V2", Self::v2)
            .method("V3", Self::v3);
    }
}
