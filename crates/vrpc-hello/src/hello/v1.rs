use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vrpc_core::{
    CallContext, CallError, ErrorCatalog, ErrorCode, FieldInfo, Reflect, RpcRequest, StructInfo,
    TypeInfo,
};

use super::{HelloService, MODULE};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReqV1 {
    pub int_param: i64,
    pub str_param: String,
    pub arr_param: Vec<String>,
    pub struct_param: StructV1,
    pub struct_ptr_param: Option<StructV1>,
    pub with_err: bool,
}

impl Reflect for ReqV1 {
    fn type_info() -> TypeInfo {
        StructInfo::new(MODULE, "ReqV1")
            .field(
                FieldInfo::new::<i64>("int_param")
                    .desc("An integer parameter")
                    .tag("minimum", "100")
                    .tag("maximum", "200"),
            )
            .field(
                FieldInfo::new::<String>("str_param")
                    .desc("A string parameter")
                    .tag("pattern", ".{2,}"),
            )
            .field(FieldInfo::new::<Vec<String>>("arr_param").desc("An array parameter"))
            .field(FieldInfo::new::<StructV1>("struct_param"))
            .field(FieldInfo::new::<Option<StructV1>>("struct_ptr_param"))
            .field(FieldInfo::new::<bool>("with_err"))
            .into()
    }
}

impl RpcRequest for ReqV1 {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructV1 {
    pub f1: u32,
}

impl Reflect for StructV1 {
    fn type_info() -> TypeInfo {
        StructInfo::new(MODULE, "StructV1")
            .field(FieldInfo::new::<u32>("f1").tag("minimum", "1").tag("maximum", "200"))
            .into()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RespV1 {
    pub message: String,
    pub data: DataV1,
}

impl Reflect for RespV1 {
    fn type_info() -> TypeInfo {
        StructInfo::new(MODULE, "RespV1")
            .field(FieldInfo::new::<String>("message").desc("Just a message"))
            .field(FieldInfo::new::<DataV1>("data"))
            .into()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataV1 {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub int: i64,
    pub str: String,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

impl Reflect for DataV1 {
    fn type_info() -> TypeInfo {
        StructInfo::new(MODULE, "DataV1")
            .field(FieldInfo::new::<i64>("int"))
            .field(FieldInfo::new::<String>("str"))
            .into()
    }
}

/// Business errors of `V1`.
#[derive(Debug, Clone)]
pub struct ErrorsV1 {
    pub error1: ErrorCode,
    pub error2: ErrorCode,
    pub error3: ErrorCode,
}

impl ErrorsV1 {
    pub fn new() -> Self {
        Self {
            error1: ErrorCode::new("Error1", "Error 1"),
            error2: ErrorCode::new("Error2", "Error 2"),
            error3: ErrorCode::new("Error3", "Error 3"),
        }
    }

    pub fn catalog(&self) -> ErrorCatalog {
        ErrorCatalog::new()
            .with(&self.error1)
            .with(&self.error2)
            .with(&self.error3)
    }
}

impl Default for ErrorsV1 {
    fn default() -> Self {
        Self::new()
    }
}

impl HelloService {
    pub async fn v1(self: Arc<Self>, _ctx: CallContext, req: ReqV1) -> Result<RespV1, CallError> {
        if req.with_err {
            return Err(self.errors_v1.error1.error("test").into());
        }

        Ok(RespV1 {
            message: "Hello, world".to_string(),
            data: DataV1 {
                int: req.int_param,
                str: req.str_param,
            },
        })
    }
}
