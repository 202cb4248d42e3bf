use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vrpc_core::{CallContext, CallError, FieldInfo, Reflect, RpcRequest, StructInfo, TypeInfo};

use super::{HelloService, MODULE};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReqV2 {
    pub int_param: i64,
}

impl Reflect for ReqV2 {
    fn type_info() -> TypeInfo {
        StructInfo::new(MODULE, "ReqV2")
            .field(FieldInfo::new::<i64>("int_param").desc("An integer parameter"))
            .into()
    }
}

impl RpcRequest for ReqV2 {}

impl HelloService {
    pub async fn v2(self: Arc<Self>, _ctx: CallContext, req: ReqV2) -> Result<i64, CallError> {
        Ok(req.int_param)
    }
}
