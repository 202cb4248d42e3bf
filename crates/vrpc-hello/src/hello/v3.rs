use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vrpc_core::{
    CallContext, CallError, FieldInfo, FileParam, Reflect, RpcRequest, StructInfo, TypeInfo,
};

use super::{HelloService, MODULE};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReqV3 {
    pub int_param: i64,
    #[serde(skip)]
    pub content: Option<FileParam>,
}

impl Reflect for ReqV3 {
    fn type_info() -> TypeInfo {
        StructInfo::new(MODULE, "ReqV3")
            .field(FieldInfo::new::<i64>("int_param").desc("An integer parameter"))
            .field(FieldInfo::new::<Option<FileParam>>("content").desc("Some file"))
            .into()
    }
}

impl RpcRequest for ReqV3 {
    fn attach_file(&mut self, field: &str, file: FileParam) -> Result<(), FileParam> {
        match field {
            "content" => {
                self.content = Some(file);
                Ok(())
            }
            _ => Err(file),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RespV3 {
    pub int_param: i64,
    pub content_length: u64,
}

impl Reflect for RespV3 {
    fn type_info() -> TypeInfo {
        StructInfo::new(MODULE, "RespV3")
            .field(FieldInfo::new::<i64>("int_param"))
            .field(FieldInfo::new::<u64>("content_length"))
            .into()
    }
}

impl HelloService {
    pub async fn v3(self: Arc<Self>, _ctx: CallContext, req: ReqV3) -> Result<RespV3, CallError> {
        let content_length = match req.content {
            Some(file) => {
                let data = file.bytes().await?;
                tracing::debug!(
                    file_name = file.file_name().unwrap_or_default(),
                    spooled = file.is_spooled(),
                    "Received upload"
                );
                file.close()?;
                data.len() as u64
            }
            None => 0,
        };

        Ok(RespV3 {
            int_param: req.int_param,
            content_length,
        })
    }
}
