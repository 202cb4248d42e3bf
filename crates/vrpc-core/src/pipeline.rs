//! Request pipeline: decode → validate → dispatch → encode.
//!
//! Entry point is [`MethodDescriptor::call`](crate::MethodDescriptor::call).
//! The descriptor owns a type-erased [`Invoke`] that knows the concrete
//! request, response and service types of one method.

use std::future::Future;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::constraint::ValidatorMap;
use crate::error::{CallError, RpcError};
use crate::file::{CaptureError, FileParam};
use crate::reflect::{RpcRequest, StructInfo, TypeInfo};
use crate::schema::naming::signature;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request body as a stream of chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// Single-chunk body.
pub fn body_from_bytes(body: impl Into<Bytes>) -> BodyStream {
    let body = body.into();
    stream::once(async move { Ok(body) }).boxed()
}

/// Per-call context handed to the handler.
#[derive(Debug, Clone)]
pub struct CallContext {
    path: String,
    deadline: Option<Instant>,
    spool_dir: Option<PathBuf>,
}

impl CallContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            deadline: None,
            spool_dir: None,
        }
    }

    /// Spool large uploads into `dir` instead of the system temp directory.
    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = Some(dir.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Path of the method being called.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn spool_dir(&self) -> Option<&Path> {
        self.spool_dir.as_deref()
    }
}

/// What the pipeline needs to know about the method beyond its types.
pub(crate) struct CallPlan<'a> {
    pub request_type: &'a StructInfo,
    pub validators: &'a ValidatorMap,
    pub boundary: Option<&'a str>,
    pub max_memory: u64,
}

/// Type-erased method body.
pub(crate) trait Invoke: Send + Sync {
    fn invoke<'a>(
        &'a self,
        plan: CallPlan<'a>,
        ctx: CallContext,
        body: BodyStream,
    ) -> BoxFuture<'a, Result<Value, CallError>>;
}

pub(crate) struct TypedHandler<S, Req, Resp, F> {
    service: Arc<S>,
    handler: F,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<S, Req, Resp, F> TypedHandler<S, Req, Resp, F> {
    pub(crate) fn new(service: Arc<S>, handler: F) -> Self {
        Self {
            service,
            handler,
            _types: PhantomData,
        }
    }
}

impl<S, Req, Resp, F, Fut> Invoke for TypedHandler<S, Req, Resp, F>
where
    S: Send + Sync + 'static,
    Req: RpcRequest,
    Resp: Serialize + Send + 'static,
    F: Fn(Arc<S>, CallContext, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, CallError>> + Send + 'static,
{
    fn invoke<'a>(
        &'a self,
        plan: CallPlan<'a>,
        ctx: CallContext,
        body: BodyStream,
    ) -> BoxFuture<'a, Result<Value, CallError>> {
        Box::pin(async move {
            let spool = Spool {
                max_memory: plan.max_memory,
                dir: ctx.spool_dir(),
            };
            let request: Req = decode(plan.request_type, body, plan.boundary, spool).await?;

            if !plan.validators.is_empty() {
                let value = serde_json::to_value(&request).map_err(|e| CallError::Internal(e.into()))?;
                validate(plan.request_type, &value, plan.validators)
                    .map_err(RpcError::invalid_json)?;
            }

            let response = (self.handler)(Arc::clone(&self.service), ctx, request).await?;
            serde_json::to_value(response).map_err(|e| CallError::Internal(e.into()))
        })
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Where uploads larger than `max_memory` go.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Spool<'a> {
    pub max_memory: u64,
    pub dir: Option<&'a Path>,
}

async fn decode<Req: RpcRequest>(
    info: &StructInfo,
    body: BodyStream,
    boundary: Option<&str>,
    spool: Spool<'_>,
) -> Result<Req, CallError> {
    let mut merged = serde_json::to_value(Req::default()).map_err(|e| CallError::Internal(e.into()))?;
    let mut files = Vec::new();

    match boundary {
        None => {
            let bytes = collect(body).await?;
            merge(&mut merged, parse_json(&bytes)?);
        }
        Some(boundary) => {
            let file_fields = info.file_field_names();
            let mut multipart = multer::Multipart::new(body, boundary);

            while let Some(mut part) = multipart.next_field().await.map_err(invalid_multipart)? {
                let name = part.name().unwrap_or_default().to_string();

                if file_fields.contains(&name.as_str()) {
                    let file = FileParam::capture(&mut part, spool)
                        .await
                        .map_err(|e| match e {
                            CaptureError::Multipart(e) => invalid_multipart(e),
                            CaptureError::Io(e) => CallError::from(e),
                        })?;
                    files.push((name, file));
                    continue;
                }

                let bytes = part.bytes().await.map_err(invalid_multipart)?;
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                merge(&mut merged, parse_json(&bytes)?);
            }
        }
    }

    let mut request: Req =
        serde_json::from_value(merged).map_err(|e| RpcError::invalid_json(e.to_string()))?;

    for (name, file) in files {
        if let Err(file) = request.attach_file(&name, file) {
            let _ = file.close();
            return Err(CallError::internal(format!(
                "request type {} does not accept file field {}",
                info.name, name
            )));
        }
    }

    Ok(request)
}

async fn collect(mut body: BodyStream) -> Result<Bytes, CallError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| CallError::Internal(anyhow::anyhow!("cannot read body: {}", e)))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

fn parse_json(bytes: &[u8]) -> Result<Value, CallError> {
    serde_json::from_slice(bytes).map_err(|e| RpcError::invalid_json(e.to_string()).into())
}

fn invalid_multipart(err: multer::Error) -> CallError {
    RpcError::invalid_json(err.to_string()).into()
}

/// Overlay `patch` onto `target`: objects merge key by key, `null` leaves the
/// target untouched, anything else replaces it.
fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (_, Value::Null) => {}
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        if !value.is_null() {
                            target.insert(key, value);
                        }
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Walk `value` along `info`, running the validators compiled for each
/// struct field. Stops at the first failure. Nested structs are found
/// through options, sequences and map values; `null` short-circuits.
fn validate(info: &StructInfo, value: &Value, validators: &ValidatorMap) -> Result<(), String> {
    let rules = validators.fields_of(&signature(info));

    for field in info.visible_fields() {
        if field.is_file() {
            continue;
        }

        let field_value = value.get(field.json_name()).unwrap_or(&Value::Null);
        if field_value.is_null() {
            continue;
        }

        for validator in rules.and_then(|r| r.get(field.name)).into_iter().flatten() {
            validator.validate(field_value)?;
        }
        validate_nested(field.type_info(), field_value, validators)?;
    }
    Ok(())
}

fn validate_nested(ty: TypeInfo, value: &Value, validators: &ValidatorMap) -> Result<(), String> {
    match (ty.unwrap_optional(), value) {
        (TypeInfo::Struct(info), Value::Object(_)) => validate(&info, value, validators),
        (TypeInfo::Seq(item), Value::Array(items)) => {
            let item = item();
            if !reaches_struct(&item) {
                return Ok(());
            }
            items
                .iter()
                .try_for_each(|v| validate_nested(item.clone(), v, validators))
        }
        (TypeInfo::Map { value: item, .. }, Value::Object(entries)) => {
            let item = item();
            if !reaches_struct(&item) {
                return Ok(());
            }
            entries
                .values()
                .try_for_each(|v| validate_nested(item.clone(), v, validators))
        }
        _ => Ok(()),
    }
}

fn reaches_struct(ty: &TypeInfo) -> bool {
    match ty.clone().unwrap_optional() {
        TypeInfo::Struct(_) => true,
        TypeInfo::Seq(item) => reaches_struct(&item()),
        TypeInfo::Map { value, .. } => reaches_struct(&value()),
        _ => false,
    }
}
