//! One registered method version.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::constraint::{ConstraintRule, Validator, ValidatorMap};
use crate::error::{CallError, RegistrationError};
use crate::pipeline::{BodyStream, CallContext, CallPlan, Invoke};
use crate::reflect::{StructInfo, TypeInfo};
use crate::schema::naming::signature;

/// Everything known about a method version: its path, payload types,
/// declared error codes and compiled validators.
pub struct MethodDescriptor {
    pub(super) path: String,
    pub(super) name: &'static str,
    pub(super) caption: String,
    pub(super) description: String,
    pub(super) request_type: StructInfo,
    pub(super) response_type: TypeInfo,
    pub(super) errors: BTreeMap<String, String>,
    pub(super) validators: ValidatorMap,
    pub(super) invoker: Arc<dyn Invoke>,
}

impl MethodDescriptor {
    /// HTTP path, e.g. `/hello/v1`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Method name, e.g. `V1`.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn request_type(&self) -> &StructInfo {
        &self.request_type
    }

    pub fn response_type(&self) -> &TypeInfo {
        &self.response_type
    }

    /// Declared error codes and their descriptions.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn validators(&self) -> &ValidatorMap {
        &self.validators
    }

    /// Run one call through the pipeline.
    ///
    /// `boundary` selects multipart decoding. File parts larger than
    /// `max_memory` bytes are spooled to temporary files. When `ctx` has a
    /// deadline the whole pipeline, handler included, is bounded by it.
    pub async fn call(
        &self,
        ctx: CallContext,
        body: BodyStream,
        boundary: Option<&str>,
        max_memory: u64,
    ) -> Result<Value, CallError> {
        let plan = CallPlan {
            request_type: &self.request_type,
            validators: &self.validators,
            boundary,
            max_memory,
        };

        if ctx.is_expired() {
            return Err(CallError::DeadlineExceeded);
        }

        let deadline = ctx.deadline();
        let fut = self.invoker.invoke(plan, ctx, body);
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| CallError::DeadlineExceeded)?,
            None => fut.await,
        }
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("request_type", &self.request_type.name)
            .field("errors", &self.errors)
            .field("validators", &self.validators.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Validator compilation
// ---------------------------------------------------------------------------

/// Compile every constraint declared on `info` and on the structs reachable
/// from it (fields, options, sequences and map values).
///
/// Each distinct struct is compiled once; recursive types terminate because
/// a struct already seen is not expanded again, and its rules still apply
/// wherever it recurs.
pub(super) fn compile_validators(
    method_path: &str,
    info: &StructInfo,
) -> Result<ValidatorMap, RegistrationError> {
    let mut out = ValidatorMap::new();
    let mut seen = HashSet::new();
    collect_struct(method_path, info, "", &mut out, &mut seen)?;
    Ok(out)
}

fn collect_struct(
    method_path: &str,
    info: &StructInfo,
    prefix: &str,
    out: &mut ValidatorMap,
    seen: &mut HashSet<String>,
) -> Result<(), RegistrationError> {
    let owner = signature(info);
    if !seen.insert(owner.clone()) {
        return Ok(());
    }

    for field in &info.fields {
        let path = format!("{}/{}", prefix, field.name);

        if field.is_hidden() {
            if !field.tags().is_empty() {
                return Err(RegistrationError::Signature {
                    method: method_path.to_string(),
                    reason: format!("hidden field {} declares constraints", path),
                });
            }
            continue;
        }
        if field.is_file() {
            continue;
        }

        let rules =
            ConstraintRule::for_field(field).map_err(|source| RegistrationError::Constraint {
                path: format!("{}{}", method_path, path),
                source,
            })?;
        out.insert(
            &owner,
            field.name,
            rules
                .into_iter()
                .map(|rule| Validator::new(field.json_name(), rule))
                .collect(),
        );

        collect_type(method_path, field.type_info(), &path, out, seen)?;
    }

    Ok(())
}

fn collect_type(
    method_path: &str,
    ty: TypeInfo,
    path: &str,
    out: &mut ValidatorMap,
    seen: &mut HashSet<String>,
) -> Result<(), RegistrationError> {
    match ty.unwrap_optional() {
        TypeInfo::Struct(nested) => collect_struct(method_path, &nested, path, out, seen),
        TypeInfo::Seq(item) => collect_type(method_path, item(), &format!("{}[]", path), out, seen),
        TypeInfo::Map { value, .. } => {
            collect_type(method_path, value(), &format!("{}{{}}", path), out, seen)
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Wire names
// ---------------------------------------------------------------------------

/// Check that `sample`, a serialized default request, carries a key for every
/// visible non-file field of `info`, following nested structs that are set.
///
/// Catches a `.json(..)` name that the type's serde attributes do not use.
pub(super) fn check_wire_names(
    method_path: &str,
    info: &StructInfo,
    sample: &Value,
) -> Result<(), RegistrationError> {
    check_object(method_path, info, sample, "")
}

fn check_object(
    method_path: &str,
    info: &StructInfo,
    sample: &Value,
    prefix: &str,
) -> Result<(), RegistrationError> {
    let object = sample.as_object().ok_or_else(|| RegistrationError::Signature {
        method: method_path.to_string(),
        reason: format!(
            "{} does not serialize to a JSON object",
            if prefix.is_empty() { "request" } else { prefix }
        ),
    })?;

    for field in info.visible_fields().filter(|f| !f.is_file()) {
        let path = format!("{}/{}", prefix, field.name);
        let nested = object
            .get(field.json_name())
            .ok_or_else(|| RegistrationError::Signature {
                method: method_path.to_string(),
                reason: format!(
                    "field {} is declared as '{}' but serializes under another name",
                    path,
                    field.json_name()
                ),
            })?;

        if let TypeInfo::Struct(inner) = field.type_info().unwrap_optional() {
            if !nested.is_null() {
                check_object(method_path, &inner, nested, &path)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileParam;
    use crate::reflect::{FieldInfo, Reflect};

    struct Inner;

    impl Reflect for Inner {
        fn type_info() -> TypeInfo {
            StructInfo::new("m", "Inner")
                .field(FieldInfo::new::<u32>("f1").tag("minimum", "1").tag("maximum", "200"))
                .into()
        }
    }

    struct Node;

    impl Reflect for Node {
        fn type_info() -> TypeInfo {
            StructInfo::new("m", "Node")
                .field(FieldInfo::new::<i32>("depth").tag("minimum", "0"))
                .field(FieldInfo::new::<Option<Node>>("parent"))
                .into()
        }
    }

    fn inner() -> StructInfo {
        Inner::type_info().as_struct().cloned().unwrap()
    }

    #[test]
    fn test_rules_cover_reachable_structs() {
        let info = StructInfo::new("m", "Req")
            .field(FieldInfo::new::<i64>("int_param").tag("minimum", "100"))
            .field(FieldInfo::new::<Inner>("struct_param"))
            .field(FieldInfo::new::<Option<Inner>>("struct_ptr_param"))
            .field(FieldInfo::new::<FileParam>("content").tag("minimum", "1"))
            .field(FieldInfo::new::<Vec<Inner>>("list"));

        let map = compile_validators("/m/v1", &info).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&info, "int_param").len(), 1);
        assert!(map.get(&info, "content").is_empty());
        assert_eq!(map.get(&inner(), "f1").len(), 2);
    }

    #[test]
    fn test_self_reference_terminates() {
        let info = Node::type_info();
        let node = info.as_struct().unwrap();
        let map = compile_validators("/m/v1", node).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(node, "depth").len(), 1);
    }

    #[test]
    fn test_bad_tag_names_the_field() {
        let info = StructInfo::new("m", "Req").field(FieldInfo::new::<Inner>("s")).field(
            FieldInfo::new::<String>("name").tag("pattern", "(["),
        );
        let err = compile_validators("/m/v1", &info).unwrap_err();
        assert!(err.to_string().starts_with("invalid constraint on /m/v1/name"));
    }

    #[test]
    fn test_wire_names_must_match_serialization() {
        let info = StructInfo::new("m", "Req")
            .field(FieldInfo::new::<i64>("count").json("n"))
            .field(FieldInfo::new::<Option<Inner>>("inner"))
            .field(FieldInfo::new::<FileParam>("content"));

        let ok = serde_json::json!({"n": 0, "inner": null});
        assert!(check_wire_names("/m/v1", &info, &ok).is_ok());

        let renamed = serde_json::json!({"count": 0, "inner": null});
        let err = check_wire_names("/m/v1", &info, &renamed).unwrap_err();
        assert!(err.to_string().contains("/count"), "{}", err);

        let nested = serde_json::json!({"n": 0, "inner": {"F1": 0}});
        let err = check_wire_names("/m/v1", &info, &nested).unwrap_err();
        assert!(err.to_string().contains("/inner/f1"), "{}", err);
    }

    #[test]
    fn test_hidden_field_with_constraint_is_rejected() {
        let info = StructInfo::new("m", "Req")
            .field(FieldInfo::new::<i64>("internal").json("-").tag("minimum", "1"));
        assert!(matches!(
            compile_validators("/m/v1", &info),
            Err(RegistrationError::Signature { .. })
        ));
    }
}
