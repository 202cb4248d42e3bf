//! Deterministic names for struct types.
//!
//! Named structs are called after their module path (minus the registry's
//! trim prefix) and their own name. Anonymous structs, and named structs
//! whose name is already taken by a different shape, get a suffix derived
//! from a SHA-256 of their structural signature, so the same shape always
//! maps to the same name within one generation run.

use std::collections::HashMap;
use std::fmt::Write;

use sha2::{Digest, Sha256};

use crate::reflect::{StructInfo, TypeInfo};

/// How deep anonymous structs are expanded inside a signature.
const MAX_ANONYMOUS_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// `hello_reqv1`: documentation component names.
    Documentation,
    /// `HelloReqV1`: client type names.
    Client,
}

/// Mapping from generated name to the structural shape that owns it.
#[derive(Debug)]
pub struct NamedTypeTable {
    style: NameStyle,
    trim_prefix: String,
    owners: HashMap<String, String>,
    by_signature: HashMap<String, String>,
}

impl NamedTypeTable {
    pub fn new(style: NameStyle, trim_prefix: &str) -> Self {
        Self {
            style,
            trim_prefix: normalize_module(trim_prefix)
                .trim_end_matches('/')
                .to_string(),
            owners: HashMap::new(),
            by_signature: HashMap::new(),
        }
    }

    /// Name for `info`, allocating one on first sight.
    pub fn resolve(&mut self, info: &StructInfo) -> String {
        let sig = signature(info);
        if let Some(name) = self.by_signature.get(&sig) {
            return name.clone();
        }

        let base = self.base_name(info);
        let mut name = if info.is_anonymous() || self.owners.contains_key(&base) {
            format!("{}_{}", base, short_hash(&sig))
        } else {
            base
        };
        let mut n = 1;
        while self.owners.contains_key(&name) {
            n += 1;
            name = format!("{}_{}_{}", self.base_name(info), short_hash(&sig), n);
        }

        self.owners.insert(name.clone(), sig.clone());
        self.by_signature.insert(sig, name.clone());
        name
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn base_name(&self, info: &StructInfo) -> String {
        let segments = module_segments(info.module, &self.trim_prefix);
        match self.style {
            NameStyle::Documentation => {
                let own = if info.is_anonymous() { "struct" } else { info.name };
                let mut parts = segments;
                parts.push(own.to_string());
                parts
                    .join("_")
                    .replace(['.', '-', '/'], "_")
                    .to_lowercase()
            }
            NameStyle::Client => {
                let own = if info.is_anonymous() { "Struct" } else { info.name };
                let mut name: String = segments
                    .iter()
                    .flat_map(|s| s.split(['.', '-']))
                    .map(capitalize)
                    .collect();
                name.push_str(&capitalize(own));
                name
            }
        }
    }
}

fn normalize_module(module: &str) -> String {
    module.replace("::", "/")
}

fn module_segments(module: &str, trim_prefix: &str) -> Vec<String> {
    let module = normalize_module(module);
    let rest = module.strip_prefix(trim_prefix).unwrap_or(&module);
    rest.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Structural signature of a struct: its identity plus its fields, with
/// nested named structs referenced by identity only.
pub fn signature(info: &StructInfo) -> String {
    struct_signature(info, 0)
}

fn struct_signature(info: &StructInfo, depth: usize) -> String {
    let mut out = format!("struct {}.{} {{", info.module, info.name);
    for field in &info.fields {
        let _ = write!(
            out,
            "{} {} {};",
            field.name,
            field.json_name(),
            type_signature(&field.type_info(), depth)
        );
    }
    out.push('}');
    out
}

fn type_signature(ty: &TypeInfo, depth: usize) -> String {
    match ty {
        TypeInfo::Bool => "bool".to_string(),
        TypeInfo::Int { bits, signed } => format!("{}{}", if *signed { "i" } else { "u" }, bits),
        TypeInfo::Float { bits } => format!("f{}", bits),
        TypeInfo::String => "string".to_string(),
        TypeInfo::File => "file".to_string(),
        TypeInfo::Any => "any".to_string(),
        TypeInfo::Seq(item) => format!("[]{}", type_signature(&item(), depth)),
        TypeInfo::Map { key, value } => format!(
            "map[{}]{}",
            type_signature(&key(), depth),
            type_signature(&value(), depth)
        ),
        TypeInfo::Optional(inner) => format!("*{}", type_signature(&inner(), depth)),
        TypeInfo::Struct(info) if !info.is_anonymous() => format!("{}.{}", info.module, info.name),
        TypeInfo::Struct(_) if depth >= MAX_ANONYMOUS_DEPTH => "struct{...}".to_string(),
        TypeInfo::Struct(info) => struct_signature(info, depth + 1),
    }
}

/// First 8 hex digits of the SHA-256 of `signature`.
pub fn short_hash(signature: &str) -> String {
    let digest = Sha256::digest(signature.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::FieldInfo;

    fn req() -> StructInfo {
        StructInfo::new("vrpc_hello::hello", "ReqV1").field(FieldInfo::new::<i64>("int_param"))
    }

    #[test]
    fn test_documentation_names() {
        let mut table = NamedTypeTable::new(NameStyle::Documentation, "vrpc_hello");
        assert_eq!(table.resolve(&req()), "hello_reqv1");

        let mut table = NamedTypeTable::new(NameStyle::Documentation, "github.com/acme/");
        let info = StructInfo::new("github.com/acme/api-v2/users", "User");
        assert_eq!(table.resolve(&info), "api_v2_users_user");
    }

    #[test]
    fn test_client_names() {
        let mut table = NamedTypeTable::new(NameStyle::Client, "vrpc_hello");
        assert_eq!(table.resolve(&req()), "HelloReqV1");

        let mut table = NamedTypeTable::new(NameStyle::Client, "");
        let info = StructInfo::new("a/b-c", "thing");
        assert_eq!(table.resolve(&info), "ABCThing");
    }

    #[test]
    fn test_same_shape_same_name() {
        let mut table = NamedTypeTable::new(NameStyle::Client, "vrpc_hello");
        let first = table.resolve(&req());
        let second = table.resolve(&req());
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_anonymous_names_are_stable_hashes() {
        let anon = || StructInfo::anonymous("vrpc_hello::hello").field(FieldInfo::new::<String>("x"));

        let mut a = NamedTypeTable::new(NameStyle::Client, "vrpc_hello");
        let mut b = NamedTypeTable::new(NameStyle::Client, "vrpc_hello");
        let name = a.resolve(&anon());
        assert_eq!(name, b.resolve(&anon()));
        assert!(name.starts_with("HelloStruct_"));
        assert_eq!(name.len(), "HelloStruct_".len() + 8);

        let other = StructInfo::anonymous("vrpc_hello::hello").field(FieldInfo::new::<i64>("x"));
        assert_ne!(a.resolve(&other), name);
    }

    #[test]
    fn test_colliding_shapes_get_distinct_names() {
        let mut table = NamedTypeTable::new(NameStyle::Documentation, "");
        let one = StructInfo::new("m", "Thing").field(FieldInfo::new::<i64>("a"));
        let two = StructInfo::new("m", "Thing").field(FieldInfo::new::<String>("b"));
        let first = table.resolve(&one);
        let second = table.resolve(&two);
        assert_eq!(first, "m_thing");
        assert!(second.starts_with("m_thing_"));
        assert_ne!(first, second);
    }
}
