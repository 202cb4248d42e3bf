//! Explicit type descriptors for request and response payloads.
//!
//! Every payload type describes itself once through [`Reflect`]; the
//! registry (validators), the documentation projection and the client
//! projection all read the same [`TypeInfo`] graph.
//!
//! Nested types are referenced lazily through `fn() -> TypeInfo`, so a type
//! may refer to itself:
//!
//! ```ignore
//! impl Reflect for Node {
//!     fn type_info() -> TypeInfo {
//!         StructInfo::new("my_app::tree", "Node")
//!             .field(FieldInfo::new::<String>("label"))
//!             .field(FieldInfo::new::<Vec<Node>>("children"))
//!             .into()
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::file::FileParam;

/// Lazy reference to a nested type.
pub type TypeFn = fn() -> TypeInfo;

/// Structural description of a payload type.
#[derive(Debug, Clone)]
pub enum TypeInfo {
    Bool,
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    String,
    /// Uploaded binary content, see [`FileParam`].
    File,
    /// Arbitrary JSON.
    Any,
    Seq(TypeFn),
    Map { key: TypeFn, value: TypeFn },
    /// Nullable / may be absent.
    Optional(TypeFn),
    Struct(StructInfo),
}

impl TypeInfo {
    /// Strip every `Optional` layer.
    pub fn unwrap_optional(self) -> TypeInfo {
        let mut ty = self;
        while let TypeInfo::Optional(inner) = ty {
            ty = inner();
        }
        ty
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeInfo::Optional(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, TypeInfo::File)
    }

    pub fn as_struct(&self) -> Option<&StructInfo> {
        match self {
            TypeInfo::Struct(info) => Some(info),
            _ => None,
        }
    }
}

impl From<StructInfo> for TypeInfo {
    fn from(info: StructInfo) -> Self {
        TypeInfo::Struct(info)
    }
}

/// A struct payload: owning module, name and fields in declaration order.
#[derive(Debug, Clone)]
pub struct StructInfo {
    pub module: &'static str,
    /// Empty for anonymous structs.
    pub name: &'static str,
    pub fields: Vec<FieldInfo>,
}

impl StructInfo {
    pub fn new(module: &'static str, name: &'static str) -> Self {
        Self {
            module,
            name,
            fields: Vec::new(),
        }
    }

    pub fn anonymous(module: &'static str) -> Self {
        Self::new(module, "")
    }

    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    /// Fields present on the wire (JSON name other than `-`).
    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| !f.is_hidden())
    }

    /// Whether any visible field is a file upload, optional or not.
    pub fn has_file_field(&self) -> bool {
        self.visible_fields().any(FieldInfo::is_file)
    }

    /// JSON names of the visible file fields.
    pub fn file_field_names(&self) -> Vec<&str> {
        self.visible_fields()
            .filter(|f| f.is_file())
            .map(FieldInfo::json_name)
            .collect()
    }
}

/// One struct field plus its metadata (JSON name, description, constraint tags).
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: &'static str,
    json_name: Option<&'static str>,
    pub description: &'static str,
    tags: Vec<(&'static str, &'static str)>,
    ty: TypeFn,
}

impl FieldInfo {
    pub fn new<T: Reflect>(name: &'static str) -> Self {
        Self {
            name,
            json_name: None,
            description: "",
            tags: Vec::new(),
            ty: T::type_info,
        }
    }

    /// Wire name; `-` hides the field.
    pub fn json(mut self, name: &'static str) -> Self {
        self.json_name = Some(name);
        self
    }

    pub fn desc(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Constraint tag such as `("minimum", "100")`. Parsed at registration.
    pub fn tag(mut self, key: &'static str, value: &'static str) -> Self {
        self.tags.push((key, value));
        self
    }

    pub fn json_name(&self) -> &str {
        self.json_name.unwrap_or(self.name)
    }

    pub fn is_hidden(&self) -> bool {
        self.json_name() == "-"
    }

    pub fn tag_value(&self, key: &str) -> Option<&'static str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn tags(&self) -> &[(&'static str, &'static str)] {
        &self.tags
    }

    pub fn type_info(&self) -> TypeInfo {
        (self.ty)()
    }

    /// `FileParam` or `Option<FileParam>`.
    pub fn is_file(&self) -> bool {
        self.type_info().unwrap_optional().is_file()
    }
}

/// Types that can describe their own structure.
pub trait Reflect {
    fn type_info() -> TypeInfo;
}

/// A request payload.
///
/// Requests are decoded onto `Default::default()`, so absent fields keep
/// their zero values. Types with file fields override [`attach_file`] and
/// mark those fields `#[serde(skip)]`.
///
/// [`attach_file`]: RpcRequest::attach_file
pub trait RpcRequest: Reflect + Serialize + DeserializeOwned + Default + Send + 'static {
    /// Bind an uploaded file to the field with JSON name `field`.
    /// Hands the file back when there is no such field.
    fn attach_file(&mut self, field: &str, file: FileParam) -> Result<(), FileParam> {
        let _ = field;
        Err(file)
    }
}

macro_rules! reflect_int {
    ($($ty:ty => $bits:expr, $signed:expr;)*) => {
        $(
            impl Reflect for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::Int { bits: $bits, signed: $signed }
                }
            }
        )*
    };
}

reflect_int! {
    i8 => 8, true;
    i16 => 16, true;
    i32 => 32, true;
    i64 => 64, true;
    isize => 64, true;
    u8 => 8, false;
    u16 => 16, false;
    u32 => 32, false;
    u64 => 64, false;
    usize => 64, false;
}

impl Reflect for f32 {
    fn type_info() -> TypeInfo {
        TypeInfo::Float { bits: 32 }
    }
}

impl Reflect for f64 {
    fn type_info() -> TypeInfo {
        TypeInfo::Float { bits: 64 }
    }
}

impl Reflect for bool {
    fn type_info() -> TypeInfo {
        TypeInfo::Bool
    }
}

impl Reflect for String {
    fn type_info() -> TypeInfo {
        TypeInfo::String
    }
}

impl Reflect for serde_json::Value {
    fn type_info() -> TypeInfo {
        TypeInfo::Any
    }
}

impl Reflect for FileParam {
    fn type_info() -> TypeInfo {
        TypeInfo::File
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::Seq(T::type_info)
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::Optional(T::type_info)
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }
}

impl<V: Reflect> Reflect for HashMap<String, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::Map {
            key: String::type_info,
            value: V::type_info,
        }
    }
}

impl<V: Reflect> Reflect for BTreeMap<String, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::Map {
            key: String::type_info,
            value: V::type_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_defaults_and_tags() {
        let field = FieldInfo::new::<i64>("int_param")
            .desc("An integer parameter")
            .tag("minimum", "100")
            .tag("maximum", "200");
        assert_eq!(field.json_name(), "int_param");
        assert_eq!(field.tag_value("maximum"), Some("200"));
        assert_eq!(field.tag_value("pattern"), None);
        assert!(!field.is_hidden());
        assert!(FieldInfo::new::<bool>("secret").json("-").is_hidden());
    }

    #[test]
    fn test_unwrap_optional() {
        let ty = <Option<Option<u32>>>::type_info();
        assert!(ty.is_optional());
        assert!(matches!(
            ty.unwrap_optional(),
            TypeInfo::Int { bits: 32, signed: false }
        ));
    }

    #[test]
    fn test_file_fields() {
        let info = StructInfo::new("m", "Upload")
            .field(FieldInfo::new::<i64>("int_param"))
            .field(FieldInfo::new::<FileParam>("content"))
            .field(FieldInfo::new::<FileParam>("hidden").json("-"));
        assert!(info.has_file_field());
        assert_eq!(info.file_field_names(), vec!["content"]);
    }

    #[test]
    fn test_optional_file_fields() {
        let info = StructInfo::new("m", "Upload")
            .field(FieldInfo::new::<i64>("int_param"))
            .field(FieldInfo::new::<Option<FileParam>>("content"));
        assert!(info.has_file_field());
        assert_eq!(info.file_field_names(), vec!["content"]);

        let plain = StructInfo::new("m", "Plain").field(FieldInfo::new::<Option<i64>>("n"));
        assert!(!plain.has_file_field());
    }
}
