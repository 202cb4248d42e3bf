//! The shared type-graph traversal.
//!
//! [`TypeWalker`] turns a [`TypeInfo`] into a sink-specific node. Struct
//! names come from the walker's [`NamedTypeTable`]; a struct's name is
//! registered *before* its fields are visited, so a self-referential type
//! meets its own name on the way down and becomes a reference.

use std::collections::HashSet;

use super::naming::NamedTypeTable;
use super::SchemaError;
use crate::reflect::{FieldInfo, StructInfo, TypeInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Bool,
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    String,
}

/// A visited struct field handed to [`TypeSink::end_object`].
pub struct FieldNode<'a, N> {
    pub field: &'a FieldInfo,
    pub node: N,
    /// Declared as `Option<_>`.
    pub optional: bool,
    pub file: bool,
}

/// What a projection emits for each kind of type.
pub trait TypeSink {
    type Node;

    fn scalar(&mut self, scalar: Scalar) -> Self::Node;
    fn array(&mut self, item: Self::Node) -> Self::Node;
    fn map(&mut self, key: Self::Node, value: Self::Node) -> Self::Node;
    fn file(&mut self) -> Self::Node;
    fn any(&mut self) -> Self::Node;

    /// Use of a named struct.
    fn reference(&mut self, name: &str) -> Self::Node;

    /// A struct is about to be expanded under `name`.
    fn begin_object(&mut self, _name: &str, _info: &StructInfo) {}

    /// A struct's visible fields have been visited.
    fn end_object(
        &mut self,
        name: &str,
        info: &StructInfo,
        fields: Vec<FieldNode<'_, Self::Node>>,
    ) -> Result<(), SchemaError>;
}

pub struct TypeWalker<S> {
    table: NamedTypeTable,
    registered: HashSet<String>,
    sink: S,
}

impl<S: TypeSink> TypeWalker<S> {
    pub fn new(table: NamedTypeTable, sink: S) -> Self {
        Self {
            table,
            registered: HashSet::new(),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn walk(&mut self, ty: &TypeInfo) -> Result<S::Node, SchemaError> {
        let node = match ty {
            TypeInfo::Bool => self.sink.scalar(Scalar::Bool),
            TypeInfo::Int { bits, signed } => self.sink.scalar(Scalar::Int {
                bits: *bits,
                signed: *signed,
            }),
            TypeInfo::Float { bits } => self.sink.scalar(Scalar::Float { bits: *bits }),
            TypeInfo::String => self.sink.scalar(Scalar::String),
            TypeInfo::File => self.sink.file(),
            TypeInfo::Any => self.sink.any(),
            TypeInfo::Seq(item) => {
                let item = self.walk(&item())?;
                self.sink.array(item)
            }
            TypeInfo::Map { key, value } => {
                let key = self.walk(&key())?;
                let value = self.walk(&value())?;
                self.sink.map(key, value)
            }
            TypeInfo::Optional(inner) => self.walk(&inner())?,
            TypeInfo::Struct(info) => {
                let name = self.table.resolve(info);
                if self.registered.insert(name.clone()) {
                    self.expand(&name, info)?;
                }
                self.sink.reference(&name)
            }
        };
        Ok(node)
    }

    fn expand(&mut self, name: &str, info: &StructInfo) -> Result<(), SchemaError> {
        self.sink.begin_object(name, info);

        let mut fields = Vec::new();
        for field in info.visible_fields() {
            let ty = field.type_info();
            let optional = ty.is_optional();
            let file = ty.clone().unwrap_optional().is_file();
            let node = self.walk(&ty)?;
            fields.push(FieldNode {
                field,
                node,
                optional,
                file,
            });
        }

        self.sink.end_object(name, info, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Reflect;
    use crate::schema::NameStyle;

    struct Node;

    impl Reflect for Node {
        fn type_info() -> TypeInfo {
            StructInfo::new("tree", "Node")
                .field(FieldInfo::new::<String>("label"))
                .field(FieldInfo::new::<Vec<Node>>("children"))
                .field(FieldInfo::new::<Option<Node>>("parent"))
                .into()
        }
    }

    /// Records the order of events as strings.
    #[derive(Default)]
    struct Recorder {
        objects: Vec<String>,
    }

    impl TypeSink for Recorder {
        type Node = String;

        fn scalar(&mut self, scalar: Scalar) -> String {
            format!("{:?}", scalar)
        }
        fn array(&mut self, item: String) -> String {
            format!("[{}]", item)
        }
        fn map(&mut self, key: String, value: String) -> String {
            format!("{{{}:{}}}", key, value)
        }
        fn file(&mut self) -> String {
            "file".into()
        }
        fn any(&mut self) -> String {
            "any".into()
        }
        fn reference(&mut self, name: &str) -> String {
            format!("#{}", name)
        }
        fn end_object(
            &mut self,
            name: &str,
            _info: &StructInfo,
            fields: Vec<FieldNode<'_, String>>,
        ) -> Result<(), SchemaError> {
            let fields: Vec<_> = fields
                .iter()
                .map(|f| format!("{}{}={}", f.field.json_name(), if f.optional { "?" } else { "" }, f.node))
                .collect();
            self.objects.push(format!("{}({})", name, fields.join(",")));
            Ok(())
        }
    }

    #[test]
    fn test_self_referential_type_terminates() {
        let mut walker = TypeWalker::new(
            NamedTypeTable::new(NameStyle::Client, ""),
            Recorder::default(),
        );
        let root = walker.walk(&Node::type_info()).unwrap();
        assert_eq!(root, "#TreeNode");
        assert_eq!(
            walker.sink().objects,
            vec!["TreeNode(label=String,children=[#TreeNode],parent?=#TreeNode)"]
        );
    }

    #[test]
    fn test_hidden_fields_are_not_visited() {
        let info: TypeInfo = StructInfo::new("m", "S")
            .field(FieldInfo::new::<i64>("shown"))
            .field(FieldInfo::new::<Node>("internal").json("-"))
            .into();
        let mut walker = TypeWalker::new(
            NamedTypeTable::new(NameStyle::Client, ""),
            Recorder::default(),
        );
        walker.walk(&info).unwrap();
        let sink = walker.into_sink();
        assert_eq!(sink.objects, vec!["MS(shown=Int { bits: 64, signed: true })"]);
    }
}
