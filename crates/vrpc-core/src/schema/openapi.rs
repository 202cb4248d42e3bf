//! Documentation projection: the minimum required part of OpenAPI 3.0.3.
//!
//! The document types serialize to JSON and YAML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::naming::{NameStyle, NamedTypeTable};
use super::walk::{FieldNode, Scalar, TypeSink, TypeWalker};
use super::SchemaError;
use crate::constraint::ConstraintRule;
use crate::error::{RpcError, INVALID_JSON};
use crate::reflect::{Reflect, StructInfo, TypeInfo};
use crate::registry::MethodDescriptor;

pub const OPENAPI_VERSION: &str = "3.0.3";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Property holding the non-file fields of a multipart request.
pub const JSON_DATA_PART: &str = "json_data";

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApi {
    pub openapi: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    pub paths: BTreeMap<String, PathItem>,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    pub post: Operation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub request_body: RequestBody,
    pub responses: BTreeMap<String, Response>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Schema {
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    pub fn formatted(schema_type: &str, format: &str) -> Self {
        Self {
            format: Some(format.to_string()),
            ..Self::typed(schema_type)
        }
    }

    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", SCHEMA_REF_PREFIX, name)),
            ..Default::default()
        }
    }

    /// Component name behind a `$ref`, if this is one.
    pub fn referenced_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub schemas: BTreeMap<String, Schema>,
}

/// Document-level metadata.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub description: String,
    pub version: String,
    pub servers: Vec<Server>,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            title: "vrpc".to_string(),
            description: "The API is a mix of the REST and the JSONRPC ideas.\n\n\
                Each method has its own path.\n\
                The `POST` request with JSON data in body is used for transport.\n"
                .to_string(),
            version: "1.0".to_string(),
            servers: Vec::new(),
        }
    }
}

/// Builds `components.schemas` while the walker visits types.
#[derive(Debug, Default)]
pub struct DocumentationSink {
    schemas: BTreeMap<String, Schema>,
}

impl TypeSink for DocumentationSink {
    type Node = Schema;

    fn scalar(&mut self, scalar: Scalar) -> Schema {
        match scalar {
            Scalar::Bool => Schema::typed("boolean"),
            Scalar::String => Schema::typed("string"),
            Scalar::Int { bits, signed } => {
                let narrow = if signed { bits <= 32 } else { bits <= 16 };
                Schema::formatted("integer", if narrow { "int32" } else { "int64" })
            }
            Scalar::Float { bits } => {
                Schema::formatted("number", if bits <= 32 { "float" } else { "double" })
            }
        }
    }

    fn array(&mut self, item: Schema) -> Schema {
        Schema {
            items: Some(Box::new(item)),
            ..Schema::typed("array")
        }
    }

    fn map(&mut self, _key: Schema, value: Schema) -> Schema {
        Schema {
            additional_properties: Some(Box::new(value)),
            ..Schema::typed("object")
        }
    }

    fn file(&mut self) -> Schema {
        Schema::formatted("string", "binary")
    }

    fn any(&mut self) -> Schema {
        Schema::typed("object")
    }

    fn reference(&mut self, name: &str) -> Schema {
        Schema::reference(name)
    }

    fn end_object(
        &mut self,
        name: &str,
        _info: &StructInfo,
        fields: Vec<FieldNode<'_, Schema>>,
    ) -> Result<(), SchemaError> {
        let mut json_fields = BTreeMap::new();
        let mut file_fields = BTreeMap::new();

        for FieldNode { field, mut node, file, .. } in fields {
            if !field.description.is_empty() {
                node.description = Some(field.description.to_string());
            }
            let rules = ConstraintRule::for_field(field).map_err(|source| SchemaError::Constraint {
                owner: name.to_string(),
                field: field.name.to_string(),
                source,
            })?;
            for rule in &rules {
                rule.annotate(&mut node);
            }

            let target = if file { &mut file_fields } else { &mut json_fields };
            target.insert(field.json_name().to_string(), node);
        }

        let properties = if file_fields.is_empty() {
            json_fields
        } else {
            file_fields.insert(
                JSON_DATA_PART.to_string(),
                Schema {
                    properties: json_fields,
                    ..Schema::typed("object")
                },
            );
            file_fields
        };

        self.schemas.insert(
            name.to_string(),
            Schema {
                properties,
                ..Schema::typed("object")
            },
        );
        Ok(())
    }
}

/// Build the document for `methods`, in the order given.
pub fn build_document<'a>(
    methods: impl IntoIterator<Item = &'a MethodDescriptor>,
    trim_prefix: &str,
    info: &DocumentInfo,
) -> Result<OpenApi, SchemaError> {
    let mut walker = TypeWalker::new(
        NamedTypeTable::new(NameStyle::Documentation, trim_prefix),
        DocumentationSink::default(),
    );

    let mut paths = BTreeMap::new();
    for method in methods {
        let request_type = method.request_type();
        let request_schema = walker.walk(&TypeInfo::Struct(request_type.clone()))?;
        let response_schema = walker.walk(method.response_type())?;
        let error_schema = walker.walk(&RpcError::type_info())?;

        let request_content_type = if request_type.has_file_field() {
            MULTIPART_CONTENT_TYPE
        } else {
            JSON_CONTENT_TYPE
        };

        let mut responses = BTreeMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "### The result".to_string(),
                content: json_content(response_schema),
            },
        );
        responses.insert(
            "400".to_string(),
            Response {
                description: errors_description(method),
                content: json_content(error_schema),
            },
        );
        responses.insert(
            "500".to_string(),
            Response {
                description: "### The internal server error".to_string(),
                content: BTreeMap::new(),
            },
        );

        let mut content = BTreeMap::new();
        content.insert(
            request_content_type.to_string(),
            MediaType {
                schema: request_schema,
            },
        );

        paths.insert(
            method.path().to_string(),
            PathItem {
                post: Operation {
                    summary: method.caption().to_string(),
                    description: method.description().to_string(),
                    operation_id: operation_id(method.path()),
                    tags: vec!["RPC methods".to_string()],
                    request_body: RequestBody {
                        description: String::new(),
                        required: true,
                        content,
                    },
                    responses,
                },
            },
        );
    }

    Ok(OpenApi {
        openapi: OPENAPI_VERSION.to_string(),
        info: Info {
            title: info.title.clone(),
            description: info.description.clone(),
            version: info.version.clone(),
        },
        servers: info.servers.clone(),
        paths,
        components: Components {
            schemas: walker.into_sink().schemas,
        },
    })
}

fn json_content(schema: Schema) -> BTreeMap<String, MediaType> {
    let mut content = BTreeMap::new();
    content.insert(JSON_CONTENT_TYPE.to_string(), MediaType { schema });
    content
}

fn operation_id(path: &str) -> String {
    path.trim_start_matches('/').replace('/', "_")
}

fn errors_description(method: &MethodDescriptor) -> String {
    let mut out = String::from("### The business logic error\nPossible codes:\n");
    let builtin = std::iter::once((INVALID_JSON, "Cannot parse JSON"));
    let declared = method.errors().iter().map(|(c, d)| (c.as_str(), d.as_str()));
    for (code, description) in builtin.chain(declared) {
        out.push_str("* **");
        out.push_str(code);
        out.push_str("**");
        if !description.is_empty() {
            out.push_str(": ");
            out.push_str(description);
        }
        out.push('\n');
    }
    out
}
