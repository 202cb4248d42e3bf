//! TypeScript client projection.
//!
//! Output layout: sorted `export type` declarations, the fixed runtime
//! library, then one static method per registered path on the `API` class.

use std::collections::BTreeMap;
use std::fmt::Write;

use super::naming::{NameStyle, NamedTypeTable};
use super::openapi::{JSON_CONTENT_TYPE, MULTIPART_CONTENT_TYPE};
use super::walk::{FieldNode, Scalar, TypeSink, TypeWalker};
use super::SchemaError;
use crate::reflect::{StructInfo, TypeInfo};
use crate::registry::MethodDescriptor;

/// Collects one `export type` body per named struct.
#[derive(Debug, Default)]
pub struct ClientSink {
    declarations: BTreeMap<String, String>,
}

impl TypeSink for ClientSink {
    type Node = String;

    fn scalar(&mut self, scalar: Scalar) -> String {
        match scalar {
            Scalar::Bool => "boolean",
            Scalar::String => "string",
            Scalar::Int { .. } | Scalar::Float { .. } => "number",
        }
        .to_string()
    }

    fn array(&mut self, item: String) -> String {
        format!("{}[]", item)
    }

    fn map(&mut self, key: String, value: String) -> String {
        format!("Record<{}, {}>", key, value)
    }

    fn file(&mut self) -> String {
        "File".to_string()
    }

    fn any(&mut self) -> String {
        "unknown".to_string()
    }

    fn reference(&mut self, name: &str) -> String {
        name.to_string()
    }

    fn end_object(
        &mut self,
        name: &str,
        _info: &StructInfo,
        fields: Vec<FieldNode<'_, String>>,
    ) -> Result<(), SchemaError> {
        let mut body = String::new();
        for f in fields {
            let _ = write!(
                body,
                "\n  {}{}: {}",
                f.field.json_name(),
                if f.optional { "?" } else { "" },
                f.node
            );
            if !f.field.description.is_empty() {
                let _ = write!(body, "  // {}", f.field.description);
            }
        }
        self.declarations.insert(name.to_string(), body);
        Ok(())
    }
}

/// Client method name for a path: `/hello/v1` -> `HelloV1`.
pub fn method_name(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Generate the client for `methods`, in the order given.
pub fn build_client<'a>(
    methods: impl IntoIterator<Item = &'a MethodDescriptor>,
    trim_prefix: &str,
) -> Result<String, SchemaError> {
    let mut walker = TypeWalker::new(
        NamedTypeTable::new(NameStyle::Client, trim_prefix),
        ClientSink::default(),
    );

    let mut methods_code = String::new();
    for method in methods {
        let request = walker.walk(&TypeInfo::Struct(method.request_type().clone()))?;
        let response = walker.walk(method.response_type())?;
        let content_type = if method.request_type().has_file_field() {
            MULTIPART_CONTENT_TYPE
        } else {
            JSON_CONTENT_TYPE
        };

        let _ = write!(
            methods_code,
            "\n\n  // {description}\n  public static {name}(request: {request}): Promise<{response}> {{\n    \
             return this.post('{path}', request,'{content_type}') as Promise<{response}>\n  }}",
            description = method.description(),
            name = method_name(method.path()),
            request = request,
            response = response,
            path = method.path(),
            content_type = content_type,
        );
    }
    methods_code.push_str("\n}");

    let mut out = String::new();
    for (name, body) in &walker.into_sink().declarations {
        let _ = write!(out, "export type {} = {{{}\n}}\n\n", name, body);
    }
    out.push_str(RUNTIME_LIBRARY);
    out.push_str(&methods_code);
    Ok(out)
}

const RUNTIME_LIBRARY: &str = r#"export class ApiError extends Error {
  private readonly _code: string
  private readonly _message: string
  private readonly _data: unknown

  constructor(code: string, message: string, data: unknown) {
    super(message)
    this._code = code
    this._message = message
    this._data = data
  }

  get code(): string {
    return this._code
  }

  get message(): string {
    return this._message
  }

  get data(): unknown {
    return this._data
  }
}

export default class API {
  static url = '/api'
  static customHeaders: () => Promise<Record<string, string>> | undefined

  private static requestToFormData(request: any): FormData {
    const form = new FormData()
    const json_data: any = {}
    for (let name in request) {
      if (request[name] instanceof File) {
        form.append(name, request[name])
        continue
      }
      json_data[name] = request[name]
    }
    if (Object.keys(json_data).length !== 0) form.append("json_data", JSON.stringify(json_data))
    return form
  }

  private static async post(method: string, request: unknown, contentType: string): Promise<unknown> {
    return fetch(
      this.url + method,
      {
        method: 'post',
        headers: Object.assign(this.customHeaders ? await this.customHeaders()! : {},
          contentType === 'application/json' ? {'Content-Type': contentType} : {}
        ),
        body: contentType === 'application/json' ? JSON.stringify(request) : this.requestToFormData(request)
      }
    )
      .then(response => {
        return new Promise<Response>((resolve, reject) => {
          switch (response.status) {
            case 200:
              resolve(response)
              break
            case 400:
              response.json().then(err => {
                reject(new ApiError(err.code, err.message, err.data))
              })
              break
            default:
              response.text().then(text => {
                reject(new Error(text || response.statusText))
              })
          }
        })
      })
      .then((response) => response.json())
  }"#;
