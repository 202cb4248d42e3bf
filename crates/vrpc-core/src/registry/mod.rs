//! Method registry.
//!
//! A [`Service`] declares its `V<N>` methods and `ErrorsV<N>` catalogs
//! through [`Methods`]. [`Registry::register`] turns that declaration into
//! one [`MethodDescriptor`] per version, keyed by path:
//!
//! ```text
//! module path  vrpc_hello::hello   trim prefix  vrpc_hello
//! method       V1               => /hello/v1
//! ```
//!
//! Registration either succeeds for every method of a service or leaves the
//! registry untouched.

mod descriptor;

pub use descriptor::MethodDescriptor;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::catalog::ErrorCatalog;
use crate::error::{CallError, RegistrationError, INVALID_JSON};
use crate::pipeline::{CallContext, Invoke, TypedHandler};
use crate::reflect::{Reflect, RpcRequest, TypeInfo};
use crate::schema::openapi::{self, DocumentInfo, OpenApi};
use crate::schema::{typescript, SchemaError};

lazy_static! {
    static ref METHOD_VERSION: Regex = Regex::new(r"^V\d+$").unwrap();
    static ref ERRORS_VERSION: Regex = Regex::new(r"^ErrorsV(\d+)$").unwrap();
    static ref ERROR_CODE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// A group of versioned methods sharing a module path.
///
/// ```ignore
/// impl Service for HelloService {
///     fn module_path(&self) -> &str {
///         module_path!()
///     }
///
///     fn methods(&self, m: &mut Methods<Self>) {
///         m.method("V1", Self::v1).errors("ErrorsV1", self.errors_v1.catalog());
///     }
/// }
/// ```
pub trait Service: Send + Sync + Sized + 'static {
    /// Module path the method paths derive from (`::` or `/` separated).
    fn module_path(&self) -> &str;

    /// Short summary for the documentation.
    fn caption(&self) -> String {
        String::new()
    }

    fn description(&self) -> String {
        String::new()
    }

    fn methods(&self, methods: &mut Methods<Self>);
}

struct PendingMethod {
    name: &'static str,
    request_type: TypeInfo,
    response_type: TypeInfo,
    /// `Req::default()` as JSON, checked against the declared wire names.
    sample: Result<serde_json::Value, String>,
    invoker: Arc<dyn Invoke>,
}

/// Collects a service's method and error-catalog declarations.
pub struct Methods<S> {
    service: Arc<S>,
    methods: Vec<PendingMethod>,
    catalogs: Vec<(&'static str, ErrorCatalog)>,
}

impl<S: Service> Methods<S> {
    fn new(service: Arc<S>) -> Self {
        Self {
            service,
            methods: Vec::new(),
            catalogs: Vec::new(),
        }
    }

    /// Declare method `name` (`V<N>`) handled by `handler`.
    pub fn method<Req, Resp, F, Fut>(&mut self, name: &'static str, handler: F) -> &mut Self
    where
        Req: RpcRequest,
        Resp: Reflect + Serialize + Send + 'static,
        F: Fn(Arc<S>, CallContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, CallError>> + Send + 'static,
    {
        self.methods.push(PendingMethod {
            name,
            request_type: Req::type_info(),
            response_type: Resp::type_info(),
            sample: serde_json::to_value(Req::default()).map_err(|e| e.to_string()),
            invoker: Arc::new(TypedHandler::<S, Req, Resp, F>::new(
                Arc::clone(&self.service),
                handler,
            )),
        });
        self
    }

    /// Bind the error catalog for the method version named by `accessor`
    /// (`ErrorsV<N>` binds to `V<N>`).
    pub fn errors(&mut self, accessor: &'static str, catalog: ErrorCatalog) -> &mut Self {
        self.catalogs.push((accessor, catalog));
        self
    }
}

/// All registered methods, keyed by path.
#[derive(Debug, Default)]
pub struct Registry {
    trim_prefix: String,
    methods: HashMap<String, Arc<MethodDescriptor>>,
}

impl Registry {
    pub fn new(trim_prefix: impl Into<String>) -> Self {
        Self {
            trim_prefix: trim_prefix.into(),
            methods: HashMap::new(),
        }
    }

    pub fn trim_prefix(&self) -> &str {
        &self.trim_prefix
    }

    /// Register every method of `service`.
    ///
    /// A path that is already registered is replaced.
    pub fn register<S: Service>(
        &mut self,
        service: S,
    ) -> Result<Vec<Arc<MethodDescriptor>>, RegistrationError> {
        let service = Arc::new(service);
        let base = self.service_path(service.module_path())?;

        let mut declared = Methods::new(Arc::clone(&service));
        service.methods(&mut declared);

        let mut descriptors: BTreeMap<String, MethodDescriptor> = BTreeMap::new();
        for pending in declared.methods {
            let descriptor = build_descriptor(service.as_ref(), &base, pending)?;
            if descriptors.contains_key(&descriptor.path) {
                return Err(RegistrationError::Signature {
                    method: descriptor.name.to_string(),
                    reason: "declared more than once".to_string(),
                });
            }
            descriptors.insert(descriptor.path.clone(), descriptor);
        }

        let mut seen_accessors = Vec::new();
        for (accessor, catalog) in declared.catalogs {
            if seen_accessors.contains(&accessor) {
                return Err(catalog_error(accessor, "declared more than once"));
            }
            seen_accessors.push(accessor);
            bind_errors(&base, accessor, &catalog, &mut descriptors)?;
        }

        let descriptors: Vec<Arc<MethodDescriptor>> =
            descriptors.into_values().map(Arc::new).collect();

        // The documentation must be derivable from the merged method set.
        let mut merged = self.methods.clone();
        for d in &descriptors {
            merged.insert(d.path.clone(), Arc::clone(d));
        }
        let mut all: Vec<_> = merged.values().collect();
        all.sort_by(|a, b| a.path.cmp(&b.path));
        openapi::build_document(all.into_iter().map(Arc::as_ref), &self.trim_prefix, &DocumentInfo::default())
            .map_err(|source| RegistrationError::Schema {
                path: base.clone(),
                source,
            })?;

        for d in &descriptors {
            if self.methods.insert(d.path.clone(), Arc::clone(d)).is_some() {
                tracing::warn!(path = %d.path, "Method path registered twice, replacing previous");
            }
            tracing::debug!(path = %d.path, validators = d.validators.len(), "Registered method");
        }

        Ok(descriptors)
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.methods.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Look up a method; a trailing `/` is ignored.
    pub fn get(&self, path: &str) -> Option<Arc<MethodDescriptor>> {
        let path = path.strip_suffix('/').unwrap_or(path);
        self.methods.get(path).cloned()
    }

    /// Registered methods, sorted by path.
    pub fn descriptors(&self) -> Vec<Arc<MethodDescriptor>> {
        let mut all: Vec<_> = self.methods.values().cloned().collect();
        all.sort_by(|a, b| a.path.cmp(&b.path));
        all
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// OpenAPI document for every registered method.
    pub fn openapi(&self, info: &DocumentInfo) -> Result<OpenApi, SchemaError> {
        let all = self.descriptors();
        openapi::build_document(all.iter().map(Arc::as_ref), &self.trim_prefix, info)
    }

    /// TypeScript client for every registered method.
    pub fn typescript(&self) -> Result<String, SchemaError> {
        let all = self.descriptors();
        typescript::build_client(all.iter().map(Arc::as_ref), &self.trim_prefix)
    }

    /// `/`-separated module path with the trim prefix removed, starting with `/`.
    fn service_path(&self, module_path: &str) -> Result<String, RegistrationError> {
        let module = module_path.replace("::", "/");
        let prefix = self.trim_prefix.replace("::", "/");
        let prefix = prefix.trim_end_matches('/');

        let rest = module
            .strip_prefix(prefix)
            .ok_or_else(|| RegistrationError::TrimPrefix {
                prefix: prefix.to_string(),
                module: module.clone(),
            })?
            .trim_end_matches('/');

        if rest.starts_with('/') || rest.is_empty() {
            Ok(rest.to_string())
        } else {
            Ok(format!("/{}", rest))
        }
    }
}

fn build_descriptor<S: Service>(
    service: &S,
    base: &str,
    pending: PendingMethod,
) -> Result<MethodDescriptor, RegistrationError> {
    if !METHOD_VERSION.is_match(pending.name) {
        return Err(RegistrationError::Signature {
            method: pending.name.to_string(),
            reason: "method names must look like V<N>".to_string(),
        });
    }

    let request_type = match pending.request_type {
        TypeInfo::Struct(info) => info,
        _ => {
            return Err(RegistrationError::Signature {
                method: pending.name.to_string(),
                reason: "request type must be a struct".to_string(),
            })
        }
    };

    let path = format!("{}/{}", base, pending.name.to_lowercase());
    let sample = pending.sample.map_err(|reason| RegistrationError::Signature {
        method: path.clone(),
        reason: format!("default request does not serialize: {}", reason),
    })?;
    descriptor::check_wire_names(&path, &request_type, &sample)?;
    let validators = descriptor::compile_validators(&path, &request_type)?;

    Ok(MethodDescriptor {
        path,
        name: pending.name,
        caption: service.caption(),
        description: service.description(),
        request_type,
        response_type: pending.response_type,
        errors: BTreeMap::new(),
        validators,
        invoker: pending.invoker,
    })
}

fn bind_errors(
    base: &str,
    accessor: &'static str,
    catalog: &ErrorCatalog,
    descriptors: &mut BTreeMap<String, MethodDescriptor>,
) -> Result<(), RegistrationError> {
    let version = ERRORS_VERSION
        .captures(accessor)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| catalog_error(accessor, "accessor names must look like ErrorsV<N>"))?;

    let path = format!("{}/v{}", base, version);
    let descriptor = descriptors
        .get_mut(&path)
        .ok_or_else(|| catalog_error(accessor, &format!("there is no method V{}", version)))?;

    for code in catalog.codes() {
        if !ERROR_CODE.is_match(code.code()) {
            return Err(catalog_error(
                accessor,
                &format!("code '{}' is not an identifier", code.code()),
            ));
        }
        if code.code() == INVALID_JSON {
            return Err(catalog_error(accessor, "code INVALID_JSON is reserved"));
        }
        if descriptor
            .errors
            .insert(code.code().to_string(), code.description().to_string())
            .is_some()
        {
            return Err(catalog_error(
                accessor,
                &format!("code '{}' is declared more than once", code.code()),
            ));
        }
    }

    Ok(())
}

fn catalog_error(accessor: &str, reason: &str) -> RegistrationError {
    RegistrationError::ErrorCatalog {
        accessor: accessor.to_string(),
        reason: reason.to_string(),
    }
}
