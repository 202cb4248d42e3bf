//! Schema introspection: projections of the registered type graph.
//!
//! Both projections walk request/response [`TypeInfo`](crate::reflect::TypeInfo)
//! graphs with the same [`walk::TypeWalker`], which owns cycle breaking and
//! naming; each projection only implements a [`walk::TypeSink`]:
//!
//! - [`openapi`]: OpenAPI 3.0.3 document (`components.schemas` + one POST
//!   operation per method path)
//! - [`typescript`]: TypeScript client (one `export type` per struct + one
//!   static method per path)

pub mod naming;
pub mod openapi;
pub mod typescript;
pub mod walk;

pub use naming::{NameStyle, NamedTypeTable};

use crate::constraint::ConstraintError;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("field {field} of {owner}: {source}")]
    Constraint {
        owner: String,
        field: String,
        #[source]
        source: ConstraintError,
    },
}
