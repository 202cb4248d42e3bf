//! Declarative per-field constraints: `minimum`, `maximum`, `pattern`.
//!
//! Tags are parsed once, at registration, into [`ConstraintRule`]s. The same
//! rules drive request validation ([`Validator`]) and the documentation
//! fragments ([`ConstraintRule::annotate`]), so the two cannot drift apart.
//!
//! Which rules apply depends on the field's leaf kind (after stripping
//! `Option`):
//!
//! | kind             | rules                          |
//! |------------------|--------------------------------|
//! | signed integer   | `minimum` (i64), `maximum`     |
//! | unsigned integer | `minimum` (u64), `maximum`     |
//! | string           | `pattern`                      |
//!
//! Tags on other kinds are ignored.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use crate::reflect::{FieldInfo, StructInfo, TypeInfo};
use crate::schema::naming::signature;
use crate::schema::openapi::Schema;

/// Longest string value echoed back verbatim in a pattern violation.
const MAX_ECHOED_CHARS: usize = 25;

#[derive(Debug, thiserror::Error)]
pub enum ConstraintError {
    #[error("{tag}:\"{value}\" is not a valid integer: {source}")]
    InvalidInteger {
        tag: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("pattern:\"{value}\" is not a valid regular expression: {source}")]
    InvalidPattern {
        value: String,
        #[source]
        source: regex::Error,
    },
}

/// One compiled constraint.
#[derive(Debug, Clone)]
pub enum ConstraintRule {
    MinimumSigned(i64),
    MinimumUnsigned(u64),
    Maximum(i64),
    Pattern(Regex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafKind {
    Signed,
    Unsigned,
    String,
    Other,
}

fn leaf_kind(ty: TypeInfo) -> LeafKind {
    match ty.unwrap_optional() {
        TypeInfo::Int { signed: true, .. } => LeafKind::Signed,
        TypeInfo::Int { signed: false, .. } => LeafKind::Unsigned,
        TypeInfo::String => LeafKind::String,
        _ => LeafKind::Other,
    }
}

impl ConstraintRule {
    /// Parse every tag on `field` that applies to its kind, in
    /// `minimum`, `maximum`, `pattern` order.
    pub fn for_field(field: &FieldInfo) -> Result<Vec<ConstraintRule>, ConstraintError> {
        let mut rules = Vec::new();

        match leaf_kind(field.type_info()) {
            LeafKind::Signed => {
                if let Some(v) = field.tag_value("minimum") {
                    rules.push(ConstraintRule::MinimumSigned(parse_int("minimum", v)?));
                }
                if let Some(v) = field.tag_value("maximum") {
                    rules.push(ConstraintRule::Maximum(parse_int("maximum", v)?));
                }
            }
            LeafKind::Unsigned => {
                if let Some(v) = field.tag_value("minimum") {
                    let min = v.parse::<u64>().map_err(|source| ConstraintError::InvalidInteger {
                        tag: "minimum",
                        value: v.to_string(),
                        source,
                    })?;
                    rules.push(ConstraintRule::MinimumUnsigned(min));
                }
                if let Some(v) = field.tag_value("maximum") {
                    rules.push(ConstraintRule::Maximum(parse_int("maximum", v)?));
                }
            }
            LeafKind::String => {
                if let Some(v) = field.tag_value("pattern") {
                    let re = Regex::new(v).map_err(|source| ConstraintError::InvalidPattern {
                        value: v.to_string(),
                        source,
                    })?;
                    rules.push(ConstraintRule::Pattern(re));
                }
            }
            LeafKind::Other => {
                if !field.tags().is_empty() {
                    tracing::debug!(field = field.name, "Ignoring constraint tags on non-scalar field");
                }
            }
        }

        Ok(rules)
    }

    /// Check one value. `field` names the field in the violation message.
    pub fn check(&self, field: &str, value: &Value) -> Result<(), String> {
        match self {
            ConstraintRule::MinimumSigned(min) => match value.as_i64() {
                Some(v) if v < *min => Err(format!(
                    "{}={} is less than required minimum {}",
                    field, v, min
                )),
                _ => Ok(()),
            },
            ConstraintRule::MinimumUnsigned(min) => match value.as_u64() {
                Some(v) if v < *min => Err(format!(
                    "{}={} is less than required minimum {}",
                    field, v, min
                )),
                _ => Ok(()),
            },
            ConstraintRule::Maximum(max) => {
                let v = value
                    .as_i64()
                    .map(i128::from)
                    .or_else(|| value.as_u64().map(i128::from));
                match v {
                    Some(v) if v > i128::from(*max) => Err(format!(
                        "{}={} is greater than required maximum {}",
                        field, v, max
                    )),
                    _ => Ok(()),
                }
            }
            ConstraintRule::Pattern(re) => match value.as_str() {
                Some(s) if !re.is_match(s) => Err(format!(
                    "{}={} does not match the pattern {}",
                    field,
                    truncate(s),
                    re.as_str()
                )),
                _ => Ok(()),
            },
        }
    }

    /// Contribute this constraint to a documentation schema.
    pub fn annotate(&self, schema: &mut Schema) {
        match self {
            ConstraintRule::MinimumSigned(min) => schema.minimum = Some((*min).into()),
            ConstraintRule::MinimumUnsigned(min) => schema.minimum = Some((*min).into()),
            ConstraintRule::Maximum(max) => schema.maximum = Some((*max).into()),
            ConstraintRule::Pattern(re) => schema.pattern = Some(re.as_str().to_string()),
        }
    }
}

fn parse_int(tag: &'static str, value: &str) -> Result<i64, ConstraintError> {
    value
        .parse::<i64>()
        .map_err(|source| ConstraintError::InvalidInteger {
            tag,
            value: value.to_string(),
            source,
        })
}

fn truncate(s: &str) -> String {
    if s.chars().count() > MAX_ECHOED_CHARS {
        let head: String = s.chars().take(MAX_ECHOED_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

/// A compiled predicate bound to the field it guards.
#[derive(Debug, Clone)]
pub struct Validator {
    field: String,
    rule: ConstraintRule,
}

impl Validator {
    pub fn new(field: impl Into<String>, rule: ConstraintRule) -> Self {
        Self {
            field: field.into(),
            rule,
        }
    }

    pub fn rule(&self) -> &ConstraintRule {
        &self.rule
    }

    pub fn validate(&self, value: &Value) -> Result<(), String> {
        self.rule.check(&self.field, value)
    }
}

/// Compiled validators of one request type.
///
/// Rules are keyed by the owning struct's structural signature (the same
/// identity the documentation names components by) and then by field name,
/// so a struct reached through several fields, or through itself, shares one
/// rule set wherever it appears.
#[derive(Debug, Clone, Default)]
pub struct ValidatorMap {
    by_struct: BTreeMap<String, BTreeMap<&'static str, Vec<Validator>>>,
}

impl ValidatorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_struct.is_empty()
    }

    /// Number of constrained fields.
    pub fn len(&self) -> usize {
        self.by_struct.values().map(BTreeMap::len).sum()
    }

    /// Validators for `field` of `owner`, in declaration order.
    pub fn get(&self, owner: &StructInfo, field: &str) -> &[Validator] {
        self.fields_of(&signature(owner))
            .and_then(|fields| fields.get(field))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn fields_of(&self, owner: &str) -> Option<&BTreeMap<&'static str, Vec<Validator>>> {
        self.by_struct.get(owner)
    }

    pub(crate) fn insert(&mut self, owner: &str, field: &'static str, validators: Vec<Validator>) {
        if validators.is_empty() {
            return;
        }
        self.by_struct
            .entry(owner.to_string())
            .or_default()
            .entry(field)
            .or_default()
            .extend(validators);
    }
}
