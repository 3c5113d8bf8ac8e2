//! Templates: the caller-side declaration of a schema's shape.
//!
//! A template maps field names to one of four leaf forms:
//!
//! - a bare primitive type name (`"int32"`, case-insensitive),
//! - a customised primitive (`TypeSpec::new("uint32").decimal_spots(2)`),
//! - a nested schema already defined in the same `SchemaSet`,
//! - an array of such a nested schema.
//!
//! ```rust
//! use dbsz::template::{Template, TypeSpec};
//! use dbsz::types::SchemaSet;
//!
//! let mut set = SchemaSet::new();
//! let point = set
//!     .define("Point", Template::new().field("x", "int32").field("y", "int32"))
//!     .unwrap();
//! let shape = set
//!     .define(
//!         "Shape",
//!         Template::new()
//!             .field("label", TypeSpec::new("string_small").fixed_length(8))
//!             .field("area", TypeSpec::new("uint32").decimal_spots(2))
//!             .array("points", point),
//!     )
//!     .unwrap();
//! assert_eq!(set.schemas[shape].fields[0].name, "area");
//! ```

use std::collections::HashSet;

use tracing::trace;

use crate::error::SchemaError;
use crate::fingerprint::Fingerprint;
use crate::types::{lookup, Field, FieldKind, PrimitiveType, Schema, SchemaSet};

/// Largest accepted `decimal_spots`; `10^18` still fits a signed 64-bit integer.
pub const MAX_DECIMAL_SPOTS: u32 = 18;

/// A primitive type name plus optional customisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub type_name: String,
    pub decimal_spots: Option<u32>,
    pub fixed_length: Option<u32>,
}

impl TypeSpec {
    pub fn new(type_name: &str) -> Self {
        TypeSpec {
            type_name: type_name.to_string(),
            decimal_spots: None,
            fixed_length: None,
        }
    }

    /// Store a decimal number as an integer scaled by `10^spots`.
    pub fn decimal_spots(mut self, spots: u32) -> Self {
        self.decimal_spots = Some(spots);
        self
    }

    /// Store a string as exactly `len` characters, without a length prefix.
    pub fn fixed_length(mut self, len: u32) -> Self {
        self.fixed_length = Some(len);
        self
    }
}

impl From<&str> for TypeSpec {
    fn from(name: &str) -> Self {
        TypeSpec::new(name)
    }
}

impl From<String> for TypeSpec {
    fn from(type_name: String) -> Self {
        TypeSpec {
            type_name,
            decimal_spots: None,
            fixed_length: None,
        }
    }
}

/// One template entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateField {
    Primitive(TypeSpec),
    /// Index of a schema in the same `SchemaSet`.
    Nested(usize),
    /// Index of a schema in the same `SchemaSet`.
    NestedArray(usize),
}

/// An ordered list of `(field name, field template)` pairs.
///
/// Entry order is irrelevant to the wire layout; fields are always laid out
/// by ascending name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub entries: Vec<(String, TemplateField)>,
}

impl Template {
    pub fn new() -> Self {
        Template::default()
    }

    /// Add a primitive field.
    pub fn field(mut self, name: &str, spec: impl Into<TypeSpec>) -> Self {
        self.entries
            .push((name.to_string(), TemplateField::Primitive(spec.into())));
        self
    }

    /// Add a field holding one value of a nested schema.
    pub fn nested(mut self, name: &str, schema: usize) -> Self {
        self.entries
            .push((name.to_string(), TemplateField::Nested(schema)));
        self
    }

    /// Add a field holding an array of a nested schema.
    pub fn array(mut self, name: &str, schema: usize) -> Self {
        self.entries
            .push((name.to_string(), TemplateField::NestedArray(schema)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaSet {
    /// Resolve `template` into a schema named `name` and add it to the set.
    ///
    /// Nested references must point at schemas already in the set. Returns the
    /// index of the new schema.
    pub fn define(&mut self, name: &str, template: Template) -> Result<usize, SchemaError> {
        if self.schemas_by_name.contains_key(name) {
            return Err(SchemaError::DuplicateSchema(name.to_string()));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(template.entries.len());
        for (field_name, entry) in &template.entries {
            if !seen.insert(field_name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: name.to_string(),
                    field_name: field_name.clone(),
                });
            }
            let kind = self.resolve_kind(field_name, entry)?;
            fields.push(Field {
                name: field_name.clone(),
                kind,
            });
        }

        fields.sort_by(|a, b| a.name.cmp(&b.name));

        let boolean_count = fields
            .iter()
            .filter(|f| f.kind == FieldKind::Boolean)
            .count();
        let canonical = self.canonical_text(&fields);
        let fingerprint = Fingerprint::of_text(&canonical);
        trace!(schema = name, %fingerprint, "defined schema");

        let idx = self.schemas.len();
        self.schemas.push(Schema {
            name: name.to_string(),
            fields,
            boolean_count,
            fingerprint,
            canonical,
        });
        self.schemas_by_name.insert(name.to_string(), idx);
        Ok(idx)
    }

    fn resolve_kind(&self, field: &str, entry: &TemplateField) -> Result<FieldKind, SchemaError> {
        match entry {
            TemplateField::Nested(idx) => {
                self.check_index(field, *idx)?;
                Ok(FieldKind::Nested(*idx))
            }
            TemplateField::NestedArray(idx) => {
                self.check_index(field, *idx)?;
                Ok(FieldKind::NestedArray(*idx))
            }
            TemplateField::Primitive(spec) => resolve_primitive(field, spec),
        }
    }

    fn check_index(&self, field: &str, idx: usize) -> Result<(), SchemaError> {
        if idx < self.schemas.len() {
            Ok(())
        } else {
            Err(SchemaError::InvalidSchema(format!(
                "field '{}' refers to undefined schema #{}",
                field, idx
            )))
        }
    }

    /// The template text with JSON punctuation stripped and keys sorted.
    fn canonical_text(&self, fields: &[Field]) -> String {
        let mut out = String::from("{");
        for field in fields {
            out.push_str(&field.name);
            match &field.kind {
                FieldKind::Boolean => out.push_str("boolean"),
                FieldKind::Integer { ty, decimal_spots } => {
                    if *decimal_spots > 0 {
                        out.push_str(&format!("{{type{}decimalSpots{}}}", ty.name(), decimal_spots));
                    } else {
                        out.push_str(ty.name());
                    }
                }
                FieldKind::Str { ty, fixed_length } => match fixed_length {
                    Some(len) => {
                        out.push_str(&format!("{{type{}stringLength{}}}", ty.name(), len))
                    }
                    None => out.push_str(ty.name()),
                },
                FieldKind::Nested(idx) => out.push_str(&self.schemas[*idx].canonical),
                FieldKind::NestedArray(idx) => {
                    out.push('[');
                    out.push_str(&self.schemas[*idx].canonical);
                    out.push(']');
                }
            }
        }
        out.push('}');
        out
    }
}

fn resolve_primitive(field: &str, spec: &TypeSpec) -> Result<FieldKind, SchemaError> {
    let ty = lookup(&spec.type_name)?.ty;
    let invalid = |message: String| SchemaError::InvalidParameter {
        field: field.to_string(),
        message,
    };

    if let Some(spots) = spec.decimal_spots {
        if !ty.is_integer() {
            return Err(invalid(format!("decimal spots on non-integer type {}", ty.name())));
        }
        if spots > MAX_DECIMAL_SPOTS {
            return Err(invalid(format!(
                "{} decimal spots, at most {} supported",
                spots, MAX_DECIMAL_SPOTS
            )));
        }
    }
    if spec.fixed_length.is_some() && !ty.is_string() {
        return Err(invalid(format!("string length on non-string type {}", ty.name())));
    }

    Ok(match ty {
        PrimitiveType::Boolean => FieldKind::Boolean,
        t if t.is_string() => FieldKind::Str {
            ty: t,
            fixed_length: spec.fixed_length,
        },
        t => FieldKind::Integer {
            ty: t,
            decimal_spots: spec.decimal_spots.unwrap_or(0),
        },
    })
}
