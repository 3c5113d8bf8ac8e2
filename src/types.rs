use std::collections::HashMap;

use crate::error::SchemaError;
use crate::fingerprint::Fingerprint;

/// The primitive types a template may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    /// Two bytes per character.
    String,
    /// Alias of `String`.
    StringBig,
    /// One byte per character.
    StringSmall,
}

/// Static facts about a primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub ty: PrimitiveType,
    /// Lowercase type name as written in templates.
    pub name: &'static str,
    /// Width in bits: of the value for integers and booleans, of one code
    /// unit for strings.
    pub bits: u32,
    pub signed: bool,
}

impl TypeDescriptor {
    /// Width in bytes; fractional for booleans.
    pub fn byte_width(&self) -> f64 {
        self.bits as f64 / 8.0
    }

    /// Whole bytes per value (integers) or per code unit (strings).
    pub fn bytes(&self) -> usize {
        (self.bits as usize).div_ceil(8)
    }
}

const fn desc(ty: PrimitiveType, name: &'static str, bits: u32, signed: bool) -> TypeDescriptor {
    TypeDescriptor {
        ty,
        name,
        bits,
        signed,
    }
}

/// Every primitive type, in declaration order.
pub static TYPE_TABLE: [TypeDescriptor; 12] = [
    desc(PrimitiveType::Boolean, "boolean", 1, false),
    desc(PrimitiveType::Uint8, "uint8", 8, false),
    desc(PrimitiveType::Uint16, "uint16", 16, false),
    desc(PrimitiveType::Uint32, "uint32", 32, false),
    desc(PrimitiveType::Uint64, "uint64", 64, false),
    desc(PrimitiveType::Int8, "int8", 8, true),
    desc(PrimitiveType::Int16, "int16", 16, true),
    desc(PrimitiveType::Int32, "int32", 32, true),
    desc(PrimitiveType::Int64, "int64", 64, true),
    desc(PrimitiveType::String, "string", 16, false),
    desc(PrimitiveType::StringBig, "string_big", 16, false),
    desc(PrimitiveType::StringSmall, "string_small", 8, false),
];

/// Resolve a type name, ignoring ASCII case.
pub fn lookup(name: &str) -> Result<&'static TypeDescriptor, SchemaError> {
    TYPE_TABLE
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
}

impl PrimitiveType {
    pub fn descriptor(self) -> &'static TypeDescriptor {
        // TYPE_TABLE is ordered like the enum.
        &TYPE_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            PrimitiveType::Boolean
                | PrimitiveType::String
                | PrimitiveType::StringBig
                | PrimitiveType::StringSmall
        )
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            PrimitiveType::String | PrimitiveType::StringBig | PrimitiveType::StringSmall
        )
    }

    /// Smallest and largest value an integer type can hold.
    pub fn integer_range(self) -> (i128, i128) {
        let d = self.descriptor();
        if d.signed {
            let half = 1i128 << (d.bits - 1);
            (-half, half - 1)
        } else {
            (0, (1i128 << d.bits) - 1)
        }
    }
}

/// A field's resolved wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// One bit in the schema's trailing boolean section.
    Boolean,
    /// Big-endian fixed-width integer. With `decimal_spots > 0` the value is
    /// a decimal scaled by `10^decimal_spots`.
    Integer {
        ty: PrimitiveType,
        decimal_spots: u32,
    },
    /// Text. `fixed_length: None` writes a 2-byte unit count before the
    /// units; `Some(n)` always writes exactly `n` units.
    Str {
        ty: PrimitiveType,
        fixed_length: Option<u32>,
    },
    /// A nested schema; the value is the index into `SchemaSet.schemas`.
    Nested(usize),
    /// An array of a nested schema; the value is the index into `SchemaSet.schemas`.
    NestedArray(usize),
}

/// A field definition within a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    /// Scale factor of a decimal field, `None` for everything else.
    pub fn decimal_scale(&self) -> Option<f64> {
        match self.kind {
            FieldKind::Integer { decimal_spots, .. } if decimal_spots > 0 => {
                Some(10f64.powi(decimal_spots as i32).round())
            }
            _ => None,
        }
    }
}

/// A resolved schema definition. Immutable once added to a `SchemaSet`.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    /// Fields in canonical (ascending name) order.
    pub fields: Vec<Field>,
    /// Number of boolean fields, packed 8 per byte at the end of the body.
    pub boolean_count: usize,
    pub fingerprint: Fingerprint,
    /// Canonical template text the fingerprint is computed from.
    pub canonical: String,
}

impl Schema {
    /// Bytes taken by the trailing boolean section.
    pub fn boolean_bytes(&self) -> usize {
        self.boolean_count.div_ceil(8)
    }

    /// Find a field by name.
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.fields[idx])
    }
}

/// An arena of schemas. Nested fields refer to other schemas by index, and an
/// index is only ever handed out for a fully built schema, so the nesting
/// graph is acyclic.
#[derive(Debug, Clone)]
pub struct SchemaSet {
    /// All schemas in definition order.
    pub schemas: Vec<Schema>,
    /// Map from schema name to index in `schemas`.
    pub schemas_by_name: HashMap<String, usize>,
}

impl SchemaSet {
    /// Create an empty set.
    pub fn new() -> Self {
        SchemaSet {
            schemas: Vec::new(),
            schemas_by_name: HashMap::new(),
        }
    }

    /// Get a schema by name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas_by_name
            .get(name)
            .map(|&idx| &self.schemas[idx])
    }

    /// Get a schema index by name.
    pub fn get_index(&self, name: &str) -> Option<usize> {
        self.schemas_by_name.get(name).copied()
    }

    /// Get a schema by index.
    pub fn by_index(&self, idx: usize) -> Option<&Schema> {
        self.schemas.get(idx)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl Default for SchemaSet {
    fn default() -> Self {
        Self::new()
    }
}
