//! Serde integration: schema-driven encoding of `#[derive(Serialize,
//! Deserialize)]` types.
//!
//! Struct field names must match schema field names. `None` fields are
//! omitted, so the schema only accepts them if it has no such field.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u8,
//! }
//!
//! let set = dbsz::parser::parse(".Person { name : string  age : uint8 }").unwrap();
//! let schema = set.get("Person").unwrap();
//! let person = Person { name: "Alice".into(), age: 30 };
//!
//! let bytes = dbsz::serde::to_bytes(&set, schema, &person).unwrap();
//! let decoded: Person = dbsz::serde::from_bytes(&set, schema, &bytes).unwrap();
//! assert_eq!(person, decoded);
//! ```

mod de;
mod error;
mod ser;

pub use error::SerdeError;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::types::{Schema, SchemaSet};
use crate::value::Value;

/// Encode `value` as a top-level buffer for `schema`.
pub fn to_bytes<T: Serialize>(
    set: &SchemaSet,
    schema: &Schema,
    value: &T,
) -> Result<Vec<u8>, SerdeError> {
    let value = ser::ValueSerializer::serialize(value)?;
    Ok(codec::encode(set, schema, &value)?)
}

/// Decode a top-level buffer for `schema` into `T`.
///
/// Fails with `DecodeError::FingerprintMismatch` if the buffer was written
/// with a different schema.
pub fn from_bytes<T: for<'de> Deserialize<'de>>(
    set: &SchemaSet,
    schema: &Schema,
    data: &[u8],
) -> Result<T, SerdeError> {
    codec::verify_schema_id(schema, data)?;
    let value = codec::decode(set, schema, data)?;
    de::ValueDeserializer::deserialize(&value)
}

/// Convert a Rust value into a `Value` without encoding it.
pub fn to_value<T: Serialize>(value: &T) -> Result<Value, SerdeError> {
    ser::ValueSerializer::serialize(value)
}

/// Read a Rust value out of a `Value`.
pub fn from_value<'de, T: Deserialize<'de>>(value: &'de Value) -> Result<T, SerdeError> {
    de::ValueDeserializer::deserialize(value)
}
