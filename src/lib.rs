//! dbsz: a schema-driven compact binary format.
//!
//! A schema fixes the field set, field order and every field's width, so
//! the encoding carries no field names or tags. Integers are big-endian,
//! booleans are bit-packed after the other fields, nested schemas are
//! length-prefixed, and every top-level buffer starts with the 4-byte
//! fingerprint of the schema it was written with.
//!
//! # Quick Start
//!
//! ```rust
//! use dbsz::codec;
//! use dbsz::parser;
//! use dbsz::value::Value;
//!
//! let set = parser::parse(r#"
//!     .Person {
//!         name : string
//!         age  : uint8
//!         vip  : boolean
//!     }
//! "#).unwrap();
//!
//! let person = set.get("Person").unwrap();
//! let value = Value::from_fields(vec![
//!     ("name", "Alice".into()),
//!     ("age", 30i64.into()),
//!     ("vip", true.into()),
//! ]);
//!
//! let encoded = codec::encode(&set, person, &value).unwrap();
//! assert_eq!(encoded.len(), 4 + codec::byte_length(&set, person, Some(&value)));
//! codec::verify_schema_id(person, &encoded).unwrap();
//! let decoded = codec::decode(&set, person, &encoded).unwrap();
//! assert_eq!(value, decoded);
//! ```

pub mod error;
pub mod fingerprint;
pub mod value;
pub mod types;
pub mod template;
pub mod codec;
pub mod parser;
pub mod store;

#[cfg(feature = "serde")]
pub mod serde;

pub use error::{DbszError, Result};
pub use fingerprint::Fingerprint;
pub use template::{Template, TypeSpec};
pub use types::{Schema, SchemaSet};
pub use value::Value;
