//! Text declarations for schema sets.
//!
//! ```text
//! .Item { x : int32 }
//! .Order {
//!     id    : uint32
//!     price : uint32(2)
//!     code  : string_small(8)
//!     items : *Item
//! }
//! ```

pub mod lexer;
pub mod ast;
pub mod grammar;
pub mod schema_builder;

use crate::error::ParseError;
use crate::types::SchemaSet;

/// Parse schema declaration text into a `SchemaSet`.
///
/// Nested declarations are registered under dotted names (`Order.Line`).
pub fn parse(schema_text: &str) -> Result<SchemaSet, ParseError> {
    let ast = grammar::parse_schema(schema_text)?;
    schema_builder::build_schema(ast)
}
