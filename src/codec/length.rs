//! Byte length of an encoded body, computed before anything is written.

use crate::types::{FieldKind, Schema, SchemaSet};
use crate::value::Value;

use super::wire::*;

/// Number of bytes `value` occupies when encoded with `schema`, excluding the
/// 4-byte fingerprint header of top-level buffers.
///
/// With no value (or a value of the wrong shape) the fixed-width part of the
/// layout is still counted: dynamic strings count zero characters, arrays zero
/// elements and nested schemas their own empty layout.
///
/// Arrays are measured element by element, so elements of a nested schema
/// that contains dynamic strings may differ in size.
///
/// `schema` must belong to `set`. Nested schemas missing from `set` count
/// only their length prefix; `encode` and `decode` reject them.
pub fn byte_length(set: &SchemaSet, schema: &Schema, value: Option<&Value>) -> usize {
    let mut length = 0usize;

    for field in &schema.fields {
        let field_value = value.and_then(|v| v.get(&field.name));
        length += match &field.kind {
            FieldKind::Boolean => 0,
            FieldKind::Integer { ty, .. } => ty.descriptor().bytes(),
            FieldKind::Str { ty, fixed_length } => {
                let unit = ty.descriptor().bytes();
                match fixed_length {
                    Some(len) => unit * *len as usize,
                    None => {
                        let units = field_value
                            .and_then(Value::as_str)
                            .map_or(0, |s| string_units(s, unit));
                        SIZEOF_LENGTH + unit * units
                    }
                }
            }
            FieldKind::Nested(idx) => {
                SIZEOF_LENGTH
                    + set
                        .by_index(*idx)
                        .map_or(0, |child| byte_length(set, child, field_value))
            }
            FieldKind::NestedArray(idx) => {
                let child = set.by_index(*idx);
                let elements = field_value.and_then(Value::as_array).map_or(0, |items| {
                    items
                        .iter()
                        .map(|item| {
                            SIZEOF_LENGTH + child.map_or(0, |c| byte_length(set, c, Some(item)))
                        })
                        .sum()
                });
                SIZEOF_COUNT + elements
            }
        };
    }

    length + schema.boolean_bytes()
}

/// Code units `s` is written as: UTF-16 units for two-byte strings,
/// characters for one-byte strings.
pub(crate) fn string_units(s: &str, unit_bytes: usize) -> usize {
    if unit_bytes == 2 {
        s.encode_utf16().count()
    } else {
        s.chars().count()
    }
}
