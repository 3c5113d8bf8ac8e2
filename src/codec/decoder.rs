use std::collections::HashMap;

use tracing::debug;

use crate::error::DecodeError;
use crate::fingerprint::Fingerprint;
use crate::types::{FieldKind, PrimitiveType, Schema, SchemaSet};
use crate::value::Value;

use super::wire::*;

/// Decode a top-level buffer into a `Value::Struct` according to `schema`.
///
/// The 4-byte fingerprint header is skipped, not compared; call
/// [`verify_schema_id`] first to reject buffers written with another schema.
pub fn decode(set: &SchemaSet, schema: &Schema, data: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(data);
    reader.take(SIZEOF_FINGERPRINT)?;
    let value = read_schema(set, schema, &mut reader, "")?;
    if reader.remaining() > 0 {
        debug!(
            schema = %schema.name,
            trailing = reader.remaining(),
            "ignoring trailing bytes after decode"
        );
    }
    Ok(value)
}

/// Decode a headerless body, as nested blocks are written.
pub fn decode_nested(set: &SchemaSet, schema: &Schema, data: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(data);
    read_schema(set, schema, &mut reader, "")
}

/// Read the fingerprint a top-level buffer was written with.
pub fn check_schema_id(data: &[u8]) -> Result<Fingerprint, DecodeError> {
    let mut reader = Reader::new(data);
    let header = reader.take(SIZEOF_FINGERPRINT)?;
    Ok(Fingerprint::from_be_bytes([header[0], header[1], header[2], header[3]]))
}

/// Fail with `FingerprintMismatch` unless `data` was written with `schema`.
pub fn verify_schema_id(schema: &Schema, data: &[u8]) -> Result<(), DecodeError> {
    let found = check_schema_id(data)?;
    if found == schema.fingerprint {
        Ok(())
    } else {
        Err(DecodeError::FingerprintMismatch {
            expected: schema.fingerprint,
            found,
        })
    }
}

/// Bounds-checked cursor over an input slice.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.offset + n;
        if end > self.data.len() {
            return Err(DecodeError::Truncated {
                need: end,
                have: self.data.len(),
            });
        }
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.take(2).map(read_u16_be)
    }
}

fn read_schema(
    set: &SchemaSet,
    schema: &Schema,
    reader: &mut Reader,
    path: &str,
) -> Result<Value, DecodeError> {
    let mut result: HashMap<String, Value> = HashMap::with_capacity(schema.fields.len());
    let mut boolean_fields: Vec<&str> = Vec::with_capacity(schema.boolean_count);

    for field in &schema.fields {
        let value = match &field.kind {
            FieldKind::Boolean => {
                boolean_fields.push(&field.name);
                continue;
            }
            FieldKind::Integer { ty, .. } => {
                let width = ty.descriptor().bytes();
                let raw = read_uint_be(reader.take(width)?);
                let value = integer_value(*ty, raw, width);
                match field.decimal_scale() {
                    Some(scale) => Value::Double(integer_as_f64(&value) / scale),
                    None => value,
                }
            }
            FieldKind::Str { ty, fixed_length } => {
                read_string(reader, *ty, *fixed_length, &join_path(path, &field.name))?
            }
            FieldKind::Nested(idx) => {
                let field_path = join_path(path, &field.name);
                read_block(set, child_schema(set, *idx, &field_path)?, reader, &field_path)?
            }
            FieldKind::NestedArray(idx) => {
                let child = child_schema(set, *idx, &join_path(path, &field.name))?;
                let count = reader.read_u16()? as usize;
                let mut items = Vec::with_capacity(count);
                for i in 0..count {
                    let item_path = format!("{}[{}]", join_path(path, &field.name), i);
                    items.push(read_block(set, child, reader, &item_path)?);
                }
                Value::Array(items)
            }
        };
        result.insert(field.name.clone(), value);
    }

    // Bit h of byte i holds the boolean encountered at h + 8 * i.
    for chunk in boolean_fields.chunks(8) {
        let byte = reader.take(1)?[0];
        for (h, name) in chunk.iter().enumerate() {
            result.insert(name.to_string(), Value::Boolean(byte & (1 << h) != 0));
        }
    }

    Ok(Value::Struct(result))
}

/// Decode a `[u16 byte length][body]` block. The body must use exactly the
/// bytes its prefix declares.
fn read_block(
    set: &SchemaSet,
    schema: &Schema,
    reader: &mut Reader,
    path: &str,
) -> Result<Value, DecodeError> {
    let len = reader.read_u16()? as usize;
    let mut block = Reader::new(reader.take(len)?);
    let value = read_schema(set, schema, &mut block, path)?;
    match block.remaining() {
        0 => Ok(value),
        n => Err(DecodeError::InvalidData(format!(
            "{}: {} unread bytes in nested block",
            path, n
        ))),
    }
}

fn child_schema<'s>(set: &'s SchemaSet, idx: usize, path: &str) -> Result<&'s Schema, DecodeError> {
    set.by_index(idx).ok_or_else(|| {
        DecodeError::InvalidData(format!("{}: schema #{} is not in this set", path, idx))
    })
}

fn read_string(
    reader: &mut Reader,
    ty: PrimitiveType,
    fixed_length: Option<u32>,
    path: &str,
) -> Result<Value, DecodeError> {
    let unit_bytes = ty.descriptor().bytes();
    let count = match fixed_length {
        Some(len) => len as usize,
        None => reader.read_u16()? as usize,
    };
    let bytes = reader.take(count * unit_bytes)?;

    let mut units: Vec<u16> = bytes
        .chunks_exact(unit_bytes)
        .map(|c| read_uint_be(c) as u16)
        .collect();
    if fixed_length.is_some() {
        // Padding only; a dynamic string's count is authoritative.
        while units.last() == Some(&0) {
            units.pop();
        }
    }

    let s = if unit_bytes == 2 {
        String::from_utf16(&units).map_err(|_| DecodeError::InvalidString {
            field: path.to_string(),
        })?
    } else {
        units.iter().map(|&u| char::from(u as u8)).collect()
    };
    Ok(Value::Str(s))
}

fn integer_value(ty: PrimitiveType, raw: u64, width: usize) -> Value {
    if ty.descriptor().signed {
        Value::Integer(sign_extend(raw, width))
    } else {
        Value::from(raw)
    }
}

fn integer_as_f64(value: &Value) -> f64 {
    match value {
        Value::Integer(v) => *v as f64,
        Value::Unsigned(v) => *v as f64,
        _ => 0.0,
    }
}

fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}
