use tracing::debug;

use crate::error::EncodeError;
use crate::types::{Field, FieldKind, PrimitiveType, Schema, SchemaSet};
use crate::value::Value;

use super::length::{byte_length, string_units};
use super::wire::*;

/// Encode a `Value::Struct` according to `schema`, prefixed with the schema's
/// 4-byte fingerprint.
///
/// All failing fields are reported together; no partial buffer is returned.
pub fn encode(set: &SchemaSet, schema: &Schema, value: &Value) -> Result<Vec<u8>, EncodeError> {
    let expected = SIZEOF_FINGERPRINT + byte_length(set, schema, Some(value));
    let mut encoder = Encoder::with_capacity(set, expected);
    encoder
        .buf
        .extend_from_slice(&schema.fingerprint.to_be_bytes());
    encoder.write_schema(schema, value, "");
    encoder.finish(schema, expected)
}

/// Encode without the fingerprint header, as nested blocks are written.
pub fn encode_nested(
    set: &SchemaSet,
    schema: &Schema,
    value: &Value,
) -> Result<Vec<u8>, EncodeError> {
    let expected = byte_length(set, schema, Some(value));
    let mut encoder = Encoder::with_capacity(set, expected);
    encoder.write_schema(schema, value, "");
    encoder.finish(schema, expected)
}

struct Encoder<'a> {
    set: &'a SchemaSet,
    buf: Vec<u8>,
    failures: Vec<EncodeError>,
}

impl<'a> Encoder<'a> {
    fn with_capacity(set: &'a SchemaSet, capacity: usize) -> Self {
        Encoder {
            set,
            buf: Vec::with_capacity(capacity),
            failures: Vec::new(),
        }
    }

    fn finish(mut self, schema: &Schema, expected: usize) -> Result<Vec<u8>, EncodeError> {
        match self.failures.len() {
            0 => {
                debug_assert_eq!(self.buf.len(), expected, "length mismatch for '{}'", schema.name);
                Ok(self.buf)
            }
            1 => {
                let err = self.failures.remove(0);
                debug!(schema = %schema.name, error = %err, "encode failed");
                Err(err)
            }
            n => {
                debug!(schema = %schema.name, failures = n, "encode failed");
                Err(EncodeError::Fields(self.failures))
            }
        }
    }

    /// Write the body of one schema instance: fields in canonical order, then
    /// the packed boolean section.
    fn write_schema(&mut self, schema: &Schema, value: &Value, path: &str) {
        let map = match value {
            Value::Struct(map) => map,
            _ => {
                self.failures.push(EncodeError::TypeMismatch {
                    field: display_path(path, &schema.name),
                    expected: "struct".into(),
                    actual: value.type_name().into(),
                });
                return;
            }
        };

        let mut booleans: Vec<bool> = Vec::with_capacity(schema.boolean_count);

        for field in &schema.fields {
            let field_path = join_path(path, &field.name);
            let val = match map.get(&field.name) {
                Some(v) => v,
                None => {
                    self.failures
                        .push(EncodeError::MissingField { field: field_path });
                    continue;
                }
            };

            match &field.kind {
                FieldKind::Boolean => match val {
                    Value::Boolean(b) => booleans.push(*b),
                    _ => self.mismatch(field_path, "boolean", val),
                },
                FieldKind::Integer { ty, .. } => self.write_integer(field, *ty, val, field_path),
                FieldKind::Str { ty, fixed_length } => match val {
                    Value::Str(s) => self.write_string(*ty, *fixed_length, s, field_path),
                    _ => self.mismatch(field_path, "string", val),
                },
                FieldKind::Nested(idx) => {
                    if let Some(child) = self.child(*idx, &field_path) {
                        self.write_block(child, val, &field_path);
                    }
                }
                FieldKind::NestedArray(idx) => {
                    if let Some(child) = self.child(*idx, &field_path) {
                        self.write_array(child, val, field_path);
                    }
                }
            }
        }

        // Bit h of byte i holds the boolean encountered at h + 8 * i.
        for chunk in booleans.chunks(8) {
            let byte = chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (h, &b)| if b { acc | (1 << h) } else { acc });
            self.buf.push(byte);
        }
    }

    fn write_integer(&mut self, field: &Field, ty: PrimitiveType, val: &Value, path: String) {
        let wide: i128 = match field.decimal_scale() {
            None => match val {
                Value::Integer(v) => *v as i128,
                Value::Unsigned(v) => *v as i128,
                _ => {
                    self.mismatch(path, "integer", val);
                    return;
                }
            },
            Some(scale) => {
                let number = match val {
                    Value::Integer(v) => *v as f64,
                    Value::Unsigned(v) => *v as f64,
                    Value::Double(v) => *v,
                    _ => {
                        self.mismatch(path, "number", val);
                        return;
                    }
                };
                let scaled = (number * scale).round();
                if !scaled.is_finite() {
                    self.out_of_range(path, ty, val);
                    return;
                }
                scaled as i128
            }
        };

        let (min, max) = ty.integer_range();
        if wide < min || wide > max {
            self.out_of_range(path, ty, val);
            return;
        }
        put_uint_be(&mut self.buf, wide as u64, ty.descriptor().bytes());
    }

    fn write_string(&mut self, ty: PrimitiveType, fixed_length: Option<u32>, s: &str, path: String) {
        let unit_bytes = ty.descriptor().bytes();

        let units: Vec<u16> = if unit_bytes == 2 {
            s.encode_utf16().collect()
        } else {
            match s.chars().find(|c| *c as u32 > 0xFF) {
                Some(ch) => {
                    self.failures
                        .push(EncodeError::UnencodableChar { field: path, ch });
                    return;
                }
                None => s.chars().map(|c| c as u16).collect(),
            }
        };

        let written: &[u16] = match fixed_length {
            None => {
                debug_assert_eq!(units.len(), string_units(s, unit_bytes));
                if units.len() > u16::MAX as usize {
                    self.failures.push(EncodeError::LengthOverflow {
                        field: path,
                        unit: "characters",
                        actual: units.len(),
                    });
                    return;
                }
                put_u16_be(&mut self.buf, units.len() as u16);
                &units
            }
            Some(len) => {
                let mut end = units.len().min(len as usize);
                // Never keep half of a surrogate pair.
                if end > 0 && end < units.len() && (0xD800..0xDC00).contains(&units[end - 1]) {
                    end -= 1;
                }
                &units[..end]
            }
        };

        for &unit in written {
            put_uint_be(&mut self.buf, unit as u64, unit_bytes);
        }
        if let Some(len) = fixed_length {
            let padding = (len as usize - written.len()) * unit_bytes;
            self.buf.resize(self.buf.len() + padding, 0);
        }
    }

    /// Write `[u16 byte length][body]`, back-patching the length once the
    /// body is written.
    fn write_block(&mut self, schema: &Schema, value: &Value, path: &str) {
        let start = self.buf.len();
        put_u16_be(&mut self.buf, 0);
        self.write_schema(schema, value, path);

        let len = self.buf.len() - start - SIZEOF_LENGTH;
        if len > u16::MAX as usize {
            self.failures.push(EncodeError::LengthOverflow {
                field: path.to_string(),
                unit: "bytes",
                actual: len,
            });
            return;
        }
        write_u16_be(&mut self.buf[start..], len as u16);
    }

    fn write_array(&mut self, schema: &Schema, value: &Value, path: String) {
        let items = match value {
            Value::Array(items) => items,
            _ => {
                self.mismatch(path, "array", value);
                return;
            }
        };
        if items.len() > u16::MAX as usize {
            self.failures.push(EncodeError::LengthOverflow {
                field: path,
                unit: "elements",
                actual: items.len(),
            });
            return;
        }

        put_u16_be(&mut self.buf, items.len() as u16);
        for (i, item) in items.iter().enumerate() {
            self.write_block(schema, item, &format!("{}[{}]", path, i));
        }
    }

    fn child(&mut self, idx: usize, path: &str) -> Option<&'a Schema> {
        let child = self.set.by_index(idx);
        if child.is_none() {
            self.failures.push(EncodeError::UnknownSchema {
                field: path.to_string(),
                index: idx,
            });
        }
        child
    }

    fn mismatch(&mut self, field: String, expected: &str, actual: &Value) {
        self.failures.push(EncodeError::TypeMismatch {
            field,
            expected: expected.into(),
            actual: actual.type_name().into(),
        });
    }

    fn out_of_range(&mut self, field: String, ty: PrimitiveType, value: &Value) {
        self.failures.push(EncodeError::OutOfRange {
            field,
            type_name: ty.name(),
            value: value.to_string(),
        });
    }
}

fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}

fn display_path(path: &str, schema_name: &str) -> String {
    if path.is_empty() {
        schema_name.to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Template, TypeSpec};

    fn single(type_spec: TypeSpec) -> SchemaSet {
        let mut set = SchemaSet::new();
        set.define("T", Template::new().field("v", type_spec)).unwrap();
        set
    }

    fn body(set: &SchemaSet, value: Value) -> Result<Vec<u8>, EncodeError> {
        encode_nested(set, &set.schemas[0], &Value::from_fields(vec![("v", value)]))
    }

    #[test]
    fn test_integers_big_endian() {
        let set = single("int32".into());
        assert_eq!(body(&set, (-5i64).into()).unwrap(), vec![0xFF, 0xFF, 0xFF, 0xFB]);
        let set = single("uint16".into());
        assert_eq!(body(&set, 0x1234i64.into()).unwrap(), vec![0x12, 0x34]);
        let set = single("uint64".into());
        assert_eq!(body(&set, Value::Unsigned(u64::MAX)).unwrap(), vec![0xFF; 8]);
    }

    #[test]
    fn test_integer_out_of_range() {
        let set = single("int8".into());
        assert!(matches!(
            body(&set, 128i64.into()),
            Err(EncodeError::OutOfRange { type_name: "int8", .. })
        ));
        let set = single("uint32".into());
        assert!(matches!(
            body(&set, (-1i64).into()),
            Err(EncodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_decimal_scaling() {
        let set = single(TypeSpec::new("uint32").decimal_spots(2));
        assert_eq!(body(&set, 12.34f64.into()).unwrap(), 1234u32.to_be_bytes().to_vec());
        assert_eq!(body(&set, 3i64.into()).unwrap(), 300u32.to_be_bytes().to_vec());
        let set = single(TypeSpec::new("int16").decimal_spots(1));
        assert_eq!(body(&set, (-0.25f64).into()).unwrap(), (-3i16).to_be_bytes().to_vec());
        assert!(matches!(
            body(&set, 4000.0f64.into()),
            Err(EncodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_double_rejected_without_decimal_spots() {
        let set = single("int32".into());
        assert!(matches!(
            body(&set, 1.5f64.into()),
            Err(EncodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_dynamic_strings() {
        let set = single("string".into());
        assert_eq!(body(&set, "hi".into()).unwrap(), vec![0, 2, 0, b'h', 0, b'i']);
        let set = single("string_small".into());
        assert_eq!(body(&set, "hé".into()).unwrap(), vec![0, 2, b'h', 0xE9]);
        assert_eq!(
            body(&set, "€".into()),
            Err(EncodeError::UnencodableChar {
                field: "v".into(),
                ch: '€'
            })
        );
    }

    #[test]
    fn test_fixed_strings_pad_and_truncate() {
        let set = single(TypeSpec::new("string_small").fixed_length(4));
        assert_eq!(body(&set, "ab".into()).unwrap(), vec![b'a', b'b', 0, 0]);
        assert_eq!(body(&set, "abcdef".into()).unwrap(), vec![b'a', b'b', b'c', b'd']);

        let set = single(TypeSpec::new("string").fixed_length(2));
        // "a🎉" is three UTF-16 units; the surrogate pair is dropped whole.
        assert_eq!(body(&set, "a🎉".into()).unwrap(), vec![0, b'a', 0, 0]);
    }

    #[test]
    fn test_boolean_packing() {
        let mut set = SchemaSet::new();
        set.define(
            "T",
            Template::new()
                .field("a", "boolean")
                .field("b", "boolean")
                .field("c", "boolean"),
        )
        .unwrap();
        let value = Value::from_fields(vec![
            ("a", true.into()),
            ("b", true.into()),
            ("c", true.into()),
        ]);
        assert_eq!(encode_nested(&set, &set.schemas[0], &value).unwrap(), vec![0b0000_0111]);

        let value = Value::from_fields(vec![
            ("a", false.into()),
            ("b", true.into()),
            ("c", false.into()),
        ]);
        assert_eq!(encode_nested(&set, &set.schemas[0], &value).unwrap(), vec![0b0000_0010]);
    }

    #[test]
    fn test_failures_are_aggregated_with_paths() {
        let mut set = SchemaSet::new();
        let item = set.define("Item", Template::new().field("x", "int8")).unwrap();
        let root = set
            .define(
                "Root",
                Template::new()
                    .field("name", "string")
                    .field("flag", "boolean")
                    .array("items", item),
            )
            .unwrap();
        let value = Value::from_fields(vec![
            ("name", 5i64.into()),
            (
                "items",
                Value::Array(vec![
                    Value::from_fields(vec![("x", 1i64.into())]),
                    Value::from_fields(vec![("x", 999i64.into())]),
                ]),
            ),
        ]);

        let err = encode(&set, &set.schemas[root], &value).unwrap_err();
        let failures = err.failures();
        assert_eq!(failures.len(), 3);
        assert_eq!(
            failures[0],
            &EncodeError::MissingField {
                field: "flag".into()
            }
        );
        assert!(matches!(
            failures[1],
            EncodeError::OutOfRange { field, .. } if field == "items[1].x"
        ));
        assert!(matches!(
            failures[2],
            EncodeError::TypeMismatch { field, .. } if field == "name"
        ));
    }

    #[test]
    fn test_root_must_be_struct() {
        let set = single("int8".into());
        assert_eq!(
            encode(&set, &set.schemas[0], &Value::Integer(1)),
            Err(EncodeError::TypeMismatch {
                field: "T".into(),
                expected: "struct".into(),
                actual: "integer".into()
            })
        );
    }

    #[test]
    fn test_schema_from_another_set() {
        let mut other = SchemaSet::new();
        let item = other.define("Item", Template::new().field("x", "int8")).unwrap();
        let root = other.define("Root", Template::new().array("items", item)).unwrap();
        let value = Value::from_fields(vec![("items", Value::Array(vec![]))]);
        assert_eq!(
            encode(&SchemaSet::new(), &other.schemas[root], &value),
            Err(EncodeError::UnknownSchema {
                field: "items".into(),
                index: item
            })
        );
    }
}
