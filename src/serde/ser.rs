//! Serializer from Rust types into `Value`.

use std::collections::HashMap;

use serde::ser::{self, Serialize};

use super::error::SerdeError;
use crate::value::Value;

/// Serializer that converts Rust types to `Value`.
pub struct ValueSerializer;

impl ValueSerializer {
    pub fn serialize<T: ?Sized + Serialize>(value: &T) -> Result<Value, SerdeError> {
        value.serialize(ValueSerializer)
    }
}

/// Serialize a struct or map entry; `Ok(None)` means the entry is omitted.
fn serialize_entry<T: ?Sized + Serialize>(value: &T) -> Result<Option<Value>, SerdeError> {
    match value.serialize(ValueSerializer) {
        Ok(v) => Ok(Some(v)),
        Err(SerdeError::NoneValue) => Ok(None),
        Err(e) => Err(e),
    }
}

fn unsupported<T>(what: &str) -> Result<T, SerdeError> {
    Err(SerdeError::UnsupportedType(what.to_string()))
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = SerdeError;

    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = ser::Impossible<Value, SerdeError>;
    type SerializeMap = MapSerializer;
    type SerializeStruct = StructSerializer;
    type SerializeStructVariant = ser::Impossible<Value, SerdeError>;

    fn serialize_bool(self, v: bool) -> Result<Value, SerdeError> {
        Ok(Value::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, SerdeError> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, SerdeError> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, SerdeError> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, SerdeError> {
        Ok(Value::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, SerdeError> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, SerdeError> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, SerdeError> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, SerdeError> {
        Ok(Value::from(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, SerdeError> {
        Ok(Value::Double(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, SerdeError> {
        Ok(Value::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, SerdeError> {
        Ok(Value::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, SerdeError> {
        Ok(Value::Str(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Value, SerdeError> {
        unsupported("byte buffers")
    }

    fn serialize_none(self) -> Result<Value, SerdeError> {
        Err(SerdeError::NoneValue)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, SerdeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, SerdeError> {
        Ok(Value::new_struct())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, SerdeError> {
        self.serialize_unit()
    }

    /// Unit variants become their index, so C-like enums fit integer fields.
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> Result<Value, SerdeError> {
        Ok(Value::Integer(variant_index.into()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, SerdeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Value, SerdeError> {
        unsupported("enum variants with data")
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, SerdeError> {
        Ok(SeqSerializer {
            elements: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, SerdeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, SerdeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, SerdeError> {
        unsupported("enum variants with data")
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapSerializer, SerdeError> {
        Ok(MapSerializer {
            fields: HashMap::with_capacity(len.unwrap_or(0)),
            current_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<StructSerializer, SerdeError> {
        Ok(StructSerializer {
            fields: HashMap::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, SerdeError> {
        unsupported("enum variants with data")
    }
}

pub struct SeqSerializer {
    elements: Vec<Value>,
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), SerdeError> {
        self.elements.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, SerdeError> {
        Ok(Value::Array(self.elements))
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), SerdeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, SerdeError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), SerdeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, SerdeError> {
        ser::SerializeSeq::end(self)
    }
}

/// Maps with string keys become structs.
pub struct MapSerializer {
    fields: HashMap<String, Value>,
    current_key: Option<String>,
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), SerdeError> {
        match key.serialize(ValueSerializer)? {
            Value::Str(s) => {
                self.current_key = Some(s);
                Ok(())
            }
            other => Err(SerdeError::mismatch("string map key", other.type_name())),
        }
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), SerdeError> {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| SerdeError::Custom("serialize_value called before serialize_key".into()))?;
        if let Some(v) = serialize_entry(value)? {
            self.fields.insert(key, v);
        }
        Ok(())
    }

    fn end(self) -> Result<Value, SerdeError> {
        Ok(Value::Struct(self.fields))
    }
}

pub struct StructSerializer {
    fields: HashMap<String, Value>,
}

impl ser::SerializeStruct for StructSerializer {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), SerdeError> {
        if let Some(v) = serialize_entry(value)? {
            self.fields.insert(key.to_string(), v);
        }
        Ok(())
    }

    fn end(self) -> Result<Value, SerdeError> {
        Ok(Value::Struct(self.fields))
    }
}
