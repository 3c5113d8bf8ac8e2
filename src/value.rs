use std::collections::HashMap;
use std::fmt;

/// Dynamic value tree matched against a schema by the codec.
#[derive(Clone, Debug)]
pub enum Value {
    /// Signed 64-bit integer.
    Integer(i64),
    /// Unsigned 64-bit integer above `i64::MAX`. Compares equal to an
    /// `Integer` holding the same number.
    Unsigned(u64),
    /// Boolean value.
    Boolean(bool),
    /// Text.
    Str(String),
    /// IEEE 754 double, used for decimal fields.
    Double(f64),
    /// A schema instance with named fields.
    Struct(HashMap<String, Value>),
    /// An ordered array of values.
    Array(Vec<Value>),
}

impl Value {
    /// Create a new empty struct value.
    pub fn new_struct() -> Self {
        Value::Struct(HashMap::new())
    }

    /// Helper to build a struct from key-value pairs.
    pub fn from_fields(fields: Vec<(&str, Value)>) -> Self {
        let mut map = HashMap::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v);
        }
        Value::Struct(map)
    }

    /// Get a field from a struct value, returns None if not a struct or field missing.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(map) => map.get(key),
            _ => None,
        }
    }

    /// Follow a dot-separated path such as `"players.0.name"`.
    ///
    /// Segments address struct fields, or array elements when they parse as an
    /// index. An empty path yields `self`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path_segments(path).try_fold(self, |current, segment| match current {
            Value::Struct(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Mutable counterpart of [`Value::get_path`].
    pub fn get_path_mut(&mut self, path: &str) -> Option<&mut Value> {
        path_segments(path).try_fold(self, |current, segment| match current {
            Value::Struct(map) => map.get_mut(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(move |i| items.get_mut(i)),
            _ => None,
        })
    }

    /// Replace the value at `path`, creating the last segment if its parent is
    /// a struct. Returns false when the parent does not exist or cannot hold
    /// the segment.
    pub fn set_path(&mut self, path: &str, value: Value) -> bool {
        let (parent, last) = match path.rsplit_once('.') {
            Some((parent, last)) => (parent, last),
            None => ("", path),
        };
        if last.is_empty() {
            *self = value;
            return true;
        }
        match self.get_path_mut(parent) {
            Some(Value::Struct(map)) => {
                map.insert(last.to_string(), value);
                true
            }
            Some(Value::Array(items)) => match last.parse::<usize>() {
                Ok(i) if i < items.len() => {
                    items[i] = value;
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Get as i64. Accepts `Unsigned` values that fit.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get as bool.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Get as f64.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as struct map.
    pub fn as_struct(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Struct(map) => Some(map),
            _ => None,
        }
    }

    /// Get as array.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a short type description string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) | Value::Unsigned(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Str(_) => "string",
            Value::Double(_) => "double",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
        }
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Unsigned(a), Value::Unsigned(b)) => a == b,
            (Value::Integer(a), Value::Unsigned(b)) | (Value::Unsigned(b), Value::Integer(a)) => {
                *a >= 0 && *a as u64 == *b
            }
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Unsigned(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Struct(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                write!(f, "{{ ")?;
                for (i, k) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, map[k])?;
                }
                write!(f, " }}")
            }
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

// Conversion traits
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Unsigned(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(v: HashMap<String, Value>) -> Self {
        Value::Struct(v)
    }
}

// TryFrom implementations for extracting values from Value
impl TryFrom<Value> for i64 {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        v.as_integer().ok_or("expected integer")
    }
}

impl TryFrom<Value> for u64 {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Unsigned(u) => Ok(u),
            Value::Integer(i) => u64::try_from(i).map_err(|_| "expected non-negative integer"),
            _ => Err("expected integer"),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Str(s) => Ok(s),
            _ => Err("expected string"),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Boolean(b) => Ok(b),
            _ => Err("expected boolean"),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = &'static str;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Double(d) => Ok(d),
            Value::Integer(i) => Ok(i as f64),
            Value::Unsigned(u) => Ok(u as f64),
            _ => Err("expected double"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from("hello"), Value::Str("hello".into()));
        assert_eq!(Value::from(3.25f64), Value::Double(3.25));
        assert_eq!(Value::from(7u64), Value::Integer(7));
        assert_eq!(Value::from(u64::MAX), Value::Unsigned(u64::MAX));
    }

    #[test]
    fn test_struct_builder() {
        let val = Value::from_fields(vec![("name", "Alice".into()), ("age", 13i64.into())]);
        assert_eq!(val.get("name"), Some(&Value::Str("Alice".into())));
        assert_eq!(val.get("age"), Some(&Value::Integer(13)));
        assert_eq!(val.get("missing"), None);
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::Double(0.1), Value::Double(0.1));
        assert_ne!(Value::Integer(1), Value::Boolean(true));
        assert_eq!(Value::Integer(5), Value::Unsigned(5));
        assert_ne!(Value::Integer(-1), Value::Unsigned(u64::MAX));
    }

    fn sample() -> Value {
        Value::from_fields(vec![
            ("name", "root".into()),
            (
                "players",
                Value::Array(vec![
                    Value::from_fields(vec![("name", "ann".into())]),
                    Value::from_fields(vec![("name", "bo".into())]),
                ]),
            ),
        ])
    }

    #[test]
    fn test_get_path() {
        let v = sample();
        assert_eq!(v.get_path(""), Some(&v));
        assert_eq!(v.get_path("name"), Some(&Value::Str("root".into())));
        assert_eq!(v.get_path("players.1.name"), Some(&Value::Str("bo".into())));
        assert_eq!(v.get_path("players.2.name"), None);
        assert_eq!(v.get_path("players.x"), None);
        assert_eq!(v.get_path("name.length"), None);
    }

    #[test]
    fn test_set_path() {
        let mut v = sample();
        assert!(v.set_path("players.0.name", "cy".into()));
        assert_eq!(v.get_path("players.0.name"), Some(&Value::Str("cy".into())));
        assert!(v.set_path("level", 3i64.into()));
        assert_eq!(v.get("level"), Some(&Value::Integer(3)));
        assert!(v.set_path("players.1", Value::new_struct()));
        assert!(!v.set_path("players.5", Value::new_struct()));
        assert!(!v.set_path("missing.child", 1i64.into()));
    }

    #[test]
    fn test_display_sorted() {
        let v = Value::from_fields(vec![("b", 2i64.into()), ("a", "x".into())]);
        assert_eq!(v.to_string(), "{ a: \"x\", b: 2 }");
    }
}
