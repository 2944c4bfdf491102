//! Boxed runtime values

use std::fmt;
use std::sync::Arc;

use super::object::ObjectRef;
use super::primitive::Primitive;

/// A boxed value
///
/// Primitive kinds are always carried boxed; their runtime type is the
/// wrapper class (`Value::Int(_)` reports `Integer`).
#[derive(Clone)]
pub enum Value {
    /// Result of a void operation
    Void,
    /// Null reference
    Null,
    /// Boxed `boolean`
    Boolean(bool),
    /// Boxed `byte`
    Byte(i8),
    /// Boxed `char`
    Char(char),
    /// Boxed `short`
    Short(i16),
    /// Boxed `int`
    Int(i32),
    /// Boxed `long`
    Long(i64),
    /// Boxed `float`
    Float(f32),
    /// Boxed `double`
    Double(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Object reference
    Object(ObjectRef),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Runtime type name, `None` for `Null` and `Void`
    pub fn runtime_type(&self) -> Option<String> {
        match self {
            Value::Void | Value::Null => None,
            Value::Str(_) => Some("String".to_string()),
            Value::Object(obj) => Some(obj.class().name().to_string()),
            other => other
                .primitive()
                .and_then(Primitive::wrapper_name)
                .map(str::to_string),
        }
    }

    /// Primitive kind of a boxed primitive
    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Value::Boolean(_) => Some(Primitive::Boolean),
            Value::Byte(_) => Some(Primitive::Byte),
            Value::Char(_) => Some(Primitive::Char),
            Value::Short(_) => Some(Primitive::Short),
            Value::Int(_) => Some(Primitive::Int),
            Value::Long(_) => Some(Primitive::Long),
            Value::Float(_) => Some(Primitive::Float),
            Value::Double(_) => Some(Primitive::Double),
            _ => None,
        }
    }

    /// Default value for a slot of declared type `type_name`
    ///
    /// Zero for primitives, `Void` for `void`, `Null` for references.
    pub fn zero_of(type_name: &str) -> Self {
        match Primitive::from_name(type_name) {
            Some(Primitive::Void) => Value::Void,
            Some(Primitive::Boolean) => Value::Boolean(false),
            Some(Primitive::Byte) => Value::Byte(0),
            Some(Primitive::Char) => Value::Char('\0'),
            Some(Primitive::Short) => Value::Short(0),
            Some(Primitive::Int) => Value::Int(0),
            Some(Primitive::Long) => Value::Long(0),
            Some(Primitive::Float) => Value::Float(0.0),
            Some(Primitive::Double) => Value::Double(0.0),
            None => Value::Null,
        }
    }

    /// Null check
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human readable type for error messages
    pub fn type_label(&self) -> String {
        match self {
            Value::Void => "void".to_string(),
            Value::Null => "null".to_string(),
            other => other.runtime_type().unwrap_or_default(),
        }
    }

    /// Convert a boxed primitive to `target`, widening if needed
    ///
    /// Returns `None` when the value is not a primitive or the conversion
    /// would narrow.
    pub fn widen_to(&self, target: Primitive) -> Option<Value> {
        let source = self.primitive()?;
        if !source.widens_to(target) {
            return None;
        }
        let v = match (self, target) {
            (v, t) if source == t => v.clone(),
            (Value::Byte(b), Primitive::Short) => Value::Short(*b as i16),
            (Value::Byte(b), Primitive::Int) => Value::Int(*b as i32),
            (Value::Short(s), Primitive::Int) => Value::Int(*s as i32),
            (Value::Char(c), Primitive::Int) => Value::Int(*c as i32),
            (v, Primitive::Long) => Value::Long(v.as_i64()?),
            (v, Primitive::Float) => Value::Float(v.as_f64()? as f32),
            (v, Primitive::Double) => Value::Double(v.as_f64()?),
            _ => return None,
        };
        Some(v)
    }

    /// Integral view of a boxed primitive
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Char(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating view of a boxed numeric primitive
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("void"),
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}b", v),
            Value::Char(v) => write!(f, "{:?}", v),
            Value::Short(v) => write!(f, "{}s", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{}f", v),
            Value::Double(v) => write!(f, "{}d", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(o) => write!(f, "{:?}", o),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}
