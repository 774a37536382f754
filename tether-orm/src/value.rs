//! Field values and backend values.
//!
//! [`Value`] is what an entity field holds, tagged with its semantic type. [`NativeValue`] is
//! what a backend stores and returns. The codec converts between the two; the traits in this
//! module convert between Rust field types and [`Value`].

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::CodecError;

/// A field value in its semantic form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
    /// An enumeration variant, by name.
    Enum(String),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Timestamp(_) => "timestamp",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v.into()),
            Value::Short(v) => Some(v.into()),
            Value::Int(v) => Some(v.into()),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }
}

/// A value as a backend stores it.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl NativeValue {
    pub fn kind(&self) -> &'static str {
        match self {
            NativeValue::Null => "NULL",
            NativeValue::Integer(_) => "INTEGER",
            NativeValue::Real(_) => "REAL",
            NativeValue::Text(_) => "TEXT",
            NativeValue::Blob(_) => "BLOB",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => f.write_str("NULL"),
            NativeValue::Integer(v) => write!(f, "{v}"),
            NativeValue::Real(v) => write!(f, "{v}"),
            NativeValue::Text(v) => write!(f, "'{v}'"),
            NativeValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Converts a Rust field into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Converts a [`Value`] back into a Rust field.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, CodecError>;
}

/// Implemented by `#[derive(TetherEnum)]` for unit-only enums stored by variant name.
pub trait EnumMapping: Sized {
    const NAME: &'static str;
    const VARIANTS: &'static [&'static str];
}

fn mismatch(expected: &str, found: &Value) -> CodecError {
    CodecError::TypeMismatch { expected: expected.to_string(), found: found.kind().to_string() }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Text(v) | Value::Enum(v) => Ok(v),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => other.as_integer().map(|v| v != 0).ok_or_else(|| mismatch("bool", &other)),
        }
    }
}

macro_rules! integer_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, CodecError> {
                    let wide = value.as_integer().ok_or_else(|| mismatch(stringify!($ty), &value))?;
                    <$ty>::try_from(wide).map_err(|_| CodecError::OutOfRange {
                        target: stringify!($ty).to_string(),
                        value: wide.to_string(),
                    })
                }
            }
        )*
    };
}

integer_value!(i8 => Byte, i16 => Short, i32 => Int, i64 => Long);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Double(v) if !v.is_finite() || v.abs() <= f64::from(f32::MAX) => Ok(v as f32),
            Value::Double(v) => {
                Err(CodecError::OutOfRange { target: "f32".to_string(), value: v.to_string() })
            }
            other => other.as_integer().map(|v| v as f32).ok_or_else(|| mismatch("f32", &other)),
        }
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(v.into()),
            other => other.as_integer().map(|v| v as f64).ok_or_else(|| mismatch("f64", &other)),
        }
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Timestamp(v) => Ok(v),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.and_utc())
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        DateTime::<Utc>::from_value(value).map(|v| v.naive_utc())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Non-`Option` fields reject nulls before reaching their own conversion.
pub fn require<T: FromValue>(value: Value, field: &str) -> Result<T, CodecError> {
    if value.is_null() {
        return Err(CodecError::UnexpectedNull { target: field.to_string() });
    }
    T::from_value(value)
}
