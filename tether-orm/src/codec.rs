//! # Codec Module
//!
//! Converts field values to backend values and back, column by column.
//!
//! Booleans are stored as `0`/`1`, timestamps as milliseconds since the Unix epoch and
//! enumerations as their variant name. Binary data passes through unchanged and null stays
//! null in both directions.
//!
//! A model can replace the per-column mapping with its own [`EntityCodec`], for example to
//! collapse a small value object into a single discriminant column. Both directions must be
//! written together.

use std::{any::type_name, marker::PhantomData};

use chrono::{DateTime, Utc};

use crate::{
    column::{ColumnDescriptor, SemanticType},
    entity::{Entity, Record},
    error::{CodecError, Error, RelationshipError},
    value::{NativeValue, Value},
};

/// Encodes a field value for `column`.
pub fn encode(value: &Value, column: &ColumnDescriptor) -> Result<NativeValue, CodecError> {
    let native = match (column.semantic_type(), value) {
        (_, Value::Null) => NativeValue::Null,
        (SemanticType::Text, Value::Text(v)) => NativeValue::Text(v.clone()),
        (SemanticType::Bool, Value::Bool(v)) => NativeValue::Integer(i64::from(*v)),
        (SemanticType::Byte, Value::Byte(v)) => NativeValue::Integer((*v).into()),
        (SemanticType::Short, Value::Short(v)) => NativeValue::Integer((*v).into()),
        (SemanticType::Int, Value::Int(v)) => NativeValue::Integer((*v).into()),
        (SemanticType::Long, Value::Long(v)) => NativeValue::Integer(*v),
        (SemanticType::Float, Value::Float(v)) => NativeValue::Real((*v).into()),
        (SemanticType::Double, Value::Double(v)) => NativeValue::Real(*v),
        (SemanticType::Timestamp, Value::Timestamp(v)) => NativeValue::Integer(v.timestamp_millis()),
        (SemanticType::Binary, Value::Bytes(v)) => NativeValue::Blob(v.clone()),
        (SemanticType::Enumeration(variants), Value::Enum(v) | Value::Text(v)) => {
            if !variants.contains(&v.as_str()) {
                return Err(CodecError::InvalidEnumValue { target: column.name().to_string(), value: v.clone() });
            }
            NativeValue::Text(v.clone())
        }
        (ty, value) => {
            return Err(CodecError::TypeMismatch {
                expected: format!("{ty:?} for `{}`", column.name()),
                found: value.kind().to_string(),
            });
        }
    };
    Ok(native)
}

/// Decodes a backend value read from `column`.
pub fn decode(native: NativeValue, column: &ColumnDescriptor) -> Result<Value, CodecError> {
    let out_of_range = |value: &dyn ToString| CodecError::OutOfRange {
        target: column.name().to_string(),
        value: value.to_string(),
    };

    let value = match (column.semantic_type(), native) {
        (_, NativeValue::Null) => Value::Null,
        (SemanticType::Text, NativeValue::Text(v)) => Value::Text(v),
        (SemanticType::Text, NativeValue::Integer(v)) => Value::Text(v.to_string()),
        (SemanticType::Text, NativeValue::Real(v)) => Value::Text(v.to_string()),
        (SemanticType::Bool, NativeValue::Integer(v)) => Value::Bool(v != 0),
        (SemanticType::Byte, NativeValue::Integer(v)) => Value::Byte(i8::try_from(v).map_err(|_| out_of_range(&v))?),
        (SemanticType::Short, NativeValue::Integer(v)) => {
            Value::Short(i16::try_from(v).map_err(|_| out_of_range(&v))?)
        }
        (SemanticType::Int, NativeValue::Integer(v)) => Value::Int(i32::try_from(v).map_err(|_| out_of_range(&v))?),
        (SemanticType::Long, NativeValue::Integer(v)) => Value::Long(v),
        (SemanticType::Float, NativeValue::Real(v)) => {
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                return Err(out_of_range(&v));
            }
            Value::Float(v as f32)
        }
        (SemanticType::Float, NativeValue::Integer(v)) => Value::Float(v as f32),
        (SemanticType::Double, NativeValue::Real(v)) => Value::Double(v),
        (SemanticType::Double, NativeValue::Integer(v)) => Value::Double(v as f64),
        (SemanticType::Timestamp, NativeValue::Integer(v)) => {
            Value::Timestamp(DateTime::<Utc>::from_timestamp_millis(v).ok_or_else(|| out_of_range(&v))?)
        }
        (SemanticType::Binary, NativeValue::Blob(v)) => Value::Bytes(v),
        (SemanticType::Binary, NativeValue::Text(v)) => Value::Bytes(v.into_bytes()),
        (SemanticType::Enumeration(variants), NativeValue::Text(v)) => {
            if !variants.contains(&v.as_str()) {
                return Err(CodecError::InvalidEnumValue { target: column.name().to_string(), value: v });
            }
            Value::Enum(v)
        }
        (ty, native) => {
            return Err(CodecError::TypeMismatch {
                expected: format!("{ty:?} for `{}`", column.name()),
                found: native.kind().to_string(),
            });
        }
    };
    Ok(value)
}

/// Encodes a value without a column, as for predicate arguments.
pub fn to_native(value: &Value) -> NativeValue {
    match value {
        Value::Null => NativeValue::Null,
        Value::Text(v) | Value::Enum(v) => NativeValue::Text(v.clone()),
        Value::Bool(v) => NativeValue::Integer(i64::from(*v)),
        Value::Byte(v) => NativeValue::Integer((*v).into()),
        Value::Short(v) => NativeValue::Integer((*v).into()),
        Value::Int(v) => NativeValue::Integer((*v).into()),
        Value::Long(v) => NativeValue::Integer(*v),
        Value::Float(v) => NativeValue::Real((*v).into()),
        Value::Double(v) => NativeValue::Real(*v),
        Value::Timestamp(v) => NativeValue::Integer(v.timestamp_millis()),
        Value::Bytes(v) => NativeValue::Blob(v.clone()),
    }
}

/// Default mapping of one column: read the field and encode it.
pub fn encode_field<R: Record + ?Sized>(record: &R, column: &ColumnDescriptor) -> Result<NativeValue, Error> {
    let value = record.get_field(column.name())?;
    Ok(encode(&value, column)?)
}

/// Default mapping of one column: decode the value and write the field.
pub fn decode_field<R: Record + ?Sized>(record: &mut R, column: &ColumnDescriptor, native: NativeValue) -> Result<(), Error> {
    let value = decode(native, column)?;
    record.set_field(column.name(), value)
}

/// Per-model column mapping.
///
/// Columns an override does not handle itself should go through [`encode_field`] and
/// [`decode_field`].
pub trait EntityCodec<T: Entity>: Send + Sync + 'static {
    fn encode(&self, entity: &T, column: &ColumnDescriptor) -> Result<NativeValue, Error>;

    fn decode(&self, entity: &mut T, column: &ColumnDescriptor, native: NativeValue) -> Result<(), Error>;
}

/// The one-field-per-column mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl<T: Entity> EntityCodec<T> for DefaultCodec {
    fn encode(&self, entity: &T, column: &ColumnDescriptor) -> Result<NativeValue, Error> {
        encode_field(entity, column)
    }

    fn decode(&self, entity: &mut T, column: &ColumnDescriptor, native: NativeValue) -> Result<(), Error> {
        decode_field(entity, column, native)
    }
}

/// Type-erased codec stored on a [`Model`](crate::Model).
pub(crate) trait Codec: Send + Sync {
    fn encode(&self, record: &dyn Record, column: &ColumnDescriptor) -> Result<NativeValue, Error>;

    fn decode(&self, record: &mut dyn Record, column: &ColumnDescriptor, native: NativeValue) -> Result<(), Error>;
}

pub(crate) struct TypedCodec<T, C> {
    codec: C,
    _entity: PhantomData<fn() -> T>,
}

impl<T, C> TypedCodec<T, C> {
    pub(crate) fn new(codec: C) -> Self {
        Self { codec, _entity: PhantomData }
    }
}

fn wrong_record(found: &str, column: &ColumnDescriptor, expected: &str) -> Error {
    RelationshipError::ReferenceType {
        entity: found.to_string(),
        field: column.name().to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
    .into()
}

impl<T: Entity, C: EntityCodec<T>> Codec for TypedCodec<T, C> {
    fn encode(&self, record: &dyn Record, column: &ColumnDescriptor) -> Result<NativeValue, Error> {
        let entity = record
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| wrong_record(record.entity_name(), column, type_name::<T>()))?;
        self.codec.encode(entity, column)
    }

    fn decode(&self, record: &mut dyn Record, column: &ColumnDescriptor, native: NativeValue) -> Result<(), Error> {
        let found = record.entity_name();
        let entity = record
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| wrong_record(found, column, type_name::<T>()))?;
        self.codec.decode(entity, column, native)
    }
}
