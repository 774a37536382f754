//! # Error Module
//!
//! Every fallible operation in the crate returns [`Error`]. Schema problems, relationship
//! problems and codec problems each have their own enum so callers can match on the family
//! without parsing messages.

use thiserror::Error;

use crate::relationship::Cardinality;

/// Problems found while deriving a model's columns at registration time.
///
/// Any of these aborts registry construction.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field `{entity}.{field}` has unsupported type `{type_name}`")]
    UnsupportedType { entity: String, field: String, type_name: String },

    #[error("foreign key `{entity}.{field}` references `{parent}.{parent_field}`, which does not exist")]
    MissingField { entity: String, field: String, parent: String, parent_field: String },

    #[error("foreign key `{entity}.{field}` references `{parent}`, which is not registered yet")]
    UnregisteredParent { entity: String, field: String, parent: String },

    #[error("column `{column}` is declared twice on `{entity}`")]
    DuplicateColumn { entity: String, column: String },

    #[error("entity `{entity}` is registered twice")]
    DuplicateEntity { entity: String },

    #[error("field `{entity}.{field}` is auto-increment but not a primary key")]
    AutoIncrementWithoutPrimaryKey { entity: String, field: String },

    #[error("field `{entity}.{field}` is auto-increment inside a composite primary key")]
    AutoIncrementCompositeKey { entity: String, field: String },
}

/// Problems with the reference fields a relationship is declared to populate.
#[derive(Debug, Error)]
pub enum RelationshipError {
    #[error("reference field `{entity}.{field}` is not declared")]
    BrokenReference { entity: String, field: String },

    #[error("reference field `{entity}.{field}` holds a single entity but the relationship is {cardinality:?}")]
    CardinalityMismatch { entity: String, field: String, cardinality: Cardinality },

    #[error("reference field `{entity}.{field}` expected `{expected}`, got `{found}`")]
    ReferenceType { entity: String, field: String, expected: String, found: String },
}

/// Conversion failures between field values and backend values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("value {value} is out of range for `{target}`")]
    OutOfRange { target: String, value: String },

    #[error("`{value}` is not a variant of `{target}`")]
    InvalidEnumValue { target: String, value: String },

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("`{target}` is not nullable")]
    UnexpectedNull { target: String },

    #[error("field `{field}` is mapped by a model codec")]
    Unmapped { field: String },
}

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Relationship(#[from] RelationshipError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("`{entity}` has no primary key, which {operation} requires")]
    NoPrimaryKey { entity: String, operation: &'static str },

    #[error("failed to materialize `{entity}`: {source}")]
    Materialization {
        entity: String,
        #[source]
        source: Box<Error>,
    },

    #[error("entity `{0}` is not registered")]
    UnregisteredEntity(String),

    #[error("`{entity}` has no field `{field}`")]
    UnknownField { entity: String, field: String },

    #[error("the driver is not connected")]
    NotConnected,
}

impl Error {
    /// Wraps a driver failure that has no dedicated error type.
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into().into())
    }

    /// Tags an error raised while building an instance of `entity`.
    ///
    /// Nested materialization failures keep the innermost entity.
    pub(crate) fn materializing(self, entity: &str) -> Self {
        match self {
            Error::Materialization { .. } => self,
            other => Error::Materialization { entity: entity.to_string(), source: Box::new(other) },
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Error::Backend(Box::new(error))
    }
}
