//! # Entity Module
//!
//! The traits an entity type implements so the engine can read and write it without knowing
//! its concrete type. `#[derive(Entity)]` generates both; they can also be written by hand
//! when a field needs custom handling.

use std::any::Any;

use heck::ToSnakeCase;

use crate::{
    column::FieldDef,
    error::{Error, RelationshipError},
    value::Value,
};

/// A field that holds related entities rather than a column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceField {
    pub name: &'static str,
    /// Entity type name of the referenced instances.
    pub target: &'static str,
    /// `Vec<T>` fields are collections; `Option<T>` and `Option<Box<T>>` hold one.
    pub many: bool,
}

/// Object-safe access to an entity instance.
pub trait Record: Any + Send + Sync {
    fn entity_name(&self) -> &'static str;

    /// Reads a column field.
    fn get_field(&self, field: &str) -> Result<Value, Error>;

    /// Writes a column field.
    fn set_field(&mut self, field: &str, value: Value) -> Result<(), Error>;

    /// The instances currently held by a reference field, or `None` if the entity has no
    /// reference field of that name.
    fn references_mut(&mut self, field: &str) -> Option<Vec<&mut dyn Record>>;

    /// Replaces the contents of a reference field.
    fn set_reference(&mut self, field: &str, related: Related) -> Result<(), Error>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// An entity type mapped to one table.
pub trait Entity: Record + Default + Sized {
    /// The entity type name.
    fn name() -> &'static str;

    /// Table name. Defaults to the entity name in `snake_case`.
    fn table() -> String {
        Self::name().to_snake_case()
    }

    /// Every declared field, transient ones included, in declaration order.
    fn fields() -> Vec<FieldDef>;

    fn reference_fields() -> Vec<ReferenceField> {
        Vec::new()
    }
}

/// Related instances handed to [`Record::set_reference`].
pub enum Related {
    One(Option<Box<dyn Record>>),
    Many(Vec<Box<dyn Record>>),
}

impl Related {
    /// Unpacks into a collection field.
    pub fn into_many<T: Entity>(self, owner: &str, field: &str) -> Result<Vec<T>, Error> {
        let records = match self {
            Related::One(record) => record.into_iter().collect(),
            Related::Many(records) => records,
        };
        records.into_iter().map(|record| downcast(record, owner, field)).collect()
    }

    /// Unpacks into a single-valued field. A collection yields its first element.
    pub fn into_one<T: Entity>(self, owner: &str, field: &str) -> Result<Option<T>, Error> {
        let record = match self {
            Related::One(record) => record,
            Related::Many(records) => records.into_iter().next(),
        };
        record.map(|record| downcast(record, owner, field)).transpose()
    }
}

/// Recovers the concrete entity behind a record.
pub fn downcast<T: Entity>(record: Box<dyn Record>, owner: &str, field: &str) -> Result<T, Error> {
    let found = record.entity_name();
    record.into_any().downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        RelationshipError::ReferenceType {
            entity: owner.to_string(),
            field: field.to_string(),
            expected: T::name().to_string(),
            found: found.to_string(),
        }
        .into()
    })
}
