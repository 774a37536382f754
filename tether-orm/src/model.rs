//! # Model Module
//!
//! The validated runtime form of an entity. A [`Model`] is derived from the entity's
//! declared fields at registration and carries everything the registry needs to read and
//! write its rows.

use std::{any::TypeId, fmt, sync::Arc};

use crate::{
    codec::{Codec, EntityCodec, TypedCodec},
    column::ColumnDescriptor,
    entity::{Entity, Record, ReferenceField},
    error::{Error, SchemaError},
    introspect::{self, ForeignKeyCandidate},
    query::Predicate,
    relationship::Relationship,
    value::NativeValue,
};

/// The runtime descriptor of one entity type: its table, its ordered columns, the
/// relationships attached to them and the codec that maps instances to rows.
///
/// Models are built by the [`Registry`](crate::Registry) at registration and never change
/// afterwards.
///
/// # Example
///
/// ```rust,ignore
/// let model = registry.model_named("Wheel").unwrap();
/// assert_eq!(model.table(), "wheel");
/// for column in model.columns() {
///     println!("{} {:?}", column.name(), column.semantic_type());
/// }
/// ```
pub struct Model {
    entity: &'static str,
    table: String,
    type_id: TypeId,
    columns: Vec<ColumnDescriptor>,
    references: Vec<ReferenceField>,
    codec: Arc<dyn Codec>,
    factory: fn() -> Box<dyn Record>,
}

fn instantiate<T: Entity>() -> Box<dyn Record> {
    Box::new(T::default())
}

impl Model {
    /// Builds the model of `T`. Foreign keys come back unresolved.
    pub(crate) fn build<T, C>(codec: C) -> Result<(Self, Vec<ForeignKeyCandidate>), SchemaError>
    where
        T: Entity,
        C: EntityCodec<T>,
    {
        let (columns, candidates) = introspect::build_columns(T::name(), &T::fields())?;
        let model = Self {
            entity: T::name(),
            table: T::table(),
            type_id: TypeId::of::<T>(),
            columns,
            references: T::reference_fields(),
            codec: Arc::new(TypedCodec::<T, C>::new(codec)),
            factory: instantiate::<T>,
        };
        Ok((model, candidates))
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Matches the entity name or the table name, ignoring case.
    pub fn is_named(&self, name: &str) -> bool {
        self.entity.eq_ignore_ascii_case(name) || self.table.eq_ignore_ascii_case(name)
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name() == name)
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> &mut ColumnDescriptor {
        &mut self.columns[index]
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|column| column.is_primary_key())
    }

    pub fn has_primary_key(&self) -> bool {
        self.primary_keys().next().is_some()
    }

    /// The single auto-increment key, if the model has one.
    pub fn auto_increment_key(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.is_auto_increment())
    }

    pub fn reference_fields(&self) -> &[ReferenceField] {
        &self.references
    }

    pub fn reference_field(&self, name: &str) -> Option<&ReferenceField> {
        self.references.iter().find(|reference| reference.name == name)
    }

    /// Relationships in which this model is the parent, with the key column they hang off.
    pub fn parent_relationships(&self) -> impl Iterator<Item = (&ColumnDescriptor, &Arc<Relationship>)> {
        self.columns.iter().flat_map(move |column| {
            column
                .relationships()
                .iter()
                .filter(move |relationship| relationship.is_parent_side(self, column.name()))
                .map(move |relationship| (column, relationship))
        })
    }

    /// All relationships attached to this model's columns, each once.
    pub fn relationships(&self) -> Vec<&Arc<Relationship>> {
        let mut found: Vec<&Arc<Relationship>> = Vec::new();
        for relationship in self.columns.iter().flat_map(|column| column.relationships()) {
            if !found.iter().any(|known| Arc::ptr_eq(known, relationship)) {
                found.push(relationship);
            }
        }
        found
    }

    pub(crate) fn instantiate(&self) -> Box<dyn Record> {
        (self.factory)()
    }

    pub(crate) fn encode(&self, record: &dyn Record, column: &ColumnDescriptor) -> Result<NativeValue, Error> {
        self.codec.encode(record, column)
    }

    pub(crate) fn decode(&self, record: &mut dyn Record, column: &ColumnDescriptor, native: NativeValue) -> Result<(), Error> {
        self.codec.decode(record, column, native)
    }

    /// `AND` of every primary-key column equal to its current value on `record`.
    pub(crate) fn key_predicate(&self, record: &dyn Record, operation: &'static str) -> Result<Predicate, Error> {
        if !self.has_primary_key() {
            return Err(Error::NoPrimaryKey { entity: self.entity.to_string(), operation });
        }
        let mut predicate = Predicate::all();
        for column in self.primary_keys() {
            let value = self.encode(record, column)?;
            predicate = predicate.and(Predicate::new(format!("\"{}\" = ?", column.name())).bind_native(value));
        }
        Ok(predicate)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("entity", &self.entity)
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("references", &self.references)
            .finish_non_exhaustive()
    }
}
