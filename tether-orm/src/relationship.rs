//! # Relationship Module
//!
//! Binds a child's foreign-key column to the key column of an already registered parent and
//! infers the cardinality of the link. Relationships name both sides by entity and table;
//! instances are looked up through the registry when a relationship is followed.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    error::{Error, RelationshipError, SchemaError},
    introspect::ForeignKeyCandidate,
    model::Model,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl Cardinality {
    /// Both keys primary gives one-to-one, only the parent key gives one-to-many, anything
    /// else is many-to-many.
    pub fn infer(parent_key_is_primary: bool, child_key_is_primary: bool) -> Self {
        match (parent_key_is_primary, child_key_is_primary) {
            (true, true) => Cardinality::OneToOne,
            (true, false) => Cardinality::OneToMany,
            _ => Cardinality::ManyToMany,
        }
    }

    pub fn is_to_many(&self) -> bool {
        !matches!(self, Cardinality::OneToOne)
    }
}

/// A resolved foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub(crate) parent_entity: &'static str,
    pub(crate) parent_table: String,
    pub(crate) parent_key_field: &'static str,
    pub(crate) child_entity: &'static str,
    pub(crate) child_table: String,
    pub(crate) child_key_field: &'static str,
    pub(crate) parent_reference_field: Option<&'static str>,
    pub(crate) child_reference_field: Option<&'static str>,
    pub(crate) cardinality: Cardinality,
    pub(crate) parent_key_unique: bool,
}

impl Relationship {
    pub fn parent_entity(&self) -> &'static str {
        self.parent_entity
    }

    pub fn parent_table(&self) -> &str {
        &self.parent_table
    }

    pub fn parent_key_field(&self) -> &'static str {
        self.parent_key_field
    }

    pub fn child_entity(&self) -> &'static str {
        self.child_entity
    }

    pub fn child_table(&self) -> &str {
        &self.child_table
    }

    pub fn child_key_field(&self) -> &'static str {
        self.child_key_field
    }

    pub fn parent_reference_field(&self) -> Option<&'static str> {
        self.parent_reference_field
    }

    pub fn child_reference_field(&self) -> Option<&'static str> {
        self.child_reference_field
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Whether the parent key alone identifies one parent row, which SQLite needs before it
    /// will enforce the constraint.
    pub fn parent_key_unique(&self) -> bool {
        self.parent_key_unique
    }

    /// Whether `column` of `model` is this relationship's parent key.
    pub fn is_parent_side(&self, model: &Model, column: &str) -> bool {
        self.parent_entity == model.entity_name() && self.parent_key_field == column
    }

    /// Whether `column` of `model` is this relationship's foreign key.
    pub fn is_child_side(&self, model: &Model, column: &str) -> bool {
        self.child_entity == model.entity_name() && self.child_key_field == column
    }
}

/// Where a resolved relationship attaches on the parent side.
pub(crate) struct Resolution {
    pub relationship: Arc<Relationship>,
    pub parent_model: usize,
    pub parent_column: usize,
}

/// Resolves one foreign-key candidate of `child` against the models registered so far.
pub(crate) fn resolve(child: &Model, candidate: &ForeignKeyCandidate, registered: &[Model]) -> Result<Resolution, Error> {
    let foreign_key = candidate.foreign_key;

    let parent_model = registered.iter().position(|model| model.is_named(foreign_key.table)).ok_or_else(|| {
        SchemaError::UnregisteredParent {
            entity: child.entity_name().to_string(),
            field: candidate.field.to_string(),
            parent: foreign_key.table.to_string(),
        }
    })?;
    let parent = &registered[parent_model];

    let parent_column = parent.column_index(foreign_key.column).ok_or_else(|| SchemaError::MissingField {
        entity: child.entity_name().to_string(),
        field: candidate.field.to_string(),
        parent: parent.entity_name().to_string(),
        parent_field: foreign_key.column.to_string(),
    })?;

    let parent_key = &parent.columns()[parent_column];
    let cardinality = Cardinality::infer(parent_key.is_primary_key(), child.columns()[candidate.column_index].is_primary_key());
    let parent_key_unique =
        parent_key.is_unique() || (parent_key.is_primary_key() && parent.primary_keys().count() == 1);

    if let Some(field) = foreign_key.parent_reference {
        let reference = parent.reference_field(field).ok_or_else(|| RelationshipError::BrokenReference {
            entity: parent.entity_name().to_string(),
            field: field.to_string(),
        })?;
        if cardinality.is_to_many() && !reference.many {
            return Err(RelationshipError::CardinalityMismatch {
                entity: parent.entity_name().to_string(),
                field: field.to_string(),
                cardinality,
            }
            .into());
        }
        check_target(parent.entity_name(), field, reference.target, child.entity_name())?;
    }

    if let Some(field) = foreign_key.child_reference {
        let reference = child.reference_field(field).ok_or_else(|| RelationshipError::BrokenReference {
            entity: child.entity_name().to_string(),
            field: field.to_string(),
        })?;
        if reference.many {
            return Err(RelationshipError::CardinalityMismatch {
                entity: child.entity_name().to_string(),
                field: field.to_string(),
                cardinality,
            }
            .into());
        }
        check_target(child.entity_name(), field, reference.target, parent.entity_name())?;
    }

    let relationship = Relationship {
        parent_entity: parent.entity_name(),
        parent_table: parent.table().to_string(),
        parent_key_field: parent_key.name(),
        child_entity: child.entity_name(),
        child_table: child.table().to_string(),
        child_key_field: candidate.field,
        parent_reference_field: foreign_key.parent_reference,
        child_reference_field: foreign_key.child_reference,
        cardinality,
        parent_key_unique,
    };

    Ok(Resolution { relationship: Arc::new(relationship), parent_model, parent_column })
}

fn check_target(entity: &str, field: &str, target: &str, expected: &str) -> Result<(), RelationshipError> {
    if target == expected {
        return Ok(());
    }
    Err(RelationshipError::ReferenceType {
        entity: entity.to_string(),
        field: field.to_string(),
        expected: expected.to_string(),
        found: target.to_string(),
    })
}
