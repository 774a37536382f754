//! # Column Module
//!
//! Column metadata in two stages. [`FieldDef`] is the raw, build-time declaration emitted by
//! `#[derive(Entity)]` for every field of an entity. [`ColumnDescriptor`] is the validated
//! column the registry works with once [`build_columns`](crate::introspect::build_columns)
//! has accepted the declaration.

use std::sync::Arc;

use serde::Serialize;

use crate::relationship::Relationship;

/// The supported semantic types of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SemanticType {
    Text,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Timestamp,
    Binary,
    /// Stored by variant name; holds the accepted names.
    Enumeration(&'static [&'static str]),
    /// A field type with no mapping. Registration rejects it.
    Unsupported(&'static str),
}

impl SemanticType {
    pub fn is_integer(&self) -> bool {
        matches!(self, SemanticType::Bool | SemanticType::Byte | SemanticType::Short | SemanticType::Int | SemanticType::Long)
    }
}

/// `foreign_key = "Parent::column"` plus the optional reference fields each side populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignKeyDef {
    /// Parent entity or table name, matched case-insensitively.
    pub table: &'static str,
    pub column: &'static str,
    /// Field on the parent that receives the child (or children).
    pub parent_reference: Option<&'static str>,
    /// Field on the child that receives the parent.
    pub child_reference: Option<&'static str>,
}

/// One field of an entity as declared.
///
/// # Example
///
/// ```rust,ignore
/// FieldDef::new("id", SemanticType::Long).primary_key().auto_increment()
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: SemanticType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub transient: bool,
    pub foreign_key: Option<ForeignKeyDef>,
}

impl FieldDef {
    pub const fn new(name: &'static str, ty: SemanticType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            transient: false,
            foreign_key: None,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub const fn foreign_key(mut self, foreign_key: ForeignKeyDef) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }
}

/// A validated, mapped column.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    name: &'static str,
    ty: SemanticType,
    nullable: bool,
    primary_key: bool,
    auto_increment: bool,
    unique: bool,
    foreign_key: Option<ForeignKeyDef>,
    relationships: Vec<Arc<Relationship>>,
}

impl ColumnDescriptor {
    /// A plain, non-null column.
    pub fn new(name: &'static str, ty: SemanticType) -> Self {
        Self::from_field(&FieldDef::new(name, ty))
    }

    /// Primary keys are never nullable, whatever the field says.
    pub(crate) fn from_field(field: &FieldDef) -> Self {
        Self {
            name: field.name,
            ty: field.ty,
            nullable: field.nullable && !field.primary_key,
            primary_key: field.primary_key,
            auto_increment: field.auto_increment,
            unique: field.unique,
            foreign_key: field.foreign_key,
            relationships: Vec::new(),
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable && !self.primary_key;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn foreign_key(&self) -> Option<&ForeignKeyDef> {
        self.foreign_key.as_ref()
    }

    /// Relationships this column takes part in, as parent key or as foreign key.
    pub fn relationships(&self) -> &[Arc<Relationship>] {
        &self.relationships
    }

    pub(crate) fn attach(&mut self, relationship: Arc<Relationship>) {
        self.relationships.push(relationship);
    }
}
