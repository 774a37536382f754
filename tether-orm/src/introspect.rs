//! Schema introspection: turns an entity's declared fields into validated columns.

use std::collections::HashSet;

use crate::{
    column::{ColumnDescriptor, FieldDef, ForeignKeyDef, SemanticType},
    error::SchemaError,
};

/// A foreign key found while building columns, waiting to be resolved against its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyCandidate {
    /// Position of the foreign-key column in the built column list.
    pub column_index: usize,
    pub field: &'static str,
    pub foreign_key: ForeignKeyDef,
}

/// Builds the ordered columns of `entity` from its declared fields.
///
/// Transient fields are skipped. Candidates come back in declaration order.
pub fn build_columns(
    entity: &str,
    fields: &[FieldDef],
) -> Result<(Vec<ColumnDescriptor>, Vec<ForeignKeyCandidate>), SchemaError> {
    let mut columns = Vec::with_capacity(fields.len());
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();
    let key_count = fields.iter().filter(|field| !field.transient && field.primary_key).count();

    for field in fields.iter().filter(|field| !field.transient) {
        if let SemanticType::Unsupported(type_name) = field.ty {
            return Err(SchemaError::UnsupportedType {
                entity: entity.to_string(),
                field: field.name.to_string(),
                type_name: type_name.to_string(),
            });
        }

        if field.auto_increment && !field.primary_key {
            return Err(SchemaError::AutoIncrementWithoutPrimaryKey {
                entity: entity.to_string(),
                field: field.name.to_string(),
            });
        }

        // The backend assigns one row id, so it can only stand in for a sole key.
        if field.auto_increment && key_count > 1 {
            return Err(SchemaError::AutoIncrementCompositeKey {
                entity: entity.to_string(),
                field: field.name.to_string(),
            });
        }

        if !seen.insert(field.name.to_ascii_lowercase()) {
            return Err(SchemaError::DuplicateColumn { entity: entity.to_string(), column: field.name.to_string() });
        }

        if let Some(foreign_key) = field.foreign_key {
            candidates.push(ForeignKeyCandidate { column_index: columns.len(), field: field.name, foreign_key });
        }

        columns.push(ColumnDescriptor::from_field(field));
    }

    Ok((columns, candidates))
}
