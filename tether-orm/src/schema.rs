//! DDL rendering for registered models.

use crate::{
    column::{ColumnDescriptor, SemanticType},
    model::Model,
};

/// Storage type of a column.
pub fn storage_type(column: &ColumnDescriptor) -> &'static str {
    if column.is_auto_increment() {
        return "INTEGER";
    }
    match column.semantic_type() {
        SemanticType::Text | SemanticType::Enumeration(_) => "TEXT",
        SemanticType::Bool | SemanticType::Byte => "TINYINT",
        SemanticType::Short => "SMALLINT",
        SemanticType::Int => "INT",
        SemanticType::Long => "BIGINT",
        SemanticType::Float => "FLOAT",
        SemanticType::Double => "DOUBLE",
        SemanticType::Timestamp => "INTEGER",
        SemanticType::Binary | SemanticType::Unsupported(_) => "BLOB",
    }
}

/// `CREATE TABLE IF NOT EXISTS` for `model`.
///
/// A single primary key is declared inline; several keys get a trailing composite
/// `PRIMARY KEY`. A foreign key whose parent column is unique gets a trailing
/// `FOREIGN KEY ... REFERENCES`; other links are tracked by the registry only.
pub fn create_table_sql(model: &Model) -> String {
    let key_count = model.primary_keys().count();
    let mut definitions = Vec::with_capacity(model.columns().len());

    for column in model.columns() {
        let mut definition = format!("\"{}\" {}", column.name(), storage_type(column));

        if column.is_primary_key() && key_count == 1 {
            definition.push_str(" PRIMARY KEY");
            if column.is_auto_increment() {
                definition.push_str(" AUTOINCREMENT");
            }
        }
        if column.is_unique() && !column.is_primary_key() {
            definition.push_str(" UNIQUE");
        }
        if !column.is_nullable() {
            definition.push_str(" NOT NULL");
        }

        definitions.push(definition);
    }

    if key_count > 1 {
        let keys: Vec<_> = model.primary_keys().map(|column| format!("\"{}\"", column.name())).collect();
        definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    for column in model.columns() {
        let parent = column
            .relationships()
            .iter()
            .find(|relationship| relationship.is_child_side(model, column.name()) && relationship.parent_key_unique());
        if let Some(relationship) = parent {
            definitions.push(format!(
                "FOREIGN KEY (\"{}\") REFERENCES \"{}\" (\"{}\")",
                column.name(),
                relationship.parent_table(),
                relationship.parent_key_field()
            ));
        }
    }

    format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", model.table(), definitions.join(", "))
}

pub fn drop_table_sql(model: &Model) -> String {
    format!("DROP TABLE IF EXISTS \"{}\"", model.table())
}
