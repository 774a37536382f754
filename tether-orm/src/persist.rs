//! Insert, update and delete with cascade.
//!
//! Inserts and updates cascade downwards: children held in a parent reference field get
//! their foreign key set to the parent's key and are inserted or updated in turn. Deletes
//! discover children top-down and remove them bottom-up. The first failure stops the
//! cascade and is returned.

use futures::future::BoxFuture;

use crate::{
    entity::Record,
    error::{Error, RelationshipError},
    model::Model,
    object_model::Upsert,
    query::{Predicate, Select},
    registry::Registry,
    value::NativeValue,
};

/// Keys bound per `IN (...)` list.
const KEY_CHUNK: usize = 500;

impl Registry {
    pub(crate) fn insert_record<'a>(&'a self, model: &'a Model, record: &'a mut dyn Record) -> BoxFuture<'a, Result<i64, Error>> {
        Box::pin(async move {
            let mut values = Vec::with_capacity(model.columns().len());
            for column in model.columns().iter().filter(|column| !column.is_auto_increment()) {
                values.push((column.name(), model.encode(&*record, column)?));
            }

            let row_id = self.driver.insert(model.table(), &values).await?;
            log::debug!("inserted {} row {row_id}", model.entity_name());

            if let Some(key) = model.auto_increment_key() {
                model.decode(&mut *record, key, NativeValue::Integer(row_id))?;
            }

            self.cascade(model, record).await?;
            Ok(row_id)
        })
    }

    /// Updates the rows matching `predicate`, or the instance's own row when `None`.
    pub(crate) fn update_record<'a>(
        &'a self,
        model: &'a Model,
        record: &'a mut dyn Record,
        predicate: Option<Predicate>,
    ) -> BoxFuture<'a, Result<u64, Error>> {
        Box::pin(async move {
            let predicate = match predicate {
                Some(predicate) => predicate,
                None => model.key_predicate(&*record, "update")?,
            };

            let mut values = Vec::with_capacity(model.columns().len());
            for column in model.columns() {
                values.push((column.name(), model.encode(&*record, column)?));
            }

            let updated = self.driver.update(model.table(), &values, predicate.clause(), predicate.args()).await?;
            log::debug!("updated {updated} {} row(s)", model.entity_name());

            self.cascade(model, record).await?;
            Ok(updated)
        })
    }

    pub(crate) fn upsert_record<'a>(
        &'a self,
        model: &'a Model,
        record: &'a mut dyn Record,
        predicate: Option<Predicate>,
    ) -> BoxFuture<'a, Result<Upsert, Error>> {
        Box::pin(async move {
            if !model.has_primary_key() {
                return Err(Error::NoPrimaryKey { entity: model.entity_name().to_string(), operation: "insert_or_update" });
            }
            let predicate = match predicate {
                Some(predicate) => predicate,
                None => model.key_predicate(&*record, "insert_or_update")?,
            };

            let exists = {
                let keys = model.primary_keys().map(|column| column.name()).collect();
                let mut probe = Select::new(model.table()).columns(keys).filtered(&predicate);
                probe.order_by = None;
                probe.limit = Some(1);
                !self.driver.query(&probe).await?.is_empty()
            };

            if exists {
                Ok(Upsert::Updated(self.update_record(model, record, Some(predicate)).await?))
            } else {
                Ok(Upsert::Inserted(self.insert_record(model, record).await?))
            }
        })
    }

    /// Writes every child held by `record`'s parent reference fields.
    async fn cascade(&self, model: &Model, record: &mut dyn Record) -> Result<(), Error> {
        for (column, relationship) in model.parent_relationships() {
            let Some(field) = relationship.parent_reference_field() else {
                continue;
            };

            let key = model.encode(&*record, column)?;
            let child = self.require_model(relationship.child_entity())?;
            let child_column = child.column(relationship.child_key_field()).ok_or_else(|| Error::UnknownField {
                entity: child.entity_name().to_string(),
                field: relationship.child_key_field().to_string(),
            })?;

            let children = record.references_mut(field).ok_or_else(|| RelationshipError::BrokenReference {
                entity: model.entity_name().to_string(),
                field: field.to_string(),
            })?;

            for instance in children {
                child.decode(&mut *instance, child_column, key.clone())?;
                self.upsert_record(child, instance, None).await?;
            }
        }
        Ok(())
    }

    /// Deletes the rows matching `predicate` after the children that reference them.
    ///
    /// Returns the number of rows removed across every table.
    pub(crate) fn delete_where<'a>(&'a self, model: &'a Model, predicate: &'a Predicate) -> BoxFuture<'a, Result<u64, Error>> {
        Box::pin(async move {
            let mut removed = 0;

            for (column, relationship) in model.parent_relationships() {
                let child = self.require_model(relationship.child_entity())?;
                let numeric = child
                    .column(relationship.child_key_field())
                    .is_some_and(|child_column| self.driver.is_numeric_type(child_column.semantic_type()));

                let mut select = Select::new(model.table()).columns(vec![column.name()]);
                select.filter = predicate.clause();
                select.args = predicate.args();

                let first = self.driver.first_column_index();
                let keys: Vec<NativeValue> = self
                    .driver
                    .query(&select)
                    .await?
                    .iter()
                    .filter_map(|row| row.value(first).cloned())
                    .filter(|key| !key.is_null())
                    .map(|key| if numeric { key } else { as_text(key) })
                    .collect();

                for chunk in keys.chunks(KEY_CHUNK) {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let children = chunk.iter().cloned().fold(
                        Predicate::new(format!("\"{}\" IN ({placeholders})", relationship.child_key_field())),
                        Predicate::bind_native,
                    );
                    removed += self.delete_where(child, &children).await?;
                }
            }

            removed += self.driver.delete(model.table(), predicate.clause(), predicate.args()).await?;
            log::debug!("deleted from {} ({removed} row(s) in total)", model.entity_name());
            Ok(removed)
        })
    }
}

fn as_text(key: NativeValue) -> NativeValue {
    match key {
        NativeValue::Integer(v) => NativeValue::Text(v.to_string()),
        NativeValue::Real(v) => NativeValue::Text(v.to_string()),
        other => other,
    }
}
