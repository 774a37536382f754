//! Row-to-instance materialization with relationship population.
//!
//! Every column is decoded first, then each relationship on the instance's columns is
//! followed through its declared reference field. An instance already being built higher up
//! the same traversal (same entity, same key) is decoded but not expanded again, which keeps
//! cyclic relationship graphs finite.

use std::{collections::HashSet, sync::Arc};

use futures::future::BoxFuture;

use crate::{
    entity::{Record, Related},
    error::Error,
    model::Model,
    query::{Predicate, Row, Select},
    registry::Registry,
    relationship::Relationship,
    value::NativeValue,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct Traversal {
    path: HashSet<String>,
    /// Set when the current instance was fetched as a child through this relationship.
    from_parent: Option<Arc<Relationship>>,
}

impl Traversal {
    /// Records `identity` on the path. `false` if it is already there.
    fn enter(&mut self, identity: String) -> bool {
        self.path.insert(identity)
    }

    fn for_children(&self, relationship: &Arc<Relationship>) -> Self {
        Self { path: self.path.clone(), from_parent: Some(relationship.clone()) }
    }

    fn for_parent(&self) -> Self {
        Self { path: self.path.clone(), from_parent: None }
    }

    fn came_from(&self, relationship: &Arc<Relationship>) -> bool {
        self.from_parent.as_ref().is_some_and(|from| Arc::ptr_eq(from, relationship))
    }
}

/// Entity name plus primary-key values, or every value for a keyless model.
fn identity(model: &Model, row: &Row, first: usize) -> String {
    let keyed = model.has_primary_key();
    let parts: Vec<String> = model
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| !keyed || column.is_primary_key())
        .map(|(offset, _)| row.value(first + offset).map(ToString::to_string).unwrap_or_default())
        .collect();
    format!("{}({})", model.entity_name(), parts.join(","))
}

impl Registry {
    /// Fetches and materializes every row of `model` matching `predicate`.
    pub(crate) fn fetch<'a>(
        &'a self,
        model: &'a Model,
        predicate: &'a Predicate,
        traversal: Traversal,
    ) -> BoxFuture<'a, Result<Vec<Box<dyn Record>>, Error>> {
        Box::pin(async move {
            let columns = model.columns().iter().map(|column| column.name()).collect();
            let select = Select::new(model.table()).columns(columns).filtered(predicate);
            let rows = self.driver.query(&select).await?;

            let mut records = Vec::with_capacity(rows.len());
            for row in rows {
                records.push(self.materialize(model, row, traversal.clone()).await?);
            }
            Ok(records)
        })
    }

    /// Builds one instance of `model` from `row`.
    pub(crate) fn materialize<'a>(
        &'a self,
        model: &'a Model,
        row: Row,
        traversal: Traversal,
    ) -> BoxFuture<'a, Result<Box<dyn Record>, Error>> {
        Box::pin(async move {
            self.build_instance(model, &row, traversal).await.map_err(|error| error.materializing(model.entity_name()))
        })
    }

    async fn build_instance(&self, model: &Model, row: &Row, mut traversal: Traversal) -> Result<Box<dyn Record>, Error> {
        let first = self.driver.first_column_index();
        let mut record = model.instantiate();

        for (offset, column) in model.columns().iter().enumerate() {
            let native = row.require(first + offset)?.clone();
            model.decode(record.as_mut(), column, native)?;
        }

        if !traversal.enter(identity(model, row, first)) {
            return Ok(record);
        }

        for (offset, column) in model.columns().iter().enumerate() {
            let key = row.require(first + offset)?;
            for relationship in column.relationships() {
                if relationship.is_parent_side(model, column.name()) {
                    self.populate_children(record.as_mut(), relationship, key, &traversal).await?;
                } else if relationship.is_child_side(model, column.name()) {
                    self.populate_parent(record.as_mut(), relationship, key, &traversal).await?;
                }
            }
        }

        Ok(record)
    }

    async fn populate_children(
        &self,
        record: &mut dyn Record,
        relationship: &Arc<Relationship>,
        key: &NativeValue,
        traversal: &Traversal,
    ) -> Result<(), Error> {
        let Some(field) = relationship.parent_reference_field() else {
            return Ok(());
        };
        let to_many = relationship.cardinality().is_to_many();

        let children = if key.is_null() {
            Vec::new()
        } else {
            let child = self.require_model(relationship.child_entity())?;
            let mut predicate =
                Predicate::new(format!("\"{}\" = ?", relationship.child_key_field())).bind_native(key.clone());
            if let Some(order) = child.auto_increment_key() {
                predicate = predicate.order_by(format!("\"{}\"", order.name()));
            }
            if !to_many {
                predicate = predicate.limit(1);
            }
            self.fetch(child, &predicate, traversal.for_children(relationship)).await?
        };

        let related = if to_many { Related::Many(children) } else { Related::One(children.into_iter().next()) };
        record.set_reference(field, related)
    }

    async fn populate_parent(
        &self,
        record: &mut dyn Record,
        relationship: &Arc<Relationship>,
        key: &NativeValue,
        traversal: &Traversal,
    ) -> Result<(), Error> {
        let Some(field) = relationship.child_reference_field() else {
            return Ok(());
        };
        if traversal.came_from(relationship) {
            return Ok(());
        }
        if key.is_null() {
            return record.set_reference(field, Related::One(None));
        }

        let parent = self.require_model(relationship.parent_entity())?;
        let predicate =
            Predicate::new(format!("\"{}\" = ?", relationship.parent_key_field())).bind_native(key.clone()).limit(1);
        let mut parents = self.fetch(parent, &predicate, traversal.for_parent()).await?;
        record.set_reference(field, Related::One(parents.pop()))
    }
}
