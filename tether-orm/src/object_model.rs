//! # Object Model Module
//!
//! [`ObjectModel`] is the typed face of a registered [`Model`]. It is obtained from
//! [`Registry::model`] and borrows the registry for as long as it lives.
//!
//! ```rust,ignore
//! let cars = registry.model::<Car>()?;
//!
//! let mut car = Car::new("AB12 CDE", "Volvo", "V70");
//! cars.insert(&mut car).await?;
//!
//! let found = cars.get_first(Predicate::eq("registration", "AB12 CDE")).await?;
//! cars.delete_all(Predicate::new("mileage > ?").bind(200_000)).await?;
//! ```

use std::{fmt, marker::PhantomData};

use crate::{
    entity::{self, Entity, Record},
    error::Error,
    materialize::Traversal,
    model::Model,
    query::Predicate,
    registry::Registry,
};

/// Outcome of an insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// No row matched; the instance was inserted with this row id.
    Inserted(i64),
    /// This many rows were updated.
    Updated(u64),
}

/// Typed operations on one registered entity type.
pub struct ObjectModel<'r, T> {
    registry: &'r Registry,
    model: &'r Model,
    _entity: PhantomData<fn() -> T>,
}

impl<'r, T> ObjectModel<'r, T> {
    pub(crate) fn new(registry: &'r Registry, model: &'r Model) -> Self {
        Self { registry, model, _entity: PhantomData }
    }

    pub fn model(&self) -> &'r Model {
        self.model
    }
}

impl<'r, T: Entity> ObjectModel<'r, T> {
    /// The first instance matching `predicate`, with its relationships populated.
    pub async fn get_first(&self, predicate: Predicate) -> Result<Option<T>, Error> {
        let predicate = predicate.limit(1);
        let mut records = self.registry.fetch(self.model, &predicate, Traversal::default()).await?;
        match records.pop() {
            Some(record) => Ok(Some(self.downcast(record)?)),
            None => Ok(None),
        }
    }

    /// Every instance matching `predicate`, in backend order unless the predicate orders them.
    pub async fn get_all(&self, predicate: Predicate) -> Result<Vec<T>, Error> {
        let records = self.registry.fetch(self.model, &predicate, Traversal::default()).await?;
        records.into_iter().map(|record| self.downcast(record)).collect()
    }

    /// Inserts `instance` and then every child it holds.
    ///
    /// An auto-increment key is written back into `instance` before the children are
    /// written, so they reference the new row.
    pub async fn insert(&self, instance: &mut T) -> Result<i64, Error> {
        self.registry.insert_record(self.model, instance).await
    }

    /// Inserts each instance in turn, stopping at the first failure.
    pub async fn insert_all(&self, instances: &mut [T]) -> Result<Vec<i64>, Error> {
        let mut row_ids = Vec::with_capacity(instances.len());
        for instance in instances.iter_mut() {
            row_ids.push(self.insert(instance).await?);
        }
        Ok(row_ids)
    }

    /// Inserts `instance` and reads the stored row back by primary key.
    pub async fn insert_and_return_updated(&self, instance: &mut T) -> Result<Option<T>, Error> {
        if !self.model.has_primary_key() {
            return Err(Error::NoPrimaryKey {
                entity: self.model.entity_name().to_string(),
                operation: "insert_and_return_updated",
            });
        }
        self.insert(instance).await?;
        let predicate = self.model.key_predicate(&*instance, "insert_and_return_updated")?;
        self.get_first(predicate).await
    }

    /// Updates the row whose primary key matches `instance`, then its children.
    pub async fn update(&self, instance: &mut T) -> Result<u64, Error> {
        self.registry.update_record(self.model, instance, None).await
    }

    /// Writes every column of `instance` into the rows matching `predicate`.
    pub async fn update_where(&self, instance: &mut T, predicate: Predicate) -> Result<u64, Error> {
        self.registry.update_record(self.model, instance, Some(predicate)).await
    }

    /// Updates the row with `instance`'s primary key, inserting it if there is none.
    pub async fn insert_or_update(&self, instance: &mut T) -> Result<Upsert, Error> {
        self.registry.upsert_record(self.model, instance, None).await
    }

    /// Updates the rows matching `predicate`, inserting `instance` if none match.
    pub async fn insert_or_update_where(&self, instance: &mut T, predicate: Predicate) -> Result<Upsert, Error> {
        self.registry.upsert_record(self.model, instance, Some(predicate)).await
    }

    pub async fn insert_or_update_all(&self, instances: &mut [T]) -> Result<Vec<Upsert>, Error> {
        let mut outcomes = Vec::with_capacity(instances.len());
        for instance in instances.iter_mut() {
            outcomes.push(self.insert_or_update(instance).await?);
        }
        Ok(outcomes)
    }

    /// Deletes the row of `instance` and, recursively, every row referencing it.
    ///
    /// Children are found in the store, not in `instance`'s reference fields.
    pub async fn delete(&self, instance: &T) -> Result<u64, Error> {
        let predicate = self.model.key_predicate(instance, "delete")?;
        self.registry.delete_where(self.model, &predicate).await
    }

    pub async fn delete_each(&self, instances: &[T]) -> Result<u64, Error> {
        let mut removed = 0;
        for instance in instances {
            removed += self.delete(instance).await?;
        }
        Ok(removed)
    }

    /// Deletes every row matching `predicate` together with the rows referencing them.
    pub async fn delete_all(&self, predicate: Predicate) -> Result<u64, Error> {
        self.registry.delete_where(self.model, &predicate).await
    }

    fn downcast(&self, record: Box<dyn Record>) -> Result<T, Error> {
        entity::downcast(record, self.model.entity_name(), self.model.table())
    }
}

impl<T> fmt::Debug for ObjectModel<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectModel").field("entity", &self.model.entity_name()).finish()
    }
}
