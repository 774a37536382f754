//! # Registry Module
//!
//! The [`Registry`] owns every [`Model`] of one logical database together with the driver
//! that stores them. It is built once through [`RegistryBuilder`], in dependency order:
//! a child entity must be registered after every parent its foreign keys point to.
//!
//! ```rust,ignore
//! let registry = Registry::builder(SqliteDriver::open("garage.db"))
//!     .version(2)
//!     .register::<Car>()
//!     .register::<Engine>()
//!     .register::<Wheel>()
//!     .on_seed(|registry| Box::pin(async move {
//!         registry.model::<Car>()?.insert(&mut Car::demo()).await?;
//!         Ok(())
//!     }))
//!     .open()
//!     .await?;
//! ```

use std::{any::TypeId, collections::HashMap, fmt};

use futures::future::BoxFuture;
use serde_json::json;

use crate::{
    codec::{DefaultCodec, EntityCodec},
    driver::Driver,
    entity::Entity,
    error::{Error, SchemaError},
    migration::DatabaseInfo,
    model::Model,
    object_model::ObjectModel,
    relationship,
};

/// Invoked after the tables are created or recreated, to insert initial data.
pub type SeedHook = Box<dyn for<'a> Fn(&'a Registry) -> BoxFuture<'a, Result<(), Error>> + Send + Sync>;

/// Lifecycle of a [`Registry`].
///
/// `Created` and `Upgraded` are only observable from inside the seed hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    SchemaBuilt,
    Created,
    Upgraded,
    Connected,
    Disconnected,
}

/// Collects models in registration order.
///
/// A failed registration is remembered and returned by [`build`](Self::build); later
/// registrations are skipped.
pub struct RegistryBuilder {
    driver: Box<dyn Driver>,
    version: i32,
    models: Vec<Model>,
    seed: Option<SeedHook>,
    error: Option<Error>,
}

impl RegistryBuilder {
    pub fn new(driver: impl Driver + 'static) -> Self {
        let builder = Self { driver: Box::new(driver), version: 1, models: Vec::new(), seed: None, error: None };
        builder.register::<DatabaseInfo>()
    }

    /// Declared schema version. A store holding an older version is dropped and recreated.
    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn register<T: Entity>(self) -> Self {
        self.register_with_codec::<T, _>(DefaultCodec)
    }

    /// Registers `T` with its own column mapping.
    pub fn register_with_codec<T, C>(mut self, codec: C) -> Self
    where
        T: Entity,
        C: EntityCodec<T>,
    {
        if self.error.is_some() {
            return self;
        }
        if let Err(error) = self.add::<T, C>(codec) {
            log::error!("failed to register `{}`: {error}", T::name());
            self.error = Some(error);
        }
        self
    }

    fn add<T, C>(&mut self, codec: C) -> Result<(), Error>
    where
        T: Entity,
        C: EntityCodec<T>,
    {
        let duplicate = self
            .models
            .iter()
            .any(|model| model.type_id() == TypeId::of::<T>() || model.is_named(T::name()) || model.is_named(&T::table()));
        if duplicate {
            return Err(SchemaError::DuplicateEntity { entity: T::name().to_string() }.into());
        }

        let (mut model, candidates) = Model::build::<T, C>(codec)?;

        for candidate in &candidates {
            let resolution = relationship::resolve(&model, candidate, &self.models)?;
            log::debug!(
                "{}.{} -> {}.{} ({:?})",
                resolution.relationship.child_entity(),
                resolution.relationship.child_key_field(),
                resolution.relationship.parent_entity(),
                resolution.relationship.parent_key_field(),
                resolution.relationship.cardinality()
            );
            model.column_mut(candidate.column_index).attach(resolution.relationship.clone());
            self.models[resolution.parent_model].column_mut(resolution.parent_column).attach(resolution.relationship);
        }

        self.models.push(model);
        Ok(())
    }

    /// Seed data hook, run once after the tables are created or recreated.
    pub fn on_seed<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a Registry) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.seed = Some(Box::new(hook));
        self
    }

    /// Finishes the schema without touching the store.
    pub fn build(self) -> Result<Registry, Error> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let by_type = self.models.iter().enumerate().map(|(index, model)| (model.type_id(), index)).collect();

        Ok(Registry {
            driver: self.driver,
            models: self.models,
            by_type,
            version: self.version,
            state: RegistryState::SchemaBuilt,
            seed: self.seed,
        })
    }

    /// Builds the schema and initializes the store.
    pub async fn open(self) -> Result<Registry, Error> {
        let mut registry = self.build()?;
        registry.initialize().await?;
        Ok(registry)
    }
}

/// All models of one logical database and the driver that stores them.
pub struct Registry {
    pub(crate) driver: Box<dyn Driver>,
    pub(crate) models: Vec<Model>,
    by_type: HashMap<TypeId, usize>,
    pub(crate) version: i32,
    pub(crate) state: RegistryState,
    pub(crate) seed: Option<SeedHook>,
}

impl Registry {
    pub fn builder(driver: impl Driver + 'static) -> RegistryBuilder {
        RegistryBuilder::new(driver)
    }

    /// Typed operations on the model of `T`.
    pub fn model<T: Entity>(&self) -> Result<ObjectModel<'_, T>, Error> {
        Ok(ObjectModel::new(self, self.model_of::<T>()?))
    }

    pub fn model_of<T: Entity>(&self) -> Result<&Model, Error> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&index| &self.models[index])
            .ok_or_else(|| Error::UnregisteredEntity(T::name().to_string()))
    }

    /// Looks a model up by entity or table name, ignoring case.
    pub fn model_named(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|model| model.is_named(name))
    }

    pub(crate) fn require_model(&self, name: &str) -> Result<&Model, Error> {
        self.model_named(name).ok_or_else(|| Error::UnregisteredEntity(name.to_string()))
    }

    /// Models in registration order, the version table first.
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_connected()
    }

    pub async fn connect(&mut self) -> Result<(), Error> {
        self.driver.connect().await?;
        self.state = RegistryState::Connected;
        log::info!("registry connected");
        Ok(())
    }

    /// Releases the backend handle. Models stay usable for a later [`connect`](Self::connect).
    pub async fn disconnect(&mut self) -> Result<(), Error> {
        self.driver.disconnect().await?;
        self.state = RegistryState::Disconnected;
        log::info!("registry disconnected");
        Ok(())
    }

    /// The registered schema as JSON.
    pub fn describe(&self) -> serde_json::Value {
        let models: Vec<_> = self
            .models
            .iter()
            .map(|model| {
                let columns: Vec<_> = model
                    .columns()
                    .iter()
                    .map(|column| {
                        json!({
                            "name": column.name(),
                            "type": column.semantic_type(),
                            "nullable": column.is_nullable(),
                            "primary_key": column.is_primary_key(),
                            "auto_increment": column.is_auto_increment(),
                            "unique": column.is_unique(),
                            "foreign_key": column.foreign_key(),
                        })
                    })
                    .collect();
                let relationships: Vec<_> =
                    model.relationships().into_iter().map(|relationship| json!(relationship.as_ref())).collect();

                json!({
                    "entity": model.entity_name(),
                    "table": model.table(),
                    "columns": columns,
                    "relationships": relationships,
                })
            })
            .collect();

        json!({ "version": self.version, "models": models })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("version", &self.version)
            .field("state", &self.state)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}
