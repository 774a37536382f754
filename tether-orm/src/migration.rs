//! # Migration Module
//!
//! Store initialization. A new store gets every table created in registration order, a
//! version record and a run of the seed hook. A store whose recorded version is older than
//! the declared one is dropped and rebuilt the same way; there is no column-level migration.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    Entity,
    error::Error,
    query::Predicate,
    registry::{Registry, RegistryState},
    schema,
};

/// The version record kept in every store.
#[derive(Entity, Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseInfo {
    pub version: i32,
    pub created_date: DateTime<Utc>,
    pub accessed_date: DateTime<Utc>,
}

/// What [`Registry::initialize`] did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    /// Tables created and seeded.
    Created,
    /// Tables dropped, recreated and reseeded.
    Upgraded { from: i32, to: i32 },
    /// The store was already at the declared version.
    Opened,
}

impl Registry {
    /// Connects and brings the store to the declared version.
    ///
    /// A store counts as new while its version table is empty, so calling this again on a
    /// live connection opens the store instead of recreating it.
    ///
    /// Errors from the backend or the seed hook are returned as they are; the store may be
    /// left partly initialized.
    pub async fn initialize(&mut self) -> Result<Initialization, Error> {
        self.connect().await?;

        let info_model = self.model_of::<DatabaseInfo>()?;
        self.driver.execute(&schema::create_table_sql(info_model)).await?;

        let outcome = match self.stored_info().await? {
            None => {
                self.state = RegistryState::Created;
                log::info!("creating schema version {}", self.version);
                self.create_tables().await?;
                self.write_version(Utc::now()).await?;
                self.seed().await?;
                Initialization::Created
            }
            Some(info) if info.version < self.version => {
                self.state = RegistryState::Upgraded;
                log::info!("upgrading schema from version {} to {}", info.version, self.version);
                self.drop_tables().await?;
                self.create_tables().await?;
                self.write_version(info.created_date).await?;
                self.seed().await?;
                Initialization::Upgraded { from: info.version, to: self.version }
            }
            Some(mut info) => {
                if info.version > self.version {
                    log::warn!("store is at version {}, newer than declared version {}", info.version, self.version);
                }
                info.accessed_date = Utc::now();
                self.model::<DatabaseInfo>()?.update_where(&mut info, Predicate::all()).await?;
                Initialization::Opened
            }
        };

        self.state = RegistryState::Connected;
        Ok(outcome)
    }

    /// The version record, if the store has one.
    pub async fn stored_info(&self) -> Result<Option<DatabaseInfo>, Error> {
        self.model::<DatabaseInfo>()?.get_first(Predicate::all()).await
    }

    async fn create_tables(&self) -> Result<(), Error> {
        for model in &self.models {
            self.driver.execute(&schema::create_table_sql(model)).await?;
        }
        Ok(())
    }

    /// Children go first so foreign keys stay satisfied while dropping.
    async fn drop_tables(&self) -> Result<(), Error> {
        for model in self.models.iter().rev() {
            self.driver.execute(&schema::drop_table_sql(model)).await?;
        }
        Ok(())
    }

    async fn write_version(&self, created_date: DateTime<Utc>) -> Result<(), Error> {
        let mut info = DatabaseInfo { version: self.version, created_date, accessed_date: Utc::now() };
        self.model::<DatabaseInfo>()?.insert(&mut info).await?;
        Ok(())
    }

    async fn seed(&self) -> Result<(), Error> {
        if let Some(hook) = &self.seed {
            log::info!("seeding schema version {}", self.version);
            hook(self).await?;
        }
        Ok(())
    }
}
