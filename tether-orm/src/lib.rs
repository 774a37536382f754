//! # Tether ORM
//!
//! Maps typed entities onto relational tables. Each entity type declares its columns once,
//! through `#[derive(Entity)]` or a hand-written [`Entity`] impl, and the [`Registry`] turns
//! those declarations into table schemas, foreign-key relationships with inferred cardinality
//! and generic CRUD operations that cascade through related entities.
//!
//! ```rust,ignore
//! use tether_orm::{Entity, Predicate, Registry, SqliteDriver};
//!
//! #[derive(Entity, Debug, Default, Clone, PartialEq)]
//! struct Parent {
//!     #[orm(primary_key, auto_increment)]
//!     id: i64,
//!     name: String,
//!     #[orm(reference)]
//!     children: Vec<Child>,
//! }
//!
//! #[derive(Entity, Debug, Default, Clone, PartialEq)]
//! struct Child {
//!     #[orm(primary_key, auto_increment)]
//!     id: i64,
//!     #[orm(foreign_key = "Parent::id", parent_reference = "children")]
//!     parent_id: i64,
//! }
//!
//! let registry = Registry::builder(SqliteDriver::in_memory())
//!     .register::<Parent>()
//!     .register::<Child>()
//!     .open()
//!     .await?;
//!
//! let parents = registry.model::<Parent>()?.get_all(Predicate::all()).await?;
//! ```
//!
//! Operations run strictly in sequence on the registry's single driver. Cascades are a series
//! of independent statements: a failure halfway through a cascade is returned to the caller,
//! but the rows written before it stay written.

extern crate self as tether_orm;

pub mod codec;
pub mod column;
pub mod driver;
pub mod entity;
pub mod error;
pub mod introspect;
mod materialize;
pub mod migration;
pub mod model;
pub mod object_model;
mod persist;
pub mod query;
pub mod registry;
pub mod relationship;
pub mod schema;
pub mod value;

pub use codec::{DefaultCodec, EntityCodec};
pub use column::{ColumnDescriptor, FieldDef, ForeignKeyDef, SemanticType};
pub use driver::{Driver, sqlite::SqliteDriver, sqlite::SqliteDriverBuilder};
pub use entity::{Entity, Record, ReferenceField, Related};
pub use error::{CodecError, Error, RelationshipError, SchemaError};
pub use migration::{DatabaseInfo, Initialization};
pub use model::Model;
pub use object_model::{ObjectModel, Upsert};
pub use query::{Predicate, Row, Select};
pub use registry::{Registry, RegistryBuilder, RegistryState};
pub use relationship::{Cardinality, Relationship};
pub use tether_orm_macro::{Entity, TetherEnum};
pub use value::{EnumMapping, FromValue, NativeValue, ToValue, Value};
