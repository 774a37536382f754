//! # Driver Module
//!
//! The storage backend as the engine sees it. The core never builds connection handles or
//! iterates backend cursors itself; everything goes through [`Driver`].

pub mod sqlite;

use std::path::Path;

use async_trait::async_trait;

use crate::{
    column::SemanticType,
    error::Error,
    query::{Row, Select},
    value::NativeValue,
};

/// A storage backend.
///
/// `where` clauses use positional `?` placeholders and `args` are bound in order.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn connect(&mut self) -> Result<(), Error>;

    async fn disconnect(&mut self) -> Result<(), Error>;

    fn is_connected(&self) -> bool;

    /// Location of the backing store, or `None` when it lives in memory.
    fn database_file(&self) -> Option<&Path>;

    /// Runs a statement that returns no rows, such as DDL.
    async fn execute(&self, sql: &str) -> Result<(), Error>;

    async fn query(&self, select: &Select<'_>) -> Result<Vec<Row>, Error>;

    async fn raw_query(&self, sql: &str, args: &[NativeValue]) -> Result<Vec<Row>, Error>;

    /// Inserts one row and returns the backend row id.
    async fn insert(&self, table: &str, values: &[(&str, NativeValue)]) -> Result<i64, Error>;

    /// Returns the number of rows changed.
    async fn update(
        &self,
        table: &str,
        values: &[(&str, NativeValue)],
        filter: Option<&str>,
        args: &[NativeValue],
    ) -> Result<u64, Error>;

    /// Returns the number of rows removed.
    async fn delete(&self, table: &str, filter: Option<&str>, args: &[NativeValue]) -> Result<u64, Error>;

    /// Whether the backend stores `ty` in a numeric column.
    fn is_numeric_type(&self, ty: SemanticType) -> bool;

    /// Index of the first column in the rows this driver returns.
    fn first_column_index(&self) -> usize;
}
