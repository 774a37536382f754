//! SQLite backend on top of an sqlx connection pool.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use async_trait::async_trait;
use sqlx::{
    Column, Row as _, TypeInfo, ValueRef,
    query::Query,
    sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
};

use crate::{
    column::SemanticType,
    driver::Driver,
    error::Error,
    query::{Row, Select},
    value::NativeValue,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File(PathBuf),
    InMemory,
}

/// Configures a [`SqliteDriver`].
///
/// # Example
///
/// ```rust,ignore
/// let driver = SqliteDriver::builder().max_connections(1).open("garage.db");
/// let driver = SqliteDriver::builder().url("sqlite::memory:")?;
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDriverBuilder {
    max_connections: u32,
    foreign_keys: bool,
}

impl Default for SqliteDriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteDriverBuilder {
    pub fn new() -> Self {
        Self { max_connections: 5, foreign_keys: true }
    }

    /// Pool size for file stores. In-memory stores always use one connection.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Foreign-key enforcement, on by default.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn open(self, path: impl Into<PathBuf>) -> SqliteDriver {
        self.build(Target::File(path.into()))
    }

    pub fn in_memory(self) -> SqliteDriver {
        self.build(Target::InMemory)
    }

    /// Accepts `sqlite::memory:`, `sqlite://path` and `sqlite:path`.
    pub fn url(self, url: &str) -> Result<SqliteDriver, Error> {
        let location = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .ok_or_else(|| Error::backend(format!("not a sqlite url: {url}")))?;
        let location = location.split('?').next().unwrap_or_default();

        match location {
            ":memory:" => Ok(self.in_memory()),
            "" => Err(Error::backend(format!("sqlite url has no path: {url}"))),
            path => Ok(self.open(path)),
        }
    }

    fn build(self, target: Target) -> SqliteDriver {
        SqliteDriver { target, max_connections: self.max_connections, foreign_keys: self.foreign_keys, pool: None }
    }
}

/// The SQLite [`Driver`].
#[derive(Debug)]
pub struct SqliteDriver {
    target: Target,
    max_connections: u32,
    foreign_keys: bool,
    pool: Option<SqlitePool>,
}

impl SqliteDriver {
    pub fn builder() -> SqliteDriverBuilder {
        SqliteDriverBuilder::new()
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        SqliteDriverBuilder::new().open(path)
    }

    /// A private in-memory store. Its contents are lost on disconnect.
    pub fn in_memory() -> Self {
        SqliteDriverBuilder::new().in_memory()
    }

    pub fn from_url(url: &str) -> Result<Self, Error> {
        SqliteDriverBuilder::new().url(url)
    }

    fn pool(&self) -> Result<&SqlitePool, Error> {
        self.pool.as_ref().ok_or(Error::NotConnected)
    }

    async fn fetch(&self, sql: &str, args: &[NativeValue]) -> Result<Vec<Row>, Error> {
        log::debug!("{sql}");
        let rows = bind_all(sqlx::query(sql), args).fetch_all(self.pool()?).await?;
        rows.iter().map(decode_row).collect()
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: impl IntoIterator<Item = &'q NativeValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            NativeValue::Null => query.bind(None::<i64>),
            NativeValue::Integer(v) => query.bind(*v),
            NativeValue::Real(v) => query.bind(*v),
            NativeValue::Text(v) => query.bind(v.as_str()),
            NativeValue::Blob(v) => query.bind(v.as_slice()),
        };
    }
    query
}

/// Reads every column by its storage class.
fn decode_row(row: &SqliteRow) -> Result<Row, Error> {
    let columns = row.columns().iter().map(|column| column.name().to_string()).collect();
    let mut values = Vec::with_capacity(row.len());

    for index in 0..row.len() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            NativeValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => NativeValue::Integer(row.try_get(index)?),
                "REAL" => NativeValue::Real(row.try_get(index)?),
                "BLOB" => NativeValue::Blob(row.try_get(index)?),
                _ => NativeValue::Text(row.try_get(index)?),
            }
        };
        values.push(value);
    }

    Ok(Row::new(columns, values, 0))
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn connect(&mut self) -> Result<(), Error> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = match &self.target {
            Target::File(path) => {
                let options =
                    SqliteConnectOptions::new().filename(path).create_if_missing(true).foreign_keys(self.foreign_keys);
                SqlitePoolOptions::new().max_connections(self.max_connections).connect_with(options).await?
            }
            Target::InMemory => {
                let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(self.foreign_keys);
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await?
            }
        };

        log::debug!("connected to {:?}", self.target);
        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            log::debug!("disconnected from {:?}", self.target);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.as_ref().is_some_and(|pool| !pool.is_closed())
    }

    fn database_file(&self) -> Option<&Path> {
        match &self.target {
            Target::File(path) => Some(path),
            Target::InMemory => None,
        }
    }

    async fn execute(&self, sql: &str) -> Result<(), Error> {
        log::debug!("{sql}");
        sqlx::query(sql).execute(self.pool()?).await?;
        Ok(())
    }

    async fn query(&self, select: &Select<'_>) -> Result<Vec<Row>, Error> {
        let columns = if select.columns.is_empty() {
            "*".to_string()
        } else {
            select.columns.iter().map(|column| quote(column)).collect::<Vec<_>>().join(", ")
        };

        let mut sql = format!("SELECT {columns} FROM {}", quote(select.table));
        if let Some(filter) = select.filter {
            sql.push_str(&format!(" WHERE {filter}"));
        }
        if let Some(group_by) = select.group_by {
            sql.push_str(&format!(" GROUP BY {group_by}"));
        }
        if let Some(having) = select.having {
            sql.push_str(&format!(" HAVING {having}"));
        }
        if let Some(order_by) = select.order_by {
            sql.push_str(&format!(" ORDER BY {order_by}"));
        }
        if let Some(limit) = select.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        self.fetch(&sql, select.args).await
    }

    async fn raw_query(&self, sql: &str, args: &[NativeValue]) -> Result<Vec<Row>, Error> {
        self.fetch(sql, args).await
    }

    async fn insert(&self, table: &str, values: &[(&str, NativeValue)]) -> Result<i64, Error> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(table))
        } else {
            let names: Vec<_> = values.iter().map(|(name, _)| quote(name)).collect();
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("INSERT INTO {} ({}) VALUES ({placeholders})", quote(table), names.join(", "))
        };

        log::debug!("{sql}");
        let result = bind_all(sqlx::query(&sql), values.iter().map(|(_, value)| value)).execute(self.pool()?).await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(
        &self,
        table: &str,
        values: &[(&str, NativeValue)],
        filter: Option<&str>,
        args: &[NativeValue],
    ) -> Result<u64, Error> {
        if values.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<_> = values.iter().map(|(name, _)| format!("{} = ?", quote(name))).collect();
        let mut sql = format!("UPDATE {} SET {}", quote(table), assignments.join(", "));
        if let Some(filter) = filter {
            sql.push_str(&format!(" WHERE {filter}"));
        }

        log::debug!("{sql}");
        let query = bind_all(sqlx::query(&sql), values.iter().map(|(_, value)| value));
        let result = bind_all(query, args).execute(self.pool()?).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, table: &str, filter: Option<&str>, args: &[NativeValue]) -> Result<u64, Error> {
        let mut sql = format!("DELETE FROM {}", quote(table));
        if let Some(filter) = filter {
            sql.push_str(&format!(" WHERE {filter}"));
        }

        log::debug!("{sql}");
        let result = bind_all(sqlx::query(&sql), args).execute(self.pool()?).await?;
        Ok(result.rows_affected())
    }

    fn is_numeric_type(&self, ty: SemanticType) -> bool {
        ty.is_integer() || matches!(ty, SemanticType::Float | SemanticType::Double | SemanticType::Timestamp)
    }

    fn first_column_index(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urls() {
        assert_eq!(SqliteDriver::from_url("sqlite::memory:").unwrap().database_file(), None);
        assert_eq!(
            SqliteDriver::from_url("sqlite://data/garage.db?mode=rwc").unwrap().database_file(),
            Some(Path::new("data/garage.db"))
        );
        assert_eq!(SqliteDriver::from_url("sqlite:garage.db").unwrap().database_file(), Some(Path::new("garage.db")));
        assert!(SqliteDriver::from_url("postgres://localhost").is_err());
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote("order"), "\"order\"");
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
    }
}
