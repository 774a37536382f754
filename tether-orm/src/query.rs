//! Query inputs and result rows shared by the core and the drivers.

use crate::{
    codec,
    error::{CodecError, Error},
    value::{NativeValue, ToValue},
};

/// A where clause with its bound arguments, plus ordering and a limit.
///
/// Arguments are positional `?` placeholders.
///
/// # Example
///
/// ```rust,ignore
/// let adults = Predicate::new("age >= ?").bind(18).order_by("name").limit(10);
/// let alice = Predicate::eq("name", "Alice");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clause: Option<String>,
    args: Vec<NativeValue>,
    order_by: Option<String>,
    limit: Option<u64>,
}

impl Predicate {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(clause: impl Into<String>) -> Self {
        Self { clause: Some(clause.into()), ..Self::default() }
    }

    /// `column = value`.
    pub fn eq(column: &str, value: impl ToValue) -> Self {
        Self::new(format!("\"{column}\" = ?")).bind(value)
    }

    pub fn bind(self, value: impl ToValue) -> Self {
        self.bind_native(codec::to_native(&value.to_value()))
    }

    pub fn bind_native(mut self, value: NativeValue) -> Self {
        self.args.push(value);
        self
    }

    /// Conjunction of both clauses; arguments keep their order.
    pub fn and(mut self, other: Predicate) -> Self {
        self.clause = match (self.clause.take(), other.clause) {
            (Some(left), Some(right)) => Some(format!("({left}) AND ({right})")),
            (left, right) => left.or(right),
        };
        self.args.extend(other.args);
        self.order_by = self.order_by.or(other.order_by);
        self.limit = self.limit.or(other.limit);
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn clause(&self) -> Option<&str> {
        self.clause.as_deref()
    }

    pub fn args(&self) -> &[NativeValue] {
        &self.args
    }

    pub fn ordering(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn max_rows(&self) -> Option<u64> {
        self.limit
    }
}

/// A structured `SELECT` handed to [`Driver::query`](crate::Driver::query).
#[derive(Debug, Clone, Default)]
pub struct Select<'a> {
    pub table: &'a str,
    /// Empty selects every column.
    pub columns: Vec<&'a str>,
    pub filter: Option<&'a str>,
    pub args: &'a [NativeValue],
    pub group_by: Option<&'a str>,
    pub having: Option<&'a str>,
    pub order_by: Option<&'a str>,
    pub limit: Option<u64>,
}

impl<'a> Select<'a> {
    pub fn new(table: &'a str) -> Self {
        Self { table, ..Self::default() }
    }

    pub fn columns(mut self, columns: Vec<&'a str>) -> Self {
        self.columns = columns;
        self
    }

    /// Takes clause, arguments, ordering and limit from a predicate.
    pub fn filtered(mut self, predicate: &'a Predicate) -> Self {
        self.filter = predicate.clause();
        self.args = predicate.args();
        self.order_by = predicate.ordering();
        self.limit = predicate.max_rows();
        self
    }

    pub fn group_by(mut self, group_by: &'a str) -> Self {
        self.group_by = Some(group_by);
        self
    }

    pub fn having(mut self, having: &'a str) -> Self {
        self.having = Some(having);
        self
    }
}

/// One result row.
///
/// Drivers number columns from their own base (see
/// [`Driver::first_column_index`](crate::Driver::first_column_index)); `value` takes indexes
/// in that numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<NativeValue>,
    base: usize,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<NativeValue>, base: usize) -> Self {
        Self { columns, values, base }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn value(&self, index: usize) -> Option<&NativeValue> {
        index.checked_sub(self.base).and_then(|position| self.values.get(position))
    }

    /// Like [`value`](Self::value), failing when the row is too short.
    pub fn require(&self, index: usize) -> Result<&NativeValue, Error> {
        self.value(index).ok_or_else(|| {
            CodecError::TypeMismatch {
                expected: format!("a value at column {index}"),
                found: format!("{} columns", self.values.len()),
            }
            .into()
        })
    }

    pub fn by_name(&self, column: &str) -> Option<&NativeValue> {
        self.columns.iter().position(|name| name == column).and_then(|position| self.values.get(position))
    }
}
