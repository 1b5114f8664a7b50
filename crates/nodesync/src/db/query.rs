//! Typed query specifications.
//!
//! A [`QuerySpec`] is a plain value (predicate list + ordering) that
//! a [`Repository`](super::Repository) renders into a parameterized
//! `SELECT`. Column names are `&'static str` constants owned by the entity
//! modules; values always travel as bound parameters.

use rusqlite::types::Value;

/// Sort direction for an `ORDER BY` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A single condition. All predicates of a spec are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column IS NOT NULL`
    NotNull(&'static str),
    /// `column = value`
    Eq(&'static str, Value),
    /// `column IN (values...)`; an empty set matches nothing.
    In(&'static str, Vec<Value>),
}

/// Predicates and ordering for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    predicates: Vec<Predicate>,
    order: Vec<(&'static str, Direction)>,
}

impl QuerySpec {
    /// An unfiltered, unordered query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn not_null(self, column: &'static str) -> Self {
        self.filter(Predicate::NotNull(column))
    }

    pub fn eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filter(Predicate::Eq(column, value.into()))
    }

    pub fn any_of<I, V>(self, column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter(Predicate::In(
            column,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    /// Appends an ordering term. Terms apply in the order they were added.
    pub fn order_by(mut self, column: &'static str, direction: Direction) -> Self {
        self.order.push((column, direction));
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Renders the `WHERE` clause and its parameters.
    ///
    /// Returns an empty string when there are no predicates.
    pub(crate) fn where_clause(&self, params: &mut Vec<Value>) -> String {
        let mut conditions = Vec::with_capacity(self.predicates.len());

        for predicate in &self.predicates {
            match predicate {
                Predicate::NotNull(column) => {
                    debug_assert!(is_identifier(column));
                    conditions.push(format!("{} IS NOT NULL", column));
                }
                Predicate::Eq(column, value) => {
                    debug_assert!(is_identifier(column));
                    params.push(value.clone());
                    conditions.push(format!("{} = ?{}", column, params.len()));
                }
                Predicate::In(column, values) => {
                    debug_assert!(is_identifier(column));
                    if values.is_empty() {
                        conditions.push("0".to_string());
                        continue;
                    }
                    let mut placeholders = Vec::with_capacity(values.len());
                    for value in values {
                        params.push(value.clone());
                        placeholders.push(format!("?{}", params.len()));
                    }
                    conditions.push(format!("{} IN ({})", column, placeholders.join(", ")));
                }
            }
        }

        if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        }
    }

    /// Renders a full `SELECT *` statement against `table`.
    pub(crate) fn to_select(&self, table: &str) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("SELECT * FROM {}", table);
        sql.push_str(&self.where_clause(&mut params));

        if !self.order.is_empty() {
            let terms: Vec<String> = self
                .order
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        (sql, params)
    }
}

/// Only ASCII alphanumerics and underscores are accepted as column names.
fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
