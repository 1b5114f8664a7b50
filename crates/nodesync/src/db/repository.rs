//! Generic read access over one table.
//!
//! Each persisted type implements [`Entity`]; stores compose a
//! [`Repository`] for their reads and keep their own write statements.

use std::marker::PhantomData;

use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Row};

use super::query::QuerySpec;
use super::{Database, StoreError};

/// A row type stored in its own table.
pub trait Entity: Sized {
    /// Table name.
    const TABLE: &'static str;
    /// Primary key column.
    const KEY: &'static str;
    /// Human-readable name used in error messages.
    const NAME: &'static str;

    /// Decodes one row produced by `SELECT *`.
    fn from_row(row: &Row<'_>) -> Result<Self, StoreError>;
}

/// Read-side repository parameterized by entity type.
pub struct Repository<E> {
    db: Database,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// Returns the shared database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs `spec` and decodes every matching row.
    pub fn find(&self, spec: &QuerySpec) -> Result<Vec<E>, StoreError> {
        let (sql, params) = spec.to_select(E::TABLE);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let mut entities = Vec::new();
            while let Some(row) = rows.next()? {
                entities.push(E::from_row(row)?);
            }
            Ok(entities)
        })
    }

    /// Looks up a single entity by primary key.
    pub fn get<K: ToSql>(&self, key: K) -> Result<Option<E>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE {} = ?1", E::TABLE, E::KEY);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![key])?;
            match rows.next()? {
                Some(row) => Ok(Some(E::from_row(row)?)),
                None => Ok(None),
            }
        })
    }
}
