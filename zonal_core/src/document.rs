// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The table registry boundary and an in-memory implementation.
//!
//! Hosts own their tables. Code that produces tables only ever talks to a [`TableRegistry`], so a
//! host object model, a test double, or the in-memory [`Document`] can sit behind it.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::table::{Column, ColumnNotFound, Table};

/// Errors returned by a [`TableRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A table with this name is already registered.
    #[error("table `{0}` already exists")]
    DuplicateTable(String),
    /// No table with this name is registered.
    #[error("table `{0}` not found")]
    TableNotFound(String),
    /// The table exists but lacks the requested column.
    #[error(transparent)]
    ColumnNotFound(#[from] ColumnNotFound),
}

/// A collection of tables keyed by name.
pub trait TableRegistry {
    /// Returns the table registered under `name`.
    fn get_table(&self, name: &str) -> Option<&Table>;

    /// Returns the table registered under `name` for in-place modification.
    fn get_table_mut(&mut self, name: &str) -> Option<&mut Table>;

    /// Register a new table under its own name.
    ///
    /// Fails with [`RegistryError::DuplicateTable`] if the name is taken.
    fn add_table(&mut self, table: Table) -> Result<&Table, RegistryError>;

    /// Remove and return the table registered under `name`.
    fn remove_table(&mut self, name: &str) -> Option<Table>;

    /// Returns `true` if a table is registered under `name`.
    fn contains_table(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }

    /// Register `table`, first removing any table with the same name.
    ///
    /// The previous table is dropped, never merged with the new one.
    fn create_or_replace(&mut self, table: Table) -> Result<&Table, RegistryError> {
        if self.remove_table(table.name()).is_some() {
            tracing::debug!(table = table.name(), "removed existing table before replace");
        }
        self.add_table(table)
    }

    /// Returns a column of a registered table.
    fn get_column(&self, table: &str, column: &str) -> Result<&Column, RegistryError> {
        let t = self
            .get_table(table)
            .ok_or_else(|| RegistryError::TableNotFound(table.to_string()))?;
        Ok(t.require_column(column)?)
    }
}

/// An in-memory [`TableRegistry`].
#[derive(Debug, Default, Clone)]
pub struct Document {
    tables: HashMap<String, Table>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no tables are registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns the registered table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl TableRegistry for Document {
    fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    fn add_table(&mut self, table: Table) -> Result<&Table, RegistryError> {
        match self.tables.entry(table.name().to_string()) {
            Entry::Occupied(e) => Err(RegistryError::DuplicateTable(e.key().clone())),
            Entry::Vacant(e) => Ok(e.insert(table)),
        }
    }

    fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.remove(name)
    }
}
