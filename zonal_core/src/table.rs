// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named, typed, column-oriented tables.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::value::{DataType, Value};

/// Errors returned when building or extending a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// Two columns share a name.
    #[error("duplicate column `{column}` in table `{table}`")]
    DuplicateColumn {
        /// The table being built.
        table: String,
        /// The repeated column name.
        column: String,
    },
    /// A column does not have one value per row.
    #[error("column `{column}` in table `{table}` has {found} rows, expected {expected}")]
    LengthMismatch {
        /// The table being built.
        table: String,
        /// The offending column.
        column: String,
        /// Row count of the table.
        expected: usize,
        /// Row count of the column.
        found: usize,
    },
    /// A row-major input row does not have one value per column.
    #[error("row {row} of table `{table}` has {found} values, expected {expected}")]
    RowWidth {
        /// The table being built.
        table: String,
        /// Index of the offending row.
        row: usize,
        /// Number of schema columns.
        expected: usize,
        /// Number of values in the row.
        found: usize,
    },
    /// A cell does not match the declared type of its column.
    #[error("column `{column}` in table `{table}` is {expected}, found a {found} value")]
    TypeMismatch {
        /// The table being built.
        table: String,
        /// The offending column.
        column: String,
        /// Declared column type.
        expected: DataType,
        /// Type of the offending cell.
        found: DataType,
    },
}

/// A required column is absent from a table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot find column `{name}` in table `{table}`")]
pub struct ColumnNotFound {
    /// Name of the searched table.
    pub table: String,
    /// Name of the missing column.
    pub name: String,
}

/// A named column with one value per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data_type: DataType,
    values: Vec<Value>,
}

impl Column {
    /// Create a column. Cell types are checked when the column joins a [`Table`].
    pub fn new(name: impl Into<String>, data_type: DataType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            data_type,
            values,
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the cells in row order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the cell at `row`, if present.
    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Consumes the column, returning its cells.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn check(&self, table: &str, rows: usize) -> Result<(), TableError> {
        if self.values.len() != rows {
            return Err(TableError::LengthMismatch {
                table: table.to_string(),
                column: self.name.clone(),
                expected: rows,
                found: self.values.len(),
            });
        }
        if let Some(found) = self
            .values
            .iter()
            .filter_map(Value::data_type)
            .find(|&t| t != self.data_type)
        {
            return Err(TableError::TypeMismatch {
                table: table.to_string(),
                column: self.name.clone(),
                expected: self.data_type,
                found,
            });
        }
        Ok(())
    }
}

/// An owned table: a name plus an ordered list of uniquely named columns of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Create a table from columns.
    ///
    /// The row count is taken from the first column; a table without columns has no rows.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self, TableError> {
        let name = name.into();
        let row_count = columns.first().map_or(0, |c| c.values.len());
        let mut table = Self {
            name,
            columns: Vec::with_capacity(columns.len()),
            row_count,
        };
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Create a table from a schema and row-major data.
    ///
    /// Each row must have exactly one value per schema entry.
    pub fn from_rows<I, R>(
        name: impl Into<String>,
        schema: &[(&str, DataType)],
        rows: I,
    ) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Value>,
    {
        let name = name.into();
        let mut cols: Vec<Vec<Value>> = schema.iter().map(|_| Vec::new()).collect();
        for (index, row) in rows.into_iter().enumerate() {
            let mut width = 0;
            for v in row {
                if let Some(col) = cols.get_mut(width) {
                    col.push(v);
                }
                width += 1;
            }
            if width != schema.len() {
                return Err(TableError::RowWidth {
                    table: name,
                    row: index,
                    expected: schema.len(),
                    found: width,
                });
            }
        }
        let columns = schema
            .iter()
            .zip(cols)
            .map(|(&(col, ty), values)| Column::new(col, ty, values))
            .collect();
        Self::new(name, columns)
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy of this table under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(Column::name)
    }

    /// Returns the position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns a column by name, or a [`ColumnNotFound`] naming this table.
    pub fn require_column(&self, name: &str) -> Result<&Column, ColumnNotFound> {
        self.column(name).ok_or_else(|| ColumnNotFound {
            table: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// Returns the cell at `row` of the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column)?.get(row)
    }

    /// Append a column. It must have one value per row and a unique name.
    pub fn push_column(&mut self, column: Column) -> Result<(), TableError> {
        if self.column_index(&column.name).is_some() {
            return Err(TableError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name,
            });
        }
        column.check(&self.name, self.row_count)?;
        self.columns.push(column);
        Ok(())
    }
}

/// Renders the table as a left-aligned text grid with a header row.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| c.values.iter().map(ToString::to_string).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&cells)
            .map(|(c, vals)| {
                vals.iter()
                    .map(|v| v.chars().count())
                    .chain([c.name.chars().count()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        writeln!(f, "{} ({} rows)", self.name, self.row_count)?;
        for (c, w) in self.columns.iter().zip(&widths) {
            write!(f, "{:<w$}  ", c.name, w = *w)?;
        }
        writeln!(f)?;
        for row in 0..self.row_count {
            for (vals, w) in cells.iter().zip(&widths) {
                write!(f, "{:<w$}  ", vals[row], w = *w)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
