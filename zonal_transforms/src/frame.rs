// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Evaluated, signature-addressed tables produced by flow steps.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use zonal_core::{Column, ColumnNotFound, DataType, Table, TableError, Value};

use crate::error::Error;
use crate::signature::{ColumnSignature, SignatureMinter};

/// One column of a [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameColumn {
    /// Stable identity of the column within its flow.
    pub signature: ColumnSignature,
    /// Current name. Names may change between steps; signatures do not.
    pub name: String,
    /// Declared type.
    pub data_type: DataType,
    /// One value per row.
    pub values: Vec<Value>,
}

/// A virtual table: the inspectable result of evaluating a flow up to some step.
///
/// Frames are never registered anywhere; turn one into a [`Table`] with [`Frame::to_table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    label: String,
    row_count: usize,
    columns: Vec<FrameColumn>,
}

impl Frame {
    /// Snapshot a table, minting a signature for each of its columns.
    pub(crate) fn from_table(table: &Table, minter: &mut SignatureMinter) -> Self {
        let columns = table
            .columns()
            .iter()
            .map(|c| FrameColumn {
                signature: minter.mint(),
                name: c.name().to_string(),
                data_type: c.data_type(),
                values: c.values().to_vec(),
            })
            .collect();
        Self {
            label: table.name().to_string(),
            row_count: table.row_count(),
            columns,
        }
    }

    /// Assemble a frame from already-built columns.
    ///
    /// Column names must be unique and every column must hold `row_count` values.
    pub(crate) fn from_columns(
        label: String,
        row_count: usize,
        columns: Vec<FrameColumn>,
    ) -> Result<Self, Error> {
        for (i, c) in columns.iter().enumerate() {
            debug_assert_eq!(c.values.len(), row_count, "ragged column `{}`", c.name);
            if columns[..i].iter().any(|p| p.name == c.name) {
                return Err(Error::DuplicateColumn(c.name.clone()));
            }
        }
        Ok(Self {
            label,
            row_count,
            columns,
        })
    }

    /// Returns a human-readable description of where this frame came from.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[FrameColumn] {
        &self.columns
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns the position of a column, if it is live in this frame.
    pub fn column_index(&self, sig: ColumnSignature) -> Option<usize> {
        self.columns.iter().position(|c| c.signature == sig)
    }

    /// Returns a column by signature.
    pub fn column(&self, sig: ColumnSignature) -> Option<&FrameColumn> {
        self.columns.iter().find(|c| c.signature == sig)
    }

    /// Returns a column by its current name.
    pub fn column_by_name(&self, name: &str) -> Option<&FrameColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up the signature of a column by its current name.
    ///
    /// This is how callers obtain handles to columns a step invented (pivot results, unpivot
    /// outputs, calculated columns) before appending the next step.
    pub fn signature(&self, name: &str) -> Result<ColumnSignature, ColumnNotFound> {
        self.column_by_name(name)
            .map(|c| c.signature)
            .ok_or_else(|| ColumnNotFound {
                table: self.label.clone(),
                name: name.to_string(),
            })
    }

    /// Returns the cell at `row` of a column.
    pub fn value(&self, row: usize, sig: ColumnSignature) -> Option<&Value> {
        self.column(sig)?.values.get(row)
    }

    pub(crate) fn require(&self, sig: ColumnSignature) -> Result<&FrameColumn, Error> {
        self.column(sig).ok_or(Error::UnresolvedSignature(sig))
    }

    pub(crate) fn require_index(&self, sig: ColumnSignature) -> Result<usize, Error> {
        self.column_index(sig).ok_or(Error::UnresolvedSignature(sig))
    }

    /// Copy this frame into a named [`Table`].
    pub fn to_table(&self, name: &str) -> Result<Table, TableError> {
        self.clone().into_table(name)
    }

    /// Convert this frame into a named [`Table`], dropping signatures.
    pub fn into_table(self, name: &str) -> Result<Table, TableError> {
        let row_count = self.row_count;
        let columns = self
            .columns
            .into_iter()
            .map(|c| Column::new(c.name, c.data_type, c.values))
            .collect();
        let table = Table::new(name, columns)?;
        debug_assert!(
            table.columns().is_empty() || table.row_count() == row_count,
            "realized table should keep the frame's row count"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::ToString;
    use alloc::vec;

    use super::*;
    use crate::signature::FlowId;

    #[test]
    fn from_table_mints_one_signature_per_column() {
        let table = Table::from_rows(
            "Base",
            &[("Lot", DataType::String), ("Pct", DataType::Real)],
            [vec![Value::from("L1"), Value::real(0.5)]],
        )
        .unwrap();
        let mut minter = SignatureMinter::new(FlowId::next());
        let frame = Frame::from_table(&table, &mut minter);

        let lot = frame.signature("Lot").unwrap();
        let pct = frame.signature("Pct").unwrap();
        assert_ne!(lot, pct);
        assert_eq!(frame.value(0, pct), Some(&Value::real(0.5)));
        assert_eq!(
            frame.signature("Bin"),
            Err(ColumnNotFound {
                table: "Base".to_string(),
                name: "Bin".to_string(),
            })
        );

        let back = frame.into_table("Copy").unwrap();
        assert_eq!(back.columns(), table.columns());
    }
}
