// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types shared by flows, merges and the pipeline built on top of them.

extern crate alloc;

use alloc::string::String;

use zonal_core::{ColumnNotFound, DataType, RegistryError, TableError, ValueParseError};

use crate::expr::ExpressionError;
use crate::signature::ColumnSignature;

/// Errors returned when building or executing flows and merges.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A column named by the caller is absent.
    #[error(transparent)]
    ColumnNotFound(#[from] ColumnNotFound),
    /// The requested operation is inconsistent with itself or its inputs.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// A literal could not be coerced to a column's type.
    #[error(transparent)]
    ValueParse(#[from] ValueParseError),
    /// The two sides of a key join do not have the same number of key columns.
    #[error("join key arity mismatch: {output_keys} output keys, {source_keys} source keys")]
    JoinArity {
        /// Number of key columns on the output side.
        output_keys: usize,
        /// Number of key columns on the source side.
        source_keys: usize,
    },
    /// A step references a column signature that is not live at its position in the flow.
    #[error("column signature {0} is not resolvable at this point of the flow")]
    UnresolvedSignature(ColumnSignature),
    /// A step would produce two columns with the same name.
    #[error("step would produce duplicate column `{0}`")]
    DuplicateColumn(String),
    /// A replacement value does not match the type of the column it is written to.
    #[error("cannot write a {found} value into {expected} column `{column}`")]
    TypeMismatch {
        /// The target column.
        column: String,
        /// Type of the target column.
        expected: DataType,
        /// Type of the offending value.
        found: DataType,
    },
    /// A calculated-column expression is malformed.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    /// A result could not be realized as a table.
    #[error(transparent)]
    Table(#[from] TableError),
    /// The table registry rejected an operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Structural problems in the caller's configuration.
///
/// None of these are transient; retrying the same request fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Parallel title/value lists differ in length.
    #[error("{titles} title columns but {values} value columns")]
    ListLengthMismatch {
        /// Number of title columns.
        titles: usize,
        /// Number of value columns.
        values: usize,
    },
    /// A required list is empty.
    #[error("no {0} given")]
    EmptyList(&'static str),
    /// A comma-separated list contains an empty entry.
    #[error("empty entry in {0}")]
    EmptyName(&'static str),
    /// A column is listed twice where names must be distinct.
    #[error("column `{0}` is listed more than once")]
    DuplicateName(String),
    /// An incoming merge column already exists in the output table.
    #[error("column `{0}` already exists in the output table")]
    ColumnCollision(String),
    /// Paired join key columns have different types.
    #[error("join key `{output_key}` is {output_type} but `{source_key}` is {source_type}")]
    KeyTypeMismatch {
        /// Output-side key column.
        output_key: String,
        /// Type of the output-side key.
        output_type: DataType,
        /// Source-side key column.
        source_key: String,
        /// Type of the source-side key.
        source_type: DataType,
    },
    /// More than one source row carries the same join key.
    #[error("join key is not unique in the source: {0}")]
    DuplicateKey(String),
    /// An aggregate method name is not recognised.
    #[error("unknown aggregate method `{0}`")]
    UnknownAggregate(String),
}
