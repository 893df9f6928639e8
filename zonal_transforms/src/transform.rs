// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform step IR types.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write as _;
use core::str::FromStr;

use zonal_core::{DataType, Value};

use crate::error::ConfigurationError;
use crate::expr::Expression;
use crate::signature::ColumnSignature;

/// Label used by `%C` for a null category value.
///
/// Rows without a category value end up in a pivot column whose name ends in `.0`. When a real
/// category also renders as `0`, the real category keeps the name and the null column gets a
/// `~1` suffix.
pub const EMPTY_CATEGORY_LABEL: &str = "0";

/// Aggregation applied when several rows collapse into one pivot cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AggregateOp {
    /// Mean of the non-null values.
    Avg,
    /// Sum of the non-null values.
    Sum,
    /// Smallest non-null value.
    Min,
    /// Largest non-null value.
    Max,
    /// Number of non-null values.
    Count,
}

impl AggregateOp {
    /// Returns the host-facing method name (what `%M` renders as).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Avg => "Avg",
            Self::Sum => "Sum",
            Self::Min => "Min",
            Self::Max => "Max",
            Self::Count => "Count",
        }
    }

    /// Returns `true` if the method only makes sense for numeric input.
    pub const fn requires_numeric(self) -> bool {
        matches!(self, Self::Avg | Self::Sum)
    }

    /// Returns the type of the aggregated value for a given input type.
    pub const fn result_type(self, input: DataType) -> DataType {
        match self {
            Self::Count => DataType::Integer,
            Self::Avg => DataType::Real,
            Self::Sum => match input {
                DataType::Integer => DataType::Integer,
                _ => DataType::Real,
            },
            Self::Min | Self::Max => input,
        }
    }

    /// Aggregate a group of cells. Nulls are skipped; an all-null group yields null (or `0` for
    /// `Count`).
    pub fn apply<'a>(self, input: DataType, values: impl IntoIterator<Item = &'a Value>) -> Value {
        let values = values.into_iter().filter(|v| !v.is_null());
        match self {
            Self::Count => Value::Integer(i64::try_from(values.count()).unwrap_or(i64::MAX)),
            Self::Min => values.min().cloned().unwrap_or_default(),
            Self::Max => values.max().cloned().unwrap_or_default(),
            Self::Sum if input == DataType::Integer => {
                let mut any = false;
                let mut sum = 0_i64;
                for v in values {
                    if let Value::Integer(i) = v {
                        sum = sum.saturating_add(*i);
                        any = true;
                    }
                }
                if any { Value::Integer(sum) } else { Value::Null }
            }
            Self::Sum | Self::Avg => {
                let mut n = 0_usize;
                let mut sum = 0.0_f64;
                for v in values.filter_map(Value::as_f64) {
                    sum += v;
                    n += 1;
                }
                match (self, n) {
                    (_, 0) => Value::Null,
                    (Self::Avg, n) => Value::real(sum / n as f64),
                    _ => Value::real(sum),
                }
            }
        }
    }
}

impl FromStr for AggregateOp {
    type Err = ConfigurationError;

    /// Parse a method name, ignoring case. `Average` and `Mean` are accepted for [`Self::Avg`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let op = [
            ("avg", Self::Avg),
            ("average", Self::Avg),
            ("mean", Self::Avg),
            ("sum", Self::Sum),
            ("min", Self::Min),
            ("max", Self::Max),
            ("count", Self::Count),
        ]
        .into_iter()
        .find(|(name, _)| t.eq_ignore_ascii_case(name))
        .map(|(_, op)| op);
        op.ok_or_else(|| ConfigurationError::UnknownAggregate(s.to_string()))
    }
}

/// A value column and how to aggregate it in a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAggregation {
    /// The aggregated column.
    pub column: ColumnSignature,
    /// The aggregation method.
    pub op: AggregateOp,
}

impl ColumnAggregation {
    /// Create an aggregation.
    pub const fn new(column: ColumnSignature, op: AggregateOp) -> Self {
        Self { column, op }
    }
}

/// Template for naming the columns a pivot creates.
///
/// Tokens:
/// - `%V`: name of the aggregated value column,
/// - `%C`: the category values of the cell, joined with `.` (nulls render as
///   [`EMPTY_CATEGORY_LABEL`]),
/// - `%M`: the aggregate method name.
///
/// Any other text, including a lone `%`, is copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingExpression(String);

impl NamingExpression {
    /// Create a naming expression from a template.
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// `%V.%C`: value column name, then the category label.
    pub fn value_and_category() -> Self {
        Self::new("%V.%C")
    }

    /// `%C`: the category label alone.
    pub fn category() -> Self {
        Self::new("%C")
    }

    /// Returns the template text.
    pub fn template(&self) -> &str {
        &self.0
    }

    /// Render the name of one pivot column.
    pub fn render(&self, value: &str, op: AggregateOp, categories: &[Value]) -> String {
        let mut out = String::with_capacity(self.0.len() + value.len());
        let mut rest = self.0.as_str();
        while let Some(i) = rest.find('%') {
            out.push_str(&rest[..i]);
            let tail = &rest[i..];
            if let Some(t) = tail.strip_prefix("%V") {
                out.push_str(value);
                rest = t;
            } else if let Some(t) = tail.strip_prefix("%C") {
                for (n, c) in categories.iter().enumerate() {
                    if n > 0 {
                        out.push('.');
                    }
                    if c.is_null() {
                        out.push_str(EMPTY_CATEGORY_LABEL);
                    } else {
                        let _ = write!(out, "{c}");
                    }
                }
                rest = t;
            } else if let Some(t) = tail.strip_prefix("%M") {
                out.push_str(op.name());
                rest = t;
            } else {
                out.push('%');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

/// One reshape operation in a flow.
///
/// Steps reference columns by [`ColumnSignature`]. Every referenced signature must be live in the
/// frame the step is applied to.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformStep {
    /// Append a column computed per row from an expression.
    AddCalculatedColumn {
        /// Name of the new column.
        name: String,
        /// Expression evaluated for every row.
        expression: Expression,
    },
    /// Turn distinct category values into columns, aggregating values per identity group.
    ///
    /// Output columns are `identity` (in order, keeping their signatures) followed by one column
    /// per distinct category combination (in ascending value order) and value aggregation.
    /// There is one output row per distinct identity combination, in first-seen order.
    /// Without value aggregations this is a distinct projection of `identity`.
    Pivot {
        /// Columns that identify an output row.
        identity: Vec<ColumnSignature>,
        /// Columns whose values become new columns.
        categories: Vec<ColumnSignature>,
        /// Aggregated value columns.
        values: Vec<ColumnAggregation>,
        /// How new columns are named.
        naming: NamingExpression,
    },
    /// Turn a set of columns into `(category, value)` rows.
    ///
    /// Output columns are `identity` (keeping their signatures), then the category column, then
    /// the value column. Each input row yields one output row per value column, nulls included,
    /// so an empty `values` list yields no rows.
    Unpivot {
        /// Columns carried onto every output row.
        identity: Vec<ColumnSignature>,
        /// Columns folded into rows.
        values: Vec<ColumnSignature>,
        /// Name of the column holding the originating column name.
        category_name: String,
        /// Type of the category column.
        category_type: DataType,
        /// Name of the column holding the cell.
        value_name: String,
        /// Type of the value column.
        value_type: DataType,
    },
    /// Replace every occurrence of a value (or of null) in one column.
    ReplaceValue {
        /// The column to rewrite in place. It keeps its signature.
        column: ColumnSignature,
        /// Value to look for; [`Value::Null`] matches empty cells.
        from: Value,
        /// Replacement; must fit the column's type.
        to: Value,
    },
}

impl TransformStep {
    /// Returns a short name for the step kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddCalculatedColumn { .. } => "add_calculated_column",
            Self::Pivot { .. } => "pivot",
            Self::Unpivot { .. } => "unpivot",
            Self::ReplaceValue { .. } => "replace_value",
        }
    }

    /// Returns every signature this step reads.
    pub fn referenced_signatures(&self) -> Vec<ColumnSignature> {
        let mut out = Vec::new();
        match self {
            Self::AddCalculatedColumn { expression, .. } => expression.collect_signatures(&mut out),
            Self::Pivot {
                identity,
                categories,
                values,
                ..
            } => {
                out.extend(identity.iter().copied());
                out.extend(categories.iter().copied());
                out.extend(values.iter().map(|v| v.column));
            }
            Self::Unpivot {
                identity, values, ..
            } => {
                out.extend(identity.iter().copied());
                out.extend(values.iter().copied());
            }
            Self::ReplaceValue { column, .. } => out.push(*column),
        }
        out
    }
}
