// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Evaluation of single transform steps, one frame in, one frame out.

extern crate alloc;

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use tracing::debug;
use zonal_core::{DataType, Value};

use crate::error::Error;
use crate::expr::Expression;
use crate::frame::{Frame, FrameColumn};
use crate::signature::{ColumnSignature, SignatureMinter};
use crate::transform::{AggregateOp, ColumnAggregation, NamingExpression, TransformStep};

type RowKey<'a> = SmallVec<[&'a Value; 4]>;

/// Apply `step` to `input`, minting signatures for any column the step creates.
pub(crate) fn apply(
    step: &TransformStep,
    input: &Frame,
    minter: &mut SignatureMinter,
) -> Result<Frame, Error> {
    for sig in step.referenced_signatures() {
        input.require(sig)?;
    }
    let out = match step {
        TransformStep::AddCalculatedColumn { name, expression } => {
            add_calculated_column(input, name, expression, minter)
        }
        TransformStep::Pivot {
            identity,
            categories,
            values,
            naming,
        } => pivot(input, identity, categories, values, naming, minter),
        TransformStep::Unpivot {
            identity,
            values,
            category_name,
            category_type,
            value_name,
            value_type,
        } => unpivot(
            input,
            identity,
            values,
            (category_name.as_str(), *category_type),
            (value_name.as_str(), *value_type),
            minter,
        ),
        TransformStep::ReplaceValue { column, from, to } => replace_value(input, *column, from, to),
    }?;
    debug!(
        step = step.kind(),
        rows = out.row_count(),
        columns = out.columns().len(),
        "evaluated transform step"
    );
    Ok(out)
}

fn columns<'f>(input: &'f Frame, sigs: &[ColumnSignature]) -> Result<Vec<&'f FrameColumn>, Error> {
    sigs.iter().map(|s| input.require(*s)).collect()
}

fn row_key<'f>(cols: &[&'f FrameColumn], row: usize) -> RowKey<'f> {
    cols.iter().map(|c| &c.values[row]).collect()
}

fn add_calculated_column(
    input: &Frame,
    name: &str,
    expression: &Expression,
    minter: &mut SignatureMinter,
) -> Result<Frame, Error> {
    let data_type = expression.data_type(input)?;
    let values = expression.evaluate(input)?;
    let mut columns = input.columns().to_vec();
    columns.push(FrameColumn {
        signature: minter.mint(),
        name: name.to_string(),
        data_type,
        values,
    });
    Frame::from_columns(input.label().to_string(), input.row_count(), columns)
}

fn pivot(
    input: &Frame,
    identity: &[ColumnSignature],
    categories: &[ColumnSignature],
    values: &[ColumnAggregation],
    naming: &NamingExpression,
    minter: &mut SignatureMinter,
) -> Result<Frame, Error> {
    let id_cols = columns(input, identity)?;
    let cat_cols = columns(input, categories)?;
    let mut val_cols = Vec::with_capacity(values.len());
    for agg in values {
        let col = input.require(agg.column)?;
        if agg.op.requires_numeric() && !col.data_type.is_numeric() {
            return Err(Error::TypeMismatch {
                column: col.name.clone(),
                expected: DataType::Real,
                found: col.data_type,
            });
        }
        val_cols.push((col, agg.op));
    }

    // Output rows follow the first occurrence of each identity combination.
    let n = input.row_count();
    let mut groups: HashMap<RowKey<'_>, usize> = HashMap::new();
    let mut first_rows: Vec<usize> = Vec::new();
    let mut row_group = Vec::with_capacity(n);
    for row in 0..n {
        let next = first_rows.len();
        let group = *groups.entry(row_key(&id_cols, row)).or_insert_with(|| {
            first_rows.push(row);
            next
        });
        row_group.push(group);
    }

    let combos: Vec<RowKey<'_>> = (0..n)
        .map(|row| row_key(&cat_cols, row))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut cells: Vec<Vec<usize>> = vec![Vec::new(); first_rows.len() * combos.len()];
    for (row, &group) in row_group.iter().enumerate() {
        if let Ok(combo) = combos.binary_search(&row_key(&cat_cols, row)) {
            cells[group * combos.len() + combo].push(row);
        }
    }

    let mut out: Vec<FrameColumn> = id_cols
        .iter()
        .map(|c| FrameColumn {
            signature: c.signature,
            name: c.name.clone(),
            data_type: c.data_type,
            values: first_rows.iter().map(|&r| c.values[r].clone()).collect(),
        })
        .collect();
    let names = pivot_column_names(&val_cols, &combos, naming);
    for (j, name) in names.into_iter().enumerate() {
        let (col, op) = val_cols[j / combos.len()];
        let k = j % combos.len();
        let values = (0..first_rows.len())
            .map(|g| {
                let rows = &cells[g * combos.len() + k];
                // A missing (identity, category) pair is null, whatever the method.
                if rows.is_empty() {
                    Value::Null
                } else {
                    op.apply(col.data_type, rows.iter().map(|&r| &col.values[r]))
                }
            })
            .collect();
        out.push(FrameColumn {
            signature: minter.mint(),
            name,
            data_type: op.result_type(col.data_type),
            values,
        });
    }
    Frame::from_columns(input.label().to_string(), first_rows.len(), out)
}

/// Names of the pivot value columns, value-major then combination order.
///
/// Combinations without nulls keep their rendered names. A combination holding a null whose name
/// is already taken (a null renders like the real category `0`) gets the first free `~k` suffix.
fn pivot_column_names(
    val_cols: &[(&FrameColumn, AggregateOp)],
    combos: &[RowKey<'_>],
    naming: &NamingExpression,
) -> Vec<String> {
    let mut names = Vec::with_capacity(val_cols.len() * combos.len());
    for (col, op) in val_cols {
        for combo in combos {
            let labels: Vec<Value> = combo.iter().map(|v| (*v).clone()).collect();
            names.push(naming.render(&col.name, *op, &labels));
        }
    }
    let has_null = |i: usize| combos[i % combos.len()].iter().any(|v| v.is_null());
    let mut taken: HashSet<String> = names
        .iter()
        .enumerate()
        .filter(|(i, _)| !has_null(*i))
        .map(|(_, n)| n.clone())
        .collect();
    for (i, name) in names.iter_mut().enumerate() {
        if !has_null(i) {
            continue;
        }
        if taken.contains(name.as_str()) {
            let mut k = 1;
            while taken.contains(format!("{name}~{k}").as_str()) {
                k += 1;
            }
            *name = format!("{name}~{k}");
        }
        taken.insert(name.clone());
    }
    names
}

fn unpivot(
    input: &Frame,
    identity: &[ColumnSignature],
    values: &[ColumnSignature],
    (category_name, category_type): (&str, DataType),
    (value_name, value_type): (&str, DataType),
    minter: &mut SignatureMinter,
) -> Result<Frame, Error> {
    let id_cols = columns(input, identity)?;
    let val_cols = columns(input, values)?;
    let labels = val_cols
        .iter()
        .map(|c| category_type.parse(&c.name))
        .collect::<Result<Vec<_>, _>>()?;

    let n = input.row_count() * val_cols.len();
    let mut out: Vec<FrameColumn> = id_cols
        .iter()
        .map(|c| FrameColumn {
            signature: c.signature,
            name: c.name.clone(),
            data_type: c.data_type,
            values: c
                .values
                .iter()
                .flat_map(|v| core::iter::repeat_n(v, val_cols.len()))
                .cloned()
                .collect(),
        })
        .collect();

    let mut category = Vec::with_capacity(n);
    let mut value = Vec::with_capacity(n);
    for row in 0..input.row_count() {
        for (col, label) in val_cols.iter().zip(&labels) {
            category.push(label.clone());
            value.push(col.values[row].cast(value_type)?);
        }
    }
    out.push(FrameColumn {
        signature: minter.mint(),
        name: category_name.to_string(),
        data_type: category_type,
        values: category,
    });
    out.push(FrameColumn {
        signature: minter.mint(),
        name: value_name.to_string(),
        data_type: value_type,
        values: value,
    });
    Frame::from_columns(input.label().to_string(), n, out)
}

fn replace_value(
    input: &Frame,
    column: ColumnSignature,
    from: &Value,
    to: &Value,
) -> Result<Frame, Error> {
    let index = input.require_index(column)?;
    let mut columns = input.columns().to_vec();
    let target = &mut columns[index];
    if let Some(found) = to.data_type().filter(|t| *t != target.data_type) {
        return Err(Error::TypeMismatch {
            column: target.name.clone(),
            expected: target.data_type,
            found,
        });
    }
    let from = from.cast(target.data_type)?;
    let mut replaced = 0_usize;
    for v in target.values.iter_mut().filter(|v| **v == from) {
        *v = to.clone();
        replaced += 1;
    }
    debug!(column = %target.name, replaced, "replaced values");
    Frame::from_columns(input.label().to_string(), input.row_count(), columns)
}
