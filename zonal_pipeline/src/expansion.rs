// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Category expansion: one `(title, value)` pair in, one wide key-indexed frame out.
//!
//! The recipe, appended to a single flow over the base table:
//!
//! 1. optionally derive the value column as a per-bin share (see [`Normalize`]),
//! 2. pivot the value by title into `<value>.<title value>` columns,
//! 3. keep those columns, minus the one collecting rows without a title
//!    (with nothing left, the result is the key columns alone),
//! 4. unpivot them into `Category`/`Value` rows,
//! 5. fill null values with `0.0`,
//! 6. split `Category` into `Zone` and `Area`,
//! 7. pivot `Value` by `(Zone, Area)` into `<Zone>.<Area>` columns.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use tracing::{debug, trace};
use zonal_core::{DataType, Table, Value};
use zonal_transforms::{
    AggregateOp, ColumnAggregation, ColumnSignature, Error, Expression, Flow, FlowBuilder, Frame,
    NamingExpression, TransformStep,
};

use crate::config::Normalize;

/// Name of the unpivoted category label column.
pub const CATEGORY_COLUMN: &str = "Category";
/// Name of the unpivoted value column.
pub const VALUE_COLUMN: &str = "Value";
/// Name of the column holding the part of the label before the first `.`.
pub const ZONE_COLUMN: &str = "Zone";
/// Name of the column holding the part of the label after the first `.`.
pub const AREA_COLUMN: &str = "Area";
/// Literal written into empty `Value` cells, parsed as the column's type.
pub const NULL_FILL: &str = "0.0";

/// One category pair to expand.
#[derive(Debug, Clone, Copy)]
pub struct CategoryExpansion<'c> {
    primary_keys: &'c [String],
    title: &'c str,
    value: &'c str,
    measure: AggregateOp,
    normalize: Option<&'c Normalize>,
}

/// A flow stopped after the split step (1–6): long rows with filled values and area labels.
#[derive(Debug, Clone)]
pub struct LongForm<'a> {
    flow: FlowBuilder<'a>,
    keys: Vec<ColumnSignature>,
    value: ColumnSignature,
    zone: ColumnSignature,
    area: ColumnSignature,
}

impl LongForm<'_> {
    /// Returns the long-form frame.
    pub fn result(&self) -> &Frame {
        self.flow.result()
    }

    /// Returns the key columns.
    pub fn keys(&self) -> &[ColumnSignature] {
        &self.keys
    }

    /// Returns the filled `Value` column.
    pub fn value(&self) -> ColumnSignature {
        self.value
    }

    /// Returns the `Zone` column.
    pub fn zone(&self) -> ColumnSignature {
        self.zone
    }

    /// Returns the `Area` column.
    pub fn area(&self) -> ColumnSignature {
        self.area
    }
}

/// The finished expansion of one category pair.
#[derive(Debug, Clone)]
pub struct Expanded<'a> {
    flow: Flow<'a>,
    keys: Vec<ColumnSignature>,
}

impl<'a> Expanded<'a> {
    /// Returns the flow that produced the result.
    pub fn flow(&self) -> &Flow<'a> {
        &self.flow
    }

    /// Returns the wide, one-row-per-key frame.
    pub fn result(&self) -> &Frame {
        self.flow.result()
    }

    /// Returns the key columns of [`Self::result`], in configuration order.
    pub fn keys(&self) -> &[ColumnSignature] {
        &self.keys
    }

    /// Returns the names of the per-area columns.
    pub fn area_columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.result()
            .columns()
            .iter()
            .filter(|c| !self.keys.contains(&c.signature))
            .map(|c| c.name.as_str())
    }
}

impl<'c> CategoryExpansion<'c> {
    /// Describe the expansion of `(title, value)` keyed by `primary_keys`.
    pub fn new(
        primary_keys: &'c [String],
        title: &'c str,
        value: &'c str,
        measure: AggregateOp,
    ) -> Self {
        Self {
            primary_keys,
            title,
            value,
            measure,
            normalize: None,
        }
    }

    /// Derive the value column instead of reading it from the base table.
    #[must_use]
    pub fn with_normalize(mut self, normalize: Option<&'c Normalize>) -> Self {
        self.normalize = normalize;
        self
    }

    /// Run the whole recipe over `base`.
    ///
    /// If no row has a title, the result is the key columns alone, one row per key group.
    pub fn run<'a>(&self, base: &'a Table) -> Result<Expanded<'a>, Error> {
        let (mut flow, keys, categories) = self.pivot_titles(base)?;
        if categories.is_empty() {
            debug!(title = self.title, "no titled categories; projecting keys");
            flow.add(TransformStep::Pivot {
                identity: keys.clone(),
                categories: vec![],
                values: vec![],
                naming: NamingExpression::category(),
            })?;
            return Ok(Expanded {
                flow: flow.build(),
                keys,
            });
        }
        let long = self.unpivot_categories(flow, keys, categories)?;
        self.pivot_areas(long)
    }

    /// Run steps 1–6.
    pub fn long_form<'a>(&self, base: &'a Table) -> Result<LongForm<'a>, Error> {
        let (flow, keys, categories) = self.pivot_titles(base)?;
        self.unpivot_categories(flow, keys, categories)
    }

    /// Steps 1–3: returns the flow, the key columns and the titled category columns.
    fn pivot_titles<'a>(
        &self,
        base: &'a Table,
    ) -> Result<(FlowBuilder<'a>, Vec<ColumnSignature>, Vec<ColumnSignature>), Error> {
        let mut flow = FlowBuilder::new(base);
        let keys = self
            .primary_keys
            .iter()
            .map(|k| flow.resolve(k))
            .collect::<Result<Vec<_>, _>>()?;
        let title = flow.resolve(self.title)?;

        let measured = match self.normalize {
            Some(normalize) => {
                let bin = flow.resolve(&normalize.bin_column)?;
                // The bin may itself be a key; the coarse partition never includes it.
                let partition: Vec<ColumnSignature> = keys
                    .iter()
                    .copied()
                    .filter(|k| *k != bin)
                    .chain([title])
                    .collect();
                let fine = partition.iter().copied().chain([bin]);
                let share =
                    Expression::count_over(fine) / Expression::count_over(partition.iter().copied());
                flow.add(TransformStep::AddCalculatedColumn {
                    name: self.value.to_string(),
                    expression: share,
                })?;
                flow.resolve(self.value)?
            }
            None => flow.resolve(self.value)?,
        };

        let has_untitled = flow
            .result()
            .column(title)
            .ok_or(Error::UnresolvedSignature(title))?
            .values
            .iter()
            .any(Value::is_null);
        let pivoted = flow.add(TransformStep::Pivot {
            identity: keys.clone(),
            categories: vec![title],
            values: vec![ColumnAggregation::new(measured, self.measure)],
            naming: NamingExpression::value_and_category(),
        })?;
        // Null sorts first, so rows without a title land in the first category column.
        let mut candidates = pivoted
            .columns()
            .iter()
            .filter(|c| !keys.contains(&c.signature))
            .peekable();
        let untitled = if has_untitled {
            candidates.peek().map(|c| c.signature)
        } else {
            None
        };
        let prefix = alloc::format!("{}.", self.value);
        let categories: Vec<ColumnSignature> = candidates
            .filter(|c| {
                let keep = c.name.starts_with(&prefix) && Some(c.signature) != untitled;
                trace!(column = %c.name, keep, "category column");
                keep
            })
            .map(|c| c.signature)
            .collect();
        debug!(
            title = self.title,
            categories = categories.len(),
            "pivoted categories"
        );
        Ok((flow, keys, categories))
    }

    /// Steps 4–6.
    fn unpivot_categories<'a>(
        &self,
        mut flow: FlowBuilder<'a>,
        keys: Vec<ColumnSignature>,
        categories: Vec<ColumnSignature>,
    ) -> Result<LongForm<'a>, Error> {
        flow.add(TransformStep::Unpivot {
            identity: keys.clone(),
            values: categories,
            category_name: CATEGORY_COLUMN.to_string(),
            category_type: DataType::String,
            value_name: VALUE_COLUMN.to_string(),
            value_type: DataType::Real,
        })?;
        let category = flow.resolve(CATEGORY_COLUMN)?;
        let value = flow.resolve(VALUE_COLUMN)?;

        let value_type = flow
            .result()
            .column(value)
            .map(|c| c.data_type)
            .ok_or(Error::UnresolvedSignature(value))?;
        flow.add(TransformStep::ReplaceValue {
            column: value,
            from: Value::Null,
            to: value_type.parse(NULL_FILL)?,
        })?;

        flow.add(TransformStep::AddCalculatedColumn {
            name: ZONE_COLUMN.to_string(),
            expression: Expression::column(category).split(".", 1),
        })?;
        let zone = flow.resolve(ZONE_COLUMN)?;
        flow.add(TransformStep::AddCalculatedColumn {
            name: AREA_COLUMN.to_string(),
            expression: Expression::column(category).split(".", 2),
        })?;
        let area = flow.resolve(AREA_COLUMN)?;

        Ok(LongForm {
            flow,
            keys,
            value,
            zone,
            area,
        })
    }

    /// Run step 7 on the output of [`Self::long_form`].
    pub fn pivot_areas<'a>(&self, long: LongForm<'a>) -> Result<Expanded<'a>, Error> {
        let LongForm {
            mut flow,
            keys,
            value,
            zone,
            area,
        } = long;
        flow.add(TransformStep::Pivot {
            identity: keys.clone(),
            categories: vec![zone, area],
            values: vec![ColumnAggregation::new(value, self.measure)],
            naming: NamingExpression::category(),
        })?;
        Ok(Expanded {
            flow: flow.build(),
            keys,
        })
    }
}
