// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widening a registered table with the columns of a flow result (a left outer key join).

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use smallvec::SmallVec;
use tracing::debug;
use zonal_core::{Column, Table, Value};

use crate::error::{ConfigurationError, Error};
use crate::frame::{Frame, FrameColumn};
use crate::signature::ColumnSignature;

/// How to join a [`Frame`] onto a table in [`add_columns`].
///
/// `output_keys[i]` is matched against `source_keys[i]`; both lists have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddColumnsSettings {
    output_keys: Vec<String>,
    source_keys: Vec<ColumnSignature>,
    ignored: Vec<ColumnSignature>,
}

impl AddColumnsSettings {
    /// Pair output key column names with source key signatures.
    ///
    /// Fails with [`Error::JoinArity`] if the lists differ in length.
    pub fn new<S: Into<String>>(
        output_keys: impl IntoIterator<Item = S>,
        source_keys: impl IntoIterator<Item = ColumnSignature>,
    ) -> Result<Self, Error> {
        let output_keys: Vec<String> = output_keys.into_iter().map(Into::into).collect();
        let source_keys: Vec<ColumnSignature> = source_keys.into_iter().collect();
        if output_keys.len() != source_keys.len() {
            return Err(Error::JoinArity {
                output_keys: output_keys.len(),
                source_keys: source_keys.len(),
            });
        }
        if output_keys.is_empty() {
            return Err(ConfigurationError::EmptyList("join key columns").into());
        }
        Ok(Self {
            output_keys,
            source_keys,
            ignored: Vec::new(),
        })
    }

    /// Leave a source column out of the merge.
    #[must_use]
    pub fn ignore(mut self, column: ColumnSignature) -> Self {
        if !self.ignored.contains(&column) {
            self.ignored.push(column);
        }
        self
    }

    /// Returns the output-side key column names.
    pub fn output_keys(&self) -> &[String] {
        &self.output_keys
    }

    /// Returns the source-side key signatures.
    pub fn source_keys(&self) -> &[ColumnSignature] {
        &self.source_keys
    }

    /// Returns the source columns excluded from the merge.
    pub fn ignored(&self) -> &[ColumnSignature] {
        &self.ignored
    }
}

/// What [`add_columns`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    /// Output rows that found a source row.
    pub matched: usize,
    /// Output rows left with nulls in the new columns.
    pub unmatched: usize,
    /// Number of columns appended to the output table.
    pub columns_added: usize,
}

/// Append the non-key columns of `source` to `output`, matching rows on the key columns.
///
/// Every output row is kept and the row count never changes. Source rows whose key does not
/// occur in `output` are dropped. Keys compare by value, and a null key matches a null key.
///
/// The table is only modified if the whole merge succeeds.
pub fn add_columns(
    output: &mut Table,
    source: &Frame,
    settings: &AddColumnsSettings,
) -> Result<MergeSummary, Error> {
    let incoming: Vec<&FrameColumn> = source
        .columns()
        .iter()
        .filter(|c| !settings.source_keys.contains(&c.signature))
        .filter(|c| !settings.ignored.contains(&c.signature))
        .collect();
    let matches = match_rows(output, source, settings, &incoming)?;
    let matched = matches.iter().filter(|m| m.is_some()).count();

    let mut widened = output.clone();
    for c in &incoming {
        let values = matches
            .iter()
            .map(|m| m.map_or(Value::Null, |row| c.values[row].clone()))
            .collect();
        widened.push_column(Column::new(c.name.clone(), c.data_type, values))?;
    }
    *output = widened;

    let summary = MergeSummary {
        matched,
        unmatched: matches.len() - matched,
        columns_added: incoming.len(),
    };
    debug!(
        table = output.name(),
        matched = summary.matched,
        unmatched = summary.unmatched,
        columns_added = summary.columns_added,
        "merged columns"
    );
    Ok(summary)
}

/// For each row of `output`, the row of `source` with the same key, if any.
///
/// Validates the keys and the incoming column names first. The result holds no borrow of
/// `output`, so the caller can replace it afterwards.
fn match_rows(
    output: &Table,
    source: &Frame,
    settings: &AddColumnsSettings,
    incoming: &[&FrameColumn],
) -> Result<Vec<Option<usize>>, Error> {
    let out_keys = settings
        .output_keys
        .iter()
        .map(|name| output.require_column(name))
        .collect::<Result<Vec<_>, _>>()?;
    let src_keys = settings
        .source_keys
        .iter()
        .map(|sig| source.require(*sig))
        .collect::<Result<Vec<_>, _>>()?;
    for (o, s) in out_keys.iter().zip(&src_keys) {
        if o.data_type() != s.data_type {
            return Err(ConfigurationError::KeyTypeMismatch {
                output_key: o.name().to_string(),
                output_type: o.data_type(),
                source_key: s.name.clone(),
                source_type: s.data_type,
            }
            .into());
        }
    }
    if let Some(c) = incoming.iter().find(|c| output.column(&c.name).is_some()) {
        return Err(ConfigurationError::ColumnCollision(c.name.clone()).into());
    }

    let mut index: HashMap<SmallVec<[&Value; 4]>, usize> = HashMap::new();
    for row in 0..source.row_count() {
        let key = src_keys.iter().map(|c| &c.values[row]).collect();
        match index.entry(key) {
            Entry::Vacant(e) => {
                e.insert(row);
            }
            Entry::Occupied(e) => {
                let key: Vec<String> = e.key().iter().map(ToString::to_string).collect();
                return Err(ConfigurationError::DuplicateKey(key.join(", ")).into());
            }
        }
    }

    Ok((0..output.row_count())
        .map(|row| {
            let key: SmallVec<[&Value; 4]> = out_keys.iter().map(|c| &c.values()[row]).collect();
            index.get(&key).copied()
        })
        .collect())
}
