// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline configuration.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use zonal_transforms::{AggregateOp, ConfigurationError};

/// Compute each value column as a per-bin share instead of reading it from the base table.
///
/// For a category pair `(title, value)`, the value column is added to the flow as
/// `Count() OVER (keys…, [title], [bin]) / Count() OVER (keys…, [title])`, where `keys…` leaves
/// out the bin column if it is one of the primary keys.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Normalize {
    /// The column that splits each `(keys…, title)` partition into bins.
    pub bin_column: String,
}

/// Everything the pipeline driver needs besides the base table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Columns that identify an output row, in join order.
    pub primary_keys: Vec<String>,
    /// Category title columns, parallel to `value_columns`.
    pub title_columns: Vec<String>,
    /// Value columns, parallel to `title_columns`.
    pub value_columns: Vec<String>,
    /// Aggregation used by both pivots.
    pub measure: AggregateOp,
    /// Name of the table created (or replaced) in the registry.
    pub output_table: String,
    /// Derive the value columns instead of reading them.
    #[cfg_attr(feature = "serde", serde(default))]
    pub normalize: Option<Normalize>,
}

impl PipelineConfig {
    /// Create a configuration without normalization.
    pub fn new<S: Into<String>>(
        primary_keys: impl IntoIterator<Item = S>,
        title_columns: impl IntoIterator<Item = S>,
        value_columns: impl IntoIterator<Item = S>,
        measure: AggregateOp,
        output_table: impl Into<String>,
    ) -> Self {
        Self {
            primary_keys: primary_keys.into_iter().map(Into::into).collect(),
            title_columns: title_columns.into_iter().map(Into::into).collect(),
            value_columns: value_columns.into_iter().map(Into::into).collect(),
            measure,
            output_table: output_table.into(),
            normalize: None,
        }
    }

    /// Parse the host's comma-separated form, e.g. `("Wafer,Bin,Lot", "Circle,Segment",
    /// "CirclePct,SegmentPct", "Avg", "Zone Profiles")`.
    pub fn from_csv(
        primary_keys: &str,
        title_columns: &str,
        value_columns: &str,
        measure: &str,
        output_table: &str,
    ) -> Result<Self, ConfigurationError> {
        let config = Self {
            primary_keys: parse_column_list(primary_keys, "primary key columns")?,
            title_columns: parse_column_list(title_columns, "title columns")?,
            value_columns: parse_column_list(value_columns, "value columns")?,
            measure: measure.parse()?,
            output_table: output_table.trim().to_string(),
            normalize: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Derive value columns from bin counts over `bin_column`.
    #[must_use]
    pub fn with_normalize(mut self, bin_column: impl Into<String>) -> Self {
        self.normalize = Some(Normalize {
            bin_column: bin_column.into(),
        });
        self
    }

    /// Check the configuration for structural problems.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.primary_keys.is_empty() {
            return Err(ConfigurationError::EmptyList("primary key columns"));
        }
        if self.title_columns.is_empty() {
            return Err(ConfigurationError::EmptyList("title columns"));
        }
        if self.title_columns.len() != self.value_columns.len() {
            return Err(ConfigurationError::ListLengthMismatch {
                titles: self.title_columns.len(),
                values: self.value_columns.len(),
            });
        }
        if self.output_table.is_empty() {
            return Err(ConfigurationError::EmptyList("output table name"));
        }
        for list in [&self.primary_keys, &self.value_columns] {
            if let Some(dup) = first_duplicate(list) {
                return Err(ConfigurationError::DuplicateName(dup.to_string()));
            }
        }
        Ok(())
    }

    /// Returns the `(title, value)` pairs in order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.title_columns
            .iter()
            .zip(&self.value_columns)
            .map(|(t, v)| (t.as_str(), v.as_str()))
    }
}

/// Split a comma-separated column list, trimming each entry.
pub fn parse_column_list(
    text: &str,
    what: &'static str,
) -> Result<Vec<String>, ConfigurationError> {
    if text.trim().is_empty() {
        return Err(ConfigurationError::EmptyList(what));
    }
    text.split(',')
        .map(str::trim)
        .map(|name| {
            if name.is_empty() {
                Err(ConfigurationError::EmptyName(what))
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    names
        .iter()
        .enumerate()
        .find(|(i, n)| names[..*i].contains(*n))
        .map(|(_, n)| n.as_str())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;

    #[test]
    fn from_csv_trims_and_parses() {
        let config = PipelineConfig::from_csv(
            "Wafer, Bin ,Lot",
            "Circle,Segment",
            "CirclePct,SegmentPct",
            "avg",
            " Zone Profiles ",
        )
        .unwrap();
        assert_eq!(config.primary_keys, ["Wafer", "Bin", "Lot"]);
        assert_eq!(
            config.pairs().collect::<Vec<_>>(),
            vec![("Circle", "CirclePct"), ("Segment", "SegmentPct")]
        );
        assert_eq!(config.measure, AggregateOp::Avg);
        assert_eq!(config.output_table, "Zone Profiles");
        assert_eq!(config.normalize, None);
    }

    #[test]
    fn list_problems_are_configuration_errors() {
        assert_eq!(
            PipelineConfig::from_csv("Lot", "Circle,Segment", "CirclePct", "Avg", "Out"),
            Err(ConfigurationError::ListLengthMismatch {
                titles: 2,
                values: 1,
            })
        );
        assert_eq!(
            PipelineConfig::from_csv("Lot,,Wafer", "Circle", "CirclePct", "Avg", "Out"),
            Err(ConfigurationError::EmptyName("primary key columns"))
        );
        assert_eq!(
            PipelineConfig::from_csv(" ", "Circle", "CirclePct", "Avg", "Out"),
            Err(ConfigurationError::EmptyList("primary key columns"))
        );
        assert_eq!(
            PipelineConfig::from_csv("Lot,Lot", "Circle", "CirclePct", "Avg", "Out"),
            Err(ConfigurationError::DuplicateName("Lot".into()))
        );
        assert_eq!(
            PipelineConfig::from_csv("Lot", "Circle", "CirclePct", "Median", "Out"),
            Err(ConfigurationError::UnknownAggregate("Median".into()))
        );
    }

    #[test]
    fn normalize_is_opt_in() {
        let config = PipelineConfig::new(["Lot"], ["Circle"], ["CirclePct"], AggregateOp::Avg, "Out")
            .with_normalize("Bin");
        assert_eq!(
            config.normalize,
            Some(Normalize {
                bin_column: "Bin".into(),
            })
        );
        assert_eq!(config.validate(), Ok(()));
    }
}
