// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Category expansion pipeline.
//!
//! Given a base table of per-die measurements, a set of key columns and parallel lists of
//! category title/value columns, the [`Pipeline`] produces one wide table keyed by the key
//! columns with one column per observed `<value>.<title value>` area:
//!
//! ```ignore
//! let config = PipelineConfig::from_csv(
//!     "Wafer,Bin,Lot",
//!     "Circle,Segment",
//!     "CirclePct,SegmentPct",
//!     "Avg",
//!     "Zone Profiles",
//! )?;
//! Pipeline::new(config)?.run(&base, &mut document)?;
//! ```
//!
//! Each pair goes through a [`CategoryExpansion`]; pairs after the first are merged into the
//! output table with a left outer key join.

#![no_std]

extern crate alloc;

mod config;
mod expansion;
#[cfg(test)]
mod expansion_tests;
mod pipeline;

pub use config::{Normalize, PipelineConfig, parse_column_list};
pub use expansion::{
    AREA_COLUMN, CATEGORY_COLUMN, CategoryExpansion, Expanded, LongForm, NULL_FILL, VALUE_COLUMN,
    ZONE_COLUMN,
};
pub use pipeline::Pipeline;
pub use zonal_transforms::{AggregateOp, ConfigurationError, Error};
